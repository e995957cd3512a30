//! Image fixtures and mock upstreams shared by the integration tests.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders `payload` as a QR symbol with a quiet zone.
pub fn qr_luma(payload: &str) -> GrayImage {
    QrCode::new(payload.as_bytes())
        .expect("payload should fit in a QR symbol")
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .build()
}

/// PNG bytes of a QR symbol encoding `payload`.
pub fn qr_png(payload: &str) -> Vec<u8> {
    encode_png(qr_luma(payload))
}

/// Baseline JPEG bytes of a QR symbol encoding `payload`.
pub fn qr_jpeg(payload: &str) -> Vec<u8> {
    encode_jpeg(&qr_luma(payload))
}

/// JPEG of a smooth gradient: decodes fine but holds no symbol.
pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let luma = GrayImage::from_fn(width, height, |x, y| {
        let value = (x * 255 / width.max(1) + y * 64 / height.max(1)) % 256;
        Luma([u8::try_from(value).unwrap_or(u8::MAX)])
    });
    encode_jpeg(&luma)
}

/// PNG of a solid image with the given dimensions.
pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(GrayImage::from_pixel(width, height, Luma([255])))
}

fn encode_png(luma: GrayImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(luma)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding should succeed");
    bytes.into_inner()
}

fn encode_jpeg(luma: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 95)
        .encode_image(luma)
        .expect("JPEG encoding should succeed");
    bytes
}

/// Starts a mock upstream serving `body` with `status` at `route`.
pub async fn serve_image(
    route: &str,
    status: u16,
    body: Vec<u8>,
    content_type: &str,
) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", content_type)
                .set_body_bytes(body),
        )
        .mount(&server)
        .await;
    server
}
