//! Image codec capability and the materializer built on it.
//!
//! The codec turns encoded bytes into pixels. Which formats are accepted is
//! configuration ([`CodecConfig::formats`]); format detection is whatever the
//! `image` crate's signature sniffing reports, nothing more.

use std::fmt;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::sync::Arc;

use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use tracing::debug;

use super::error::DecodeError;
use super::grid::PixelGrid;
use crate::fetch::{FetchedImage, Payload};

/// Default maximum width and height of an accepted image.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

/// Formats compiled into this build; any subset may be registered.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// Parses a format name such as `png` or `jpg` into a supported format.
#[must_use]
pub fn parse_format(name: &str) -> Option<ImageFormat> {
    let format = ImageFormat::from_extension(name.trim().to_ascii_lowercase())?;
    SUPPORTED_FORMATS.contains(&format).then_some(format)
}

/// Turns an encoded image into pixels.
pub trait ImageCodec: Send + Sync + fmt::Debug {
    /// Decodes the fetched bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for unregistered formats, corrupt or
    /// truncated data and images beyond the configured limits.
    fn decode(&self, image: &FetchedImage) -> Result<DynamicImage, DecodeError>;
}

/// Registered formats and size limits for [`ImageCrateCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub formats: Vec<ImageFormat>,
    pub max_dimension: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            formats: vec![ImageFormat::Png, ImageFormat::Jpeg],
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageCrateCodec {
    config: CodecConfig,
}

impl ImageCrateCodec {
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.config.max_dimension);
        limits.max_image_height = Some(self.config.max_dimension);
        limits
    }

    fn decode_from<R: BufRead + Seek>(
        &self,
        reader: ImageReader<R>,
    ) -> Result<DynamicImage, DecodeError> {
        let mut reader = reader.with_guessed_format().map_err(|e| DecodeError::Codec {
            source: ImageError::IoError(e),
        })?;

        match reader.format() {
            Some(format) if self.config.formats.contains(&format) => {
                debug!(?format, "detected image format");
            }
            other => return Err(DecodeError::unsupported(other)),
        }

        reader.limits(self.limits());
        reader.decode().map_err(|e| self.classify(e))
    }

    fn classify(&self, error: ImageError) -> DecodeError {
        match error {
            ImageError::Limits(limit) => DecodeError::ImageTooLarge {
                max_dimension: self.config.max_dimension,
                detail: limit.to_string(),
            },
            ImageError::Unsupported(unsupported) => DecodeError::UnsupportedFormat {
                format: unsupported.to_string(),
            },
            other => DecodeError::Codec { source: other },
        }
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, image: &FetchedImage) -> Result<DynamicImage, DecodeError> {
        match image.payload() {
            Payload::Memory(bytes) => {
                self.decode_from(ImageReader::new(Cursor::new(bytes.as_slice())))
            }
            Payload::Staged(file) => {
                let path = file.path();
                let handle =
                    std::fs::File::open(path).map_err(|e| DecodeError::staging(path, e))?;
                self.decode_from(ImageReader::new(BufReader::new(handle)))
            }
        }
    }
}

/// Materializes fetched bytes into a [`PixelGrid`] through an [`ImageCodec`].
#[derive(Debug, Clone)]
pub struct ImageMaterializer {
    codec: Arc<dyn ImageCodec>,
}

impl ImageMaterializer {
    #[must_use]
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        Self { codec }
    }

    /// Decodes `image` and converts it to luminance.
    ///
    /// # Errors
    ///
    /// Propagates codec failures and rejects images without pixels.
    pub fn materialize(&self, image: &FetchedImage) -> Result<PixelGrid, DecodeError> {
        let decoded = self.codec.decode(image)?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            color = ?decoded.color(),
            "image materialized"
        );
        PixelGrid::from_luma(decoded.into_luma8())
    }
}
