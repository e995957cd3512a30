//! Integration tests for the `POST /decode` HTTP boundary.
//!
//! Each test starts the real server on an ephemeral port, points it at a
//! mock upstream and talks to it over HTTP.

mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use qrdecode_core::pipeline::{Pipeline, PipelineConfig};
use qrdecode_core::server::{self, DecodeResponse};
use serde_json::{Value, json};
use support::fixtures::{gradient_jpeg, qr_png, serve_image};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().expect("listener address");
        let pipeline = Arc::new(Pipeline::new(PipelineConfig::default()).expect("pipeline"));
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve(
            listener,
            pipeline,
            async move {
                let _ = stopped.await;
            },
            Duration::from_secs(5),
        ));
        Self { addr, stop, handle }
    }

    fn decode_url(&self) -> String {
        format!("http://{}/decode", self.addr)
    }

    async fn shutdown(self) -> std::io::Result<()> {
        let _ = self.stop.send(());
        self.handle.await.expect("server task should not panic")
    }
}

#[tokio::test]
async fn test_server_decodes_qr_image() {
    let upstream = serve_image("/qr.png", 200, qr_png("HELLO"), "image/png").await;
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({ "img_url": format!("{}/qr.png", upstream.uri()) }))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 200);
    let body: DecodeResponse = response.json().await.expect("JSON body");
    assert_eq!(body.qr_string, "HELLO");

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_missing_img_url_is_bad_request() {
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({}))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("JSON body");
    assert_eq!(body["kind"], "invalid_request");
    assert!(body["err"].as_str().is_some_and(|e| e.contains("img_url")));

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_malformed_json_is_bad_request() {
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .header("content-type", "application/json")
        .body("{\"img_url\": ")
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("JSON body");
    assert_eq!(body["kind"], "invalid_request");

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_relative_url_is_bad_request() {
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({ "img_url": "not-a-url" }))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 400);

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_upstream_error_is_bad_gateway() {
    let upstream = serve_image("/gone.png", 404, b"gone".to_vec(), "text/plain").await;
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({ "img_url": format!("{}/gone.png", upstream.uri()) }))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.expect("JSON body");
    assert_eq!(body["kind"], "bad_upstream_status");

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_image_without_symbol_is_unprocessable() {
    let upstream = serve_image("/photo.jpg", 200, gradient_jpeg(200, 150), "image/jpeg").await;
    let server = RunningServer::start().await;

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({ "img_url": format!("{}/photo.jpg", upstream.uri()) }))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("JSON body");
    assert_eq!(body["kind"], "not_found");

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_rejects_get() {
    let server = RunningServer::start().await;

    let response = reqwest::get(server.decode_url())
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 405);

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_rejects_oversized_request_body() {
    let server = RunningServer::start().await;
    let huge = format!("https://example.com/{}", "a".repeat(server::MAX_REQUEST_BODY_BYTES));

    let response = reqwest::Client::new()
        .post(server.decode_url())
        .json(&json!({ "img_url": huge }))
        .send()
        .await
        .expect("request should complete");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("JSON body");
    assert_eq!(body["kind"], "invalid_request");

    server.shutdown().await.expect("clean shutdown");
}

#[tokio::test]
async fn test_server_stops_accepting_after_shutdown() {
    let server = RunningServer::start().await;
    let url = server.decode_url();

    server.shutdown().await.expect("clean shutdown");

    let result = reqwest::Client::new()
        .post(url)
        .json(&json!({ "img_url": "https://example.com/qr.png" }))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(result.is_err(), "server should no longer accept connections");
}
