//! HTTP boundary: `POST /decode` over a shared [`Pipeline`].
//!
//! The handler binds `{"img_url": ...}`, runs the pipeline and maps the
//! single [`ErrorKind`] of a failure onto an HTTP status. Shutdown is
//! graceful: once the shutdown signal fires, no new connections are accepted
//! and in-flight requests get a bounded grace period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::pipeline::{ErrorKind, FetchRequest, Pipeline, PipelineError};

/// Largest accepted inbound request body (16 KiB).
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Default time in-flight requests get after a shutdown signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Inbound request body.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeRequest {
    pub img_url: Option<String>,
}

/// Success body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecodeResponse {
    pub qr_string: String,
}

/// Failure body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub err: String,
    pub kind: ErrorKind,
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Builds the service router.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/decode", post(decode_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(AppState { pipeline })
}

/// HTTP status for a failure.
#[must_use]
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error.kind() {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NetworkFailure if error.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NetworkFailure | ErrorKind::BadUpstreamStatus => StatusCode::BAD_GATEWAY,
        ErrorKind::ImageCodecFailure
        | ErrorKind::BitmapConversionFailure
        | ErrorKind::NotFound => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &PipelineError) -> Response {
    let status = status_for(error);
    let kind = error.kind();
    if status.is_server_error() {
        warn!(%kind, status = status.as_u16(), error = %error, "decode request failed");
    } else {
        info!(%kind, status = status.as_u16(), error = %error, "decode request rejected");
    }
    let body = ErrorResponse {
        err: error.to_string(),
        kind,
    };
    (status, Json(body)).into_response()
}

async fn decode_handler(
    State(state): State<AppState>,
    payload: Result<Json<DecodeRequest>, JsonRejection>,
) -> Response {
    let url = match payload {
        Ok(Json(DecodeRequest { img_url: Some(url) })) => url,
        Ok(Json(DecodeRequest { img_url: None })) => {
            return error_response(&PipelineError::invalid_request("img_url is required"));
        }
        Err(rejection) => {
            return error_response(&PipelineError::invalid_request(rejection.body_text()));
        }
    };

    match state.pipeline.run(&FetchRequest::new(url)).await {
        Ok(decoded) => (
            StatusCode::OK,
            Json(DecodeResponse {
                qr_string: decoded.text,
            }),
        )
            .into_response(),
        Err(error) => error_response(&error),
    }
}

/// Serves `pipeline` on `listener` until `shutdown` completes, then drains
/// in-flight requests for at most `grace`.
///
/// # Errors
///
/// Returns an IO error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let app = router(pipeline);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return flatten_join(joined),
        () = shutdown => {}
    }

    info!(grace_secs = grace.as_secs(), "shutdown requested; draining in-flight requests");
    let _ = stop_tx.send(());

    if let Ok(joined) = tokio::time::timeout(grace, &mut server).await {
        flatten_join(joined)
    } else {
        warn!("grace period elapsed; aborting remaining requests");
        server.abort();
        Ok(())
    }
}

fn flatten_join(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> std::io::Result<()> {
    joined.map_err(std::io::Error::other)?
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
