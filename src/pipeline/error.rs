//! Uniform failure taxonomy for a pipeline run.
//!
//! Stage errors keep their own types; [`PipelineError::kind`] collapses them
//! into one [`ErrorKind`] so the boundary layer inspects a single value.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::decode::DecodeError;
use crate::fetch::FetchError;

/// Caller-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input URL.
    InvalidRequest,
    /// Transport failure while fetching; safe to retry.
    NetworkFailure,
    /// Upstream answered with a status other than 200.
    BadUpstreamStatus,
    /// Not a decodable image (unsupported, corrupt, truncated, empty).
    ImageCodecFailure,
    /// Image decoded but unusable for scanning.
    BitmapConversionFailure,
    /// The image holds no readable QR code.
    NotFound,
    /// Body or image dimensions over the configured limits.
    PayloadTooLarge,
    /// Server-side fault.
    InternalFailure,
}

impl ErrorKind {
    /// Stable snake_case name, as used in error responses.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NetworkFailure => "network_failure",
            Self::BadUpstreamStatus => "bad_upstream_status",
            Self::ImageCodecFailure => "image_codec_failure",
            Self::BitmapConversionFailure => "bitmap_conversion_failure",
            Self::NotFound => "not_found",
            Self::PayloadTooLarge => "payload_too_large",
            Self::InternalFailure => "internal_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage, for deadline reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Decode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

/// Every way a pipeline run can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before any stage ran.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What is wrong with the request.
        reason: String,
    },

    /// Fetch stage failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Materialization or barcode stage failure.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The overall request deadline ran out.
    #[error("request deadline of {}ms exceeded during {stage}", deadline.as_millis())]
    DeadlineExceeded {
        /// Stage that was running when the deadline fired.
        stage: Stage,
        /// Configured deadline.
        deadline: Duration,
    },

    /// Unexpected defect, e.g. a panicked decode task.
    #[error("internal failure: {reason}")]
    Internal {
        /// Description of the defect.
        reason: String,
    },
}

impl PipelineError {
    /// Creates an invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates an internal failure.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Fetch(error) => fetch_kind(error),
            Self::Decode(error) => decode_kind(error),
            Self::DeadlineExceeded {
                stage: Stage::Fetch,
                ..
            } => ErrorKind::NetworkFailure,
            Self::DeadlineExceeded {
                stage: Stage::Decode,
                ..
            }
            | Self::Internal { .. } => ErrorKind::InternalFailure,
        }
    }

    /// True when the run failed because something took too long.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Fetch(error) => error.is_timeout(),
            Self::DeadlineExceeded { .. } => true,
            _ => false,
        }
    }
}

fn fetch_kind(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::InvalidUrl { .. } => ErrorKind::InvalidRequest,
        FetchError::Network { .. } | FetchError::Timeout { .. } => ErrorKind::NetworkFailure,
        FetchError::HttpStatus { .. } => ErrorKind::BadUpstreamStatus,
        FetchError::EmptyBody { .. } => ErrorKind::ImageCodecFailure,
        FetchError::TooLarge { .. } => ErrorKind::PayloadTooLarge,
        FetchError::Staging { .. } | FetchError::Client { .. } => ErrorKind::InternalFailure,
    }
}

fn decode_kind(error: &DecodeError) -> ErrorKind {
    match error {
        DecodeError::UnsupportedFormat { .. }
        | DecodeError::Codec { .. }
        | DecodeError::EmptyImage { .. } => ErrorKind::ImageCodecFailure,
        DecodeError::ImageTooLarge { .. } => ErrorKind::PayloadTooLarge,
        DecodeError::BitmapConversion { .. } => ErrorKind::BitmapConversionFailure,
        DecodeError::NotFound { .. } => ErrorKind::NotFound,
        DecodeError::Staging { .. } => ErrorKind::InternalFailure,
    }
}
