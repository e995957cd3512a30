//! QR Decode Core Library
//!
//! This library provides the fetch-and-decode pipeline behind the `qrdecode`
//! service: take a remote image URL, fetch the image, decode the QR code in
//! it and return the embedded text.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Bounded HTTP image fetching with per-request staging
//! - [`decode`] - Image codec, binary bitmaps and QR decoding
//! - [`pipeline`] - Orchestration and the uniform error taxonomy
//! - [`server`] - `POST /decode` HTTP boundary and graceful shutdown

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod fetch;
pub mod pipeline;
pub mod server;
mod user_agent;

// Re-export commonly used types
pub use decode::{BarcodeDecoder, CodecConfig, DecodeError, DecodeHints, PixelGrid};
pub use fetch::{FetchConfig, FetchError, FetchedImage, ImageFetcher, StagingStrategy};
pub use pipeline::{Decoded, ErrorKind, FetchRequest, Pipeline, PipelineConfig, PipelineError};
