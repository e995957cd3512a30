//! Error types for image materialization and barcode decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised after the bytes are fetched: codec, bitmap and barcode stages.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not in a registered image format.
    #[error("unsupported image format: {format}")]
    UnsupportedFormat {
        /// Detected format name, or "unknown" when the codec could not tell.
        format: String,
    },

    /// The codec recognised the format but could not decode the data.
    #[error("could not decode image: {source}")]
    Codec {
        /// The underlying codec error.
        #[source]
        source: image::ImageError,
    },

    /// Image dimensions or allocation exceed the configured limits.
    #[error("image exceeds decoding limits (max {max_dimension}px per side): {detail}")]
    ImageTooLarge {
        /// Configured maximum width/height.
        max_dimension: u32,
        /// Codec description of the exceeded limit.
        detail: String,
    },

    /// The codec produced an image without pixels.
    #[error("decoded image is empty ({width}x{height})")]
    EmptyImage {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// The pixel grid cannot be turned into a binary bitmap.
    #[error("{width}x{height} image is too small to scan (minimum {minimum}px per side)")]
    BitmapConversion {
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
        /// Smallest accepted side length.
        minimum: u32,
    },

    /// No QR code could be detected and decoded.
    #[error("no QR code found in image")]
    NotFound {
        /// Candidate symbols that were located but failed to decode.
        candidates: usize,
    },

    /// A disk-staged image could not be read back.
    #[error("IO error reading staged image {path}: {source}")]
    Staging {
        /// The staging file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Creates an unsupported format error.
    pub fn unsupported(format: Option<image::ImageFormat>) -> Self {
        let format = format.map_or_else(|| "unknown".to_string(), |f| format!("{f:?}"));
        Self::UnsupportedFormat { format }
    }

    /// Creates a staging IO error.
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }
}
