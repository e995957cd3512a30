//! Image materialization and QR decoding.
//!
//! ```text
//! FetchedImage --ImageCodec--> PixelGrid --Binarizer--> BinaryBitmap --BarcodeReader--> text
//! ```
//!
//! Both capabilities sit behind traits ([`ImageCodec`], [`BarcodeReader`]) so
//! the pipeline can be assembled from other implementations.

mod bitmap;
mod codec;
mod error;
mod grid;
mod reader;

pub use bitmap::{Binarizer, BinaryBitmap, MIN_BITMAP_DIMENSION};
pub use codec::{
    CodecConfig, DEFAULT_MAX_DIMENSION, ImageCodec, ImageCrateCodec, ImageMaterializer,
    SUPPORTED_FORMATS, parse_format,
};
pub use error::DecodeError;
pub use grid::PixelGrid;
pub use reader::{BarcodeDecoder, BarcodeReader, DecodeHints, ReadMiss, RqrrReader};
