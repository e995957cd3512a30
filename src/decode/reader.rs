//! Matrix-barcode decoding over binary bitmaps.
//!
//! [`BarcodeReader`] is the QR capability itself (finder patterns, sampling,
//! error correction); [`RqrrReader`] provides it through `rqrr`.
//! [`BarcodeDecoder`] owns the search strategy: which bitmaps to build from
//! a [`PixelGrid`] and in what order, driven by [`DecodeHints`].

use std::fmt;
use std::sync::Arc;

use rqrr::PreparedImage;
use tracing::{debug, trace};

use super::bitmap::{Binarizer, BinaryBitmap};
use super::error::DecodeError;
use super::grid::PixelGrid;

/// Grids whose longer side exceeds this also get a half-resolution attempt
/// when searching exhaustively.
const DOWNSCALE_MIN_SIDE: u32 = 1200;

/// Outcome of a reader pass over one bitmap that produced no payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadMiss {
    /// Symbols located but not decodable (bad format info, too many errors).
    pub candidates: usize,
    /// Last decoder complaint, for logs.
    pub last_error: Option<String>,
}

/// Locates and decodes a QR symbol in a bitmap.
pub trait BarcodeReader: Send + Sync + fmt::Debug {
    /// Returns the raw payload bytes of the first decodable symbol.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadMiss`] when no symbol decodes.
    fn read(&self, bitmap: &BinaryBitmap) -> Result<Vec<u8>, ReadMiss>;
}

/// [`BarcodeReader`] backed by the `rqrr` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrReader;

impl BarcodeReader for RqrrReader {
    fn read(&self, bitmap: &BinaryBitmap) -> Result<Vec<u8>, ReadMiss> {
        let mut prepared =
            PreparedImage::prepare_from_bitmap(bitmap.width(), bitmap.height(), |x, y| {
                bitmap.is_dark(x, y)
            });
        let grids = prepared.detect_grids();

        let mut miss = ReadMiss::default();
        for grid in &grids {
            let mut payload = Vec::new();
            match grid.decode_to(&mut payload) {
                Ok(_) => {
                    trace!(grids = grids.len(), "symbol decoded");
                    return Ok(payload);
                }
                Err(e) => {
                    miss.candidates += 1;
                    miss.last_error = Some(format!("{e:?}"));
                }
            }
        }
        Err(miss)
    }
}

/// Options that steer the barcode search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHints {
    /// Keep trying alternative bitmaps (global threshold, inverted polarity,
    /// half resolution) when the first one yields nothing.
    pub try_harder: bool,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self { try_harder: true }
    }
}

/// One way of producing a bitmap from a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    LocalMean,
    Otsu,
    InvertedLocalMean,
    Downscaled,
}

fn strategies(hints: DecodeHints, grid: &PixelGrid) -> Vec<Strategy> {
    if !hints.try_harder {
        return vec![Strategy::LocalMean];
    }
    let mut plan = vec![
        Strategy::LocalMean,
        Strategy::Otsu,
        Strategy::InvertedLocalMean,
    ];
    if grid.width().max(grid.height()) > DOWNSCALE_MIN_SIDE {
        plan.push(Strategy::Downscaled);
    }
    plan
}

/// Turns a [`PixelGrid`] into decoded text.
#[derive(Debug, Clone)]
pub struct BarcodeDecoder {
    reader: Arc<dyn BarcodeReader>,
    hints: DecodeHints,
}

impl Default for BarcodeDecoder {
    fn default() -> Self {
        Self::new(Arc::new(RqrrReader), DecodeHints::default())
    }
}

impl BarcodeDecoder {
    #[must_use]
    pub fn new(reader: Arc<dyn BarcodeReader>, hints: DecodeHints) -> Self {
        Self { reader, hints }
    }

    #[must_use]
    pub fn hints(&self) -> DecodeHints {
        self.hints
    }

    /// Decodes the QR payload in `grid`, returned exactly as embedded.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::BitmapConversion`] when the grid cannot be binarized
    /// - [`DecodeError::NotFound`] when every strategy comes up empty
    pub fn decode(&self, grid: &PixelGrid) -> Result<String, DecodeError> {
        let primary = BinaryBitmap::from_grid(grid, Binarizer::LocalMean)?;
        let mut candidates = 0;

        for strategy in strategies(self.hints, grid) {
            let bitmap = match strategy {
                Strategy::LocalMean => Some(primary.clone()),
                Strategy::Otsu => BinaryBitmap::from_grid(grid, Binarizer::Otsu).ok(),
                Strategy::InvertedLocalMean => Some(primary.inverted()),
                Strategy::Downscaled => grid
                    .downscaled()
                    .and_then(|half| BinaryBitmap::from_grid(&half, Binarizer::LocalMean).ok()),
            };
            let Some(bitmap) = bitmap else {
                debug!(?strategy, "strategy not applicable to this grid");
                continue;
            };

            match self.reader.read(&bitmap) {
                Ok(payload) if payload.is_empty() => {
                    debug!(?strategy, "symbol decoded to an empty payload");
                    candidates += 1;
                }
                Ok(payload) => {
                    debug!(?strategy, bytes = payload.len(), "QR code decoded");
                    return Ok(payload_text(payload));
                }
                Err(miss) => {
                    debug!(
                        ?strategy,
                        candidates = miss.candidates,
                        last_error = miss.last_error.as_deref().unwrap_or("-"),
                        "no symbol decoded"
                    );
                    candidates += miss.candidates;
                }
            }
        }

        Err(DecodeError::NotFound { candidates })
    }
}

/// UTF-8 payloads pass through untouched; anything else is read as
/// ISO-8859-1, the QR byte-mode default, so no payload byte is lost.
fn payload_text(payload: Vec<u8>) -> String {
    String::from_utf8(payload)
        .unwrap_or_else(|e| e.into_bytes().into_iter().map(char::from).collect())
}
