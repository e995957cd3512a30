//! In-memory pixel grid produced by the codec stage.

use image::GrayImage;
use image::imageops::{self, FilterType};

use super::error::DecodeError;

/// Luminance pixels of a decoded image. Width and height are never zero.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    luma: GrayImage,
}

impl PixelGrid {
    /// Wraps a luminance buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::EmptyImage`] when either side is zero.
    pub fn from_luma(luma: GrayImage) -> Result<Self, DecodeError> {
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }
        Ok(Self { luma })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    /// Luminance at `(x, y)`; 0 is black, 255 is white.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.luma.get_pixel(x, y).0[0]
    }

    /// Row-major luminance samples.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.luma.as_raw()
    }

    /// Half-resolution copy, or `None` when a side would drop to zero.
    #[must_use]
    pub fn downscaled(&self) -> Option<Self> {
        let (width, height) = (self.width() / 2, self.height() / 2);
        if width == 0 || height == 0 {
            return None;
        }
        let luma = imageops::resize(&self.luma, width, height, FilterType::Triangle);
        Some(Self { luma })
    }
}
