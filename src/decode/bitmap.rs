//! Binary bitmap: thresholded black/white view of a [`PixelGrid`].
//!
//! Two binarizers are available:
//!
//! - [`Binarizer::LocalMean`] compares each pixel with the mean of a window
//!   around it (integral-image box filter). The window is a power of two near
//!   a quarter of the longer side, so it never fits inside a finder pattern's
//!   dark centre and uneven lighting does not wipe out half the symbol.
//! - [`Binarizer::Otsu`] uses one global threshold chosen by Otsu's method.
//!   Cheaper, and better on small or very clean images.

use super::error::DecodeError;
use super::grid::PixelGrid;

/// Smallest side length that can hold a version 1 QR symbol (21 modules).
pub const MIN_BITMAP_DIMENSION: u32 = 21;

/// A pixel must be this much darker than its neighbourhood mean to be dark.
const LOCAL_MEAN_BIAS: u64 = 6;

const MIN_LOCAL_WINDOW: usize = 32;
const MAX_LOCAL_WINDOW: usize = 256;

/// Thresholding method used to build a [`BinaryBitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binarizer {
    LocalMean,
    Otsu,
}

/// Row-major dark/light bitmap; `true` is a dark module pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBitmap {
    width: usize,
    height: usize,
    dark: Vec<bool>,
}

impl BinaryBitmap {
    /// Thresholds `grid` with the given binarizer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::BitmapConversion`] when either side is shorter
    /// than [`MIN_BITMAP_DIMENSION`].
    pub fn from_grid(grid: &PixelGrid, binarizer: Binarizer) -> Result<Self, DecodeError> {
        let (grid_width, grid_height) = (grid.width(), grid.height());
        if grid_width < MIN_BITMAP_DIMENSION || grid_height < MIN_BITMAP_DIMENSION {
            return Err(DecodeError::BitmapConversion {
                width: grid_width,
                height: grid_height,
                minimum: MIN_BITMAP_DIMENSION,
            });
        }

        let width = grid_width as usize;
        let height = grid_height as usize;
        let raw = grid.as_raw();
        let dark = match binarizer {
            Binarizer::LocalMean => local_mean(raw, width, height),
            Binarizer::Otsu => {
                let threshold = otsu_threshold(raw);
                raw.iter().map(|&p| p <= threshold).collect()
            }
        };

        Ok(Self {
            width,
            height,
            dark,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether `(x, y)` is dark.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark[y * self.width + x]
    }

    /// Number of dark pixels.
    #[must_use]
    pub fn dark_count(&self) -> usize {
        self.dark.iter().filter(|&&d| d).count()
    }

    /// Copy with dark and light swapped, for light-on-dark symbols.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            dark: self.dark.iter().map(|d| !d).collect(),
        }
    }
}

fn local_window(width: usize, height: usize) -> usize {
    (width.max(height) / 4)
        .next_power_of_two()
        .clamp(MIN_LOCAL_WINDOW, MAX_LOCAL_WINDOW)
}

fn local_mean(raw: &[u8], width: usize, height: usize) -> Vec<bool> {
    let half = local_window(width, height) / 2;

    // Summed-area table with a zero row and column in front.
    let stride = width + 1;
    let mut integral = vec![0u64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += u64::from(raw[y * width + x]);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let mut dark = Vec::with_capacity(width * height);
    for y in 0..height {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(width);
            let area = ((y1 - y0) * (x1 - x0)) as u64;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let pixel = u64::from(raw[y * width + x]);
            dark.push((pixel + LOCAL_MEAN_BIAS) * area < sum);
        }
    }
    dark
}

/// Global threshold maximising between-class variance.
fn otsu_threshold(raw: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &p in raw {
        histogram[usize::from(p)] += 1;
    }

    let total = raw.len() as f64;
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0.0;
    let mut weighted_bg = 0.0;
    let mut best_variance = 0.0;
    let mut threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        weighted_bg += level as f64 * count as f64;
        let mean_bg = weighted_bg / weight_bg;
        let mean_fg = (weighted_total - weighted_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            threshold = u8::try_from(level).unwrap_or(u8::MAX);
        }
    }
    threshold
}
