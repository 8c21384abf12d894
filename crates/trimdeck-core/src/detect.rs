//! Automatic crop detection over raw pixel data.
//!
//! Treats the top-left pixel's color as background and sweeps inward from
//! each edge until a row or column contains enough differing pixels to
//! count as content. The bounding box of the four sweep stops is the
//! detected region.

use crate::frame::FrameBuffer;
use crate::geometry::Region;

/// Fraction of differing pixels a row/column needs to count as content.
const CONTENT_SENSITIVITY: f64 = 0.02;

/// Smallest region worth reporting; anything below is treated as noise.
const MIN_DETECT_SIZE: u32 = 8;

/// Options for [`detect_crop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropDetectOptions {
    /// Per-pixel difference threshold in 0.0..=1.0, compared against the
    /// largest channel delta from the background color.
    pub threshold: f64,
}

impl Default for CropDetectOptions {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

/// Detect the content bounding box of a frame.
///
/// Returns `None` when the frame is degenerate or the detected box is
/// smaller than the minimum size (solid frames, noise).
pub fn detect_crop(frame: &FrameBuffer, options: CropDetectOptions) -> Option<Region> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }

    let background = frame.pixel_rgb(0, 0);
    let differs = |x: u32, y: u32| -> bool {
        let p = frame.pixel_rgb(x, y);
        let delta = p
            .iter()
            .zip(background.iter())
            .map(|(a, b)| (*a as i32 - *b as i32).unsigned_abs())
            .max()
            .unwrap_or(0);
        delta as f64 / 255.0 > options.threshold
    };

    let row_is_content = |y: u32| {
        let hits = (0..frame.width).filter(|&x| differs(x, y)).count();
        hits as f64 / frame.width as f64 > CONTENT_SENSITIVITY
    };
    let column_is_content = |x: u32| {
        let hits = (0..frame.height).filter(|&y| differs(x, y)).count();
        hits as f64 / frame.height as f64 > CONTENT_SENSITIVITY
    };

    let top = (0..frame.height).find(|&y| row_is_content(y))?;
    let bottom = (0..frame.height).rev().find(|&y| row_is_content(y))?;
    let left = (0..frame.width).find(|&x| column_is_content(x))?;
    let right = (0..frame.width).rev().find(|&x| column_is_content(x))?;

    let width = right - left + 1;
    let height = bottom - top + 1;
    if width < MIN_DETECT_SIZE || height < MIN_DETECT_SIZE {
        return None;
    }

    Some(Region::new(
        left,
        top,
        width,
        height,
        frame.width,
        frame.height,
    ))
}
