//! Resize dimension resolution.
//!
//! Resolves a user-entered resize request (per-axis sizes, an optional
//! total-pixel budget, a fit mode) into concrete output dimensions.

use serde::{Deserialize, Serialize};

/// One axis of a resize request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Dimension {
    /// Derive from the other axis via the source aspect ratio.
    #[default]
    Auto,
    /// Scale factor relative to the source (values below 1.0).
    Fraction(f64),
    /// Absolute pixel count.
    Pixels(u32),
}

impl Dimension {
    /// Parse a user-entered axis value.
    ///
    /// Empty means auto; values strictly below 1.0 are fractions of the
    /// source dimension; anything else is an absolute pixel count.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Self::Auto);
        }
        let value: f64 = text.parse().ok()?;
        if value <= 0.0 || !value.is_finite() {
            None
        } else if value < 1.0 {
            Some(Self::Fraction(value))
        } else {
            Some(Self::Pixels(value.round() as u32))
        }
    }

    fn resolve(self, source: f64) -> Option<f64> {
        match self {
            Self::Auto => None,
            Self::Fraction(f) => Some(source * f),
            Self::Pixels(p) => Some(p as f64),
        }
    }
}

/// How the source is scaled against the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// Scale each axis independently to the requested size.
    #[default]
    Stretch,
    /// Uniform scale so the result fits inside the requested box.
    Fit,
    /// Uniform scale so the result covers the requested box.
    Cover,
}

/// A complete resize request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: Dimension,
    pub height: Dimension,
    /// Total output pixel budget, e.g. parsed from "1280x720" or "921.6K".
    pub pixel_target: Option<f64>,
    pub fit: FitMode,
    /// Never produce dimensions larger than the source.
    pub downscale_only: bool,
    /// Round both output dimensions to the nearest multiple of this.
    pub round_to: u32,
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            pixel_target: None,
            fit: FitMode::Stretch,
            downscale_only: false,
            round_to: 2,
        }
    }
}

/// Parse a total-pixel-count target.
///
/// Accepts `WIDTHxHEIGHT` ("1280x720"), scientific notation ("1e6"), and
/// K/M/G suffixes ("921.6K").
pub fn parse_pixel_count(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some((w, h)) = text.split_once(['x', 'X', '*']) {
        let w: f64 = w.trim().parse().ok()?;
        let h: f64 = h.trim().parse().ok()?;
        if w > 0.0 && h > 0.0 {
            return Some(w * h);
        }
        return None;
    }

    let (digits, multiplier) = if let Some(d) = text.strip_suffix(['k', 'K']) {
        (d, 1e3)
    } else if let Some(d) = text.strip_suffix(['m', 'M']) {
        (d, 1e6)
    } else if let Some(d) = text.strip_suffix(['g', 'G']) {
        (d, 1e9)
    } else {
        (text, 1.0)
    };

    let value: f64 = digits.trim().parse().ok()?;
    if value > 0.0 && value.is_finite() {
        Some(value * multiplier)
    } else {
        None
    }
}

/// Resolve a resize request against a source size.
///
/// Steps, in order: complete a missing axis from the source aspect ratio,
/// apply the fit mode, apply the pixel budget as a uniform sqrt rescale,
/// round to the modulus. `downscale_only` suppresses every step that
/// would enlarge the result.
pub fn resize_dimensions(source_width: u32, source_height: u32, spec: &ResizeSpec) -> (u32, u32) {
    let sw = source_width.max(1) as f64;
    let sh = source_height.max(1) as f64;

    let requested_w = spec.width.resolve(sw);
    let requested_h = spec.height.resolve(sh);
    let (tw, th) = match (requested_w, requested_h) {
        (None, None) => (sw, sh),
        (Some(w), None) => (w, w * sh / sw),
        (None, Some(h)) => (h * sw / sh, h),
        (Some(w), Some(h)) => (w, h),
    };

    let (mut w, mut h) = match spec.fit {
        FitMode::Stretch => (tw, th),
        FitMode::Fit => {
            let ratio = (tw / sw).min(th / sh);
            (sw * ratio, sh * ratio)
        }
        FitMode::Cover => {
            let ratio = (tw / sw).max(th / sh);
            (sw * ratio, sh * ratio)
        }
    };

    if spec.downscale_only {
        w = w.min(sw);
        h = h.min(sh);
    }

    if let Some(target) = spec.pixel_target {
        let current = w * h;
        if current > 0.0 && (!spec.downscale_only || current > target) {
            let mut factor = (target / current).sqrt();
            if spec.downscale_only {
                factor = factor.min(1.0);
            }
            w *= factor;
            h *= factor;
        }
    }

    let mut out_w = round_dimension(w, spec.round_to);
    let mut out_h = round_dimension(h, spec.round_to);
    if spec.downscale_only {
        out_w = out_w.min(source_width).max(1);
        out_h = out_h.min(source_height).max(1);
    }
    (out_w, out_h)
}

fn round_dimension(value: f64, modulus: u32) -> u32 {
    let m = modulus.max(1);
    let rounded = ((value / m as f64).round().max(0.0) as u32) * m;
    rounded.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_aspect_completion_from_width() {
        let spec = ResizeSpec {
            width: Dimension::Pixels(960),
            ..Default::default()
        };
        assert_eq!(resize_dimensions(1920, 1080, &spec), (960, 540));
    }

    #[test]
    fn test_fraction_halves_both_axes() {
        let spec = ResizeSpec {
            width: Dimension::Fraction(0.5),
            height: Dimension::Fraction(0.5),
            ..Default::default()
        };
        assert_eq!(resize_dimensions(1920, 1080, &spec), (960, 540));
    }

    #[test]
    fn test_fit_scales_to_smaller_ratio() {
        let spec = ResizeSpec {
            width: Dimension::Pixels(1280),
            height: Dimension::Pixels(1280),
            fit: FitMode::Fit,
            ..Default::default()
        };
        // 1920x1080 into a 1280 box: ratio min(2/3, 32/27) = 2/3
        assert_eq!(resize_dimensions(1920, 1080, &spec), (1280, 720));
    }

    #[test]
    fn test_cover_scales_to_larger_ratio() {
        let spec = ResizeSpec {
            width: Dimension::Pixels(1280),
            height: Dimension::Pixels(1280),
            fit: FitMode::Cover,
            round_to: 1,
            ..Default::default()
        };
        let (w, h) = resize_dimensions(1920, 1080, &spec);
        assert!(w >= 1280 && h >= 1280);
        // Aspect preserved
        assert!((w as f64 / h as f64 - 16.0 / 9.0).abs() < 0.01);
    }

    #[test]
    fn test_stretch_is_independent() {
        let spec = ResizeSpec {
            width: Dimension::Pixels(100),
            height: Dimension::Pixels(400),
            fit: FitMode::Stretch,
            ..Default::default()
        };
        assert_eq!(resize_dimensions(1920, 1080, &spec), (100, 400));
    }

    #[test]
    fn test_pixel_target_rescales_uniformly() {
        let spec = ResizeSpec {
            pixel_target: Some(518_400.0), // quarter of 1920x1080
            round_to: 1,
            ..Default::default()
        };
        let (w, h) = resize_dimensions(1920, 1080, &spec);
        assert_eq!((w, h), (960, 540));
    }

    #[test]
    fn test_downscale_only_ignores_smaller_budget() {
        let spec = ResizeSpec {
            pixel_target: Some(10_000_000.0),
            downscale_only: true,
            ..Default::default()
        };
        assert_eq!(resize_dimensions(1920, 1080, &spec), (1920, 1080));
    }

    #[test]
    fn test_rounding_modulus() {
        let spec = ResizeSpec {
            width: Dimension::Pixels(959),
            round_to: 16,
            ..Default::default()
        };
        let (w, h) = resize_dimensions(1920, 1080, &spec);
        assert_eq!(w % 16, 0);
        assert_eq!(h % 16, 0);
    }

    #[test]
    fn test_parse_pixel_count_forms() {
        assert_eq!(parse_pixel_count("1280x720"), Some(921_600.0));
        assert_eq!(parse_pixel_count("1e6"), Some(1_000_000.0));
        assert_eq!(parse_pixel_count("921.6K"), Some(921_600.0));
        assert_eq!(parse_pixel_count("2M"), Some(2_000_000.0));
        assert_eq!(parse_pixel_count(""), None);
        assert_eq!(parse_pixel_count("0x100"), None);
        assert_eq!(parse_pixel_count("junk"), None);
    }

    #[test]
    fn test_parse_dimension_forms() {
        assert_eq!(Dimension::parse(""), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("0.5"), Some(Dimension::Fraction(0.5)));
        assert_eq!(Dimension::parse("1280"), Some(Dimension::Pixels(1280)));
        assert_eq!(Dimension::parse("-3"), None);
        assert_eq!(Dimension::parse("wide"), None);
    }

    proptest! {
        #[test]
        fn prop_dimensions_never_below_one(
            sw in 1u32..8192,
            sh in 1u32..8192,
            frac in 0.01f64..0.99,
            round_to in 1u32..17,
        ) {
            let spec = ResizeSpec {
                width: Dimension::Fraction(frac),
                height: Dimension::Auto,
                round_to,
                ..Default::default()
            };
            let (w, h) = resize_dimensions(sw, sh, &spec);
            prop_assert!(w >= 1);
            prop_assert!(h >= 1);
        }

        #[test]
        fn prop_downscale_only_never_enlarges(
            sw in 16u32..8192,
            sh in 16u32..8192,
            target_w in 1u32..16384,
        ) {
            let spec = ResizeSpec {
                width: Dimension::Pixels(target_w),
                height: Dimension::Auto,
                downscale_only: true,
                round_to: 1,
                ..Default::default()
            };
            let (w, h) = resize_dimensions(sw, sh, &spec);
            prop_assert!(w <= sw);
            prop_assert!(h <= sh);
        }
    }
}
