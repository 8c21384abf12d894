//! Frame rates and millisecond timeline math.
//!
//! Timeline positions are plain f64 milliseconds throughout the engine.
//! Frame rates stay rational (e.g. 30000/1001 for 29.97 fps) so that
//! frame-boundary rounding stays exact over long timelines.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame in milliseconds.
    #[inline]
    pub fn frame_duration_ms(self) -> f64 {
        if self.numerator == 0 {
            return 0.0;
        }
        let fd = Rational64::new(1000 * self.denominator as i64, self.numerator as i64);
        *fd.numer() as f64 / *fd.denom() as f64
    }

    /// Half a frame duration in milliseconds.
    ///
    /// Used as the tolerance when deciding whether a breakpoint is "at"
    /// the current position.
    #[inline]
    pub fn half_frame_ms(self) -> f64 {
        self.frame_duration_ms() * 0.5
    }

    /// Round a millisecond position to the nearest frame boundary.
    ///
    /// Scrubbing and cut edits stay frame-aligned because every computed
    /// playback time passes through this.
    pub fn round_to_frame_ms(self, ms: f64) -> f64 {
        let fd = self.frame_duration_ms();
        if fd <= 0.0 {
            return ms;
        }
        (ms / fd).round() * fd
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// Format a millisecond position as `HH:MM:SS.mmm`.
pub fn format_timestamp(ms: f64) -> String {
    let total_ms = ms.max(0.0).round() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{mins:02}:{secs:02}.{millis:03}")
}

/// Parse a human-edited timestamp back into milliseconds.
///
/// Accepts `SS`, `SS.mmm`, `MM:SS`, `HH:MM:SS` and fractional-second
/// variants of each. Returns `None` for anything that does not parse;
/// invalid edits are never errors, the caller keeps them pending.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut ms = 0.0;
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if value < 0.0 {
            return None;
        }
        ms = ms * 60.0 + value * 1000.0;
    }
    Some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration_29_97() {
        let fd = FrameRate::FPS_29_97.frame_duration_ms();
        assert!((fd - 33.3667).abs() < 0.001);
    }

    #[test]
    fn test_round_to_frame() {
        let rate = FrameRate::FPS_25; // 40 ms frames
        assert_eq!(rate.round_to_frame_ms(59.0), 40.0);
        assert_eq!(rate.round_to_frame_ms(61.0), 80.0);
        assert_eq!(rate.round_to_frame_ms(0.0), 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(61_250.0), "00:01:01.250");
        assert_eq!(format_timestamp(3_600_000.0 + 1500.0), "01:00:01.500");
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("90"), Some(90_000.0));
        assert_eq!(parse_timestamp("1:30"), Some(90_000.0));
        assert_eq!(parse_timestamp("0:01:30"), Some(90_000.0));
        assert_eq!(parse_timestamp("1.5"), Some(1500.0));
        assert_eq!(parse_timestamp("00:01:01.250"), Some(61_250.0));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
        assert_eq!(parse_timestamp("-5"), None);
    }

    #[test]
    fn test_format_parse_round_trip() {
        for ms in [0.0, 1000.0, 61_250.0, 7_323_042.0] {
            assert_eq!(parse_timestamp(&format_timestamp(ms)), Some(ms));
        }
    }
}
