//! Waveform extraction and fallback audio transcode via the ffmpeg CLI.
//!
//! Pipes raw mono f32 samples at 2 kHz out of ffmpeg and folds them into
//! per-column peaks. Codec-agnostic; no in-process audio decoder needed.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use trimdeck_core::{FrameBuffer, Result, TrimdeckError};
use uuid::Uuid;

use crate::probe::ClipDescriptor;

/// Sample rate the audio is decimated to before peak folding.
const PEAK_SAMPLE_RATE: u32 = 2000;

/// Colors for a rendered waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformColors {
    pub foreground: [u8; 3],
    pub background: [u8; 3],
}

impl Default for WaveformColors {
    fn default() -> Self {
        Self {
            foreground: [86, 154, 255],
            background: [24, 24, 24],
        }
    }
}

/// Waveform / audio-fallback collaborator.
pub trait WaveformService: Send + Sync {
    /// Render an amplitude overview image for a clip's audio.
    fn render_waveform(
        &self,
        descriptor: &ClipDescriptor,
        width: u32,
        height: u32,
        colors: WaveformColors,
    ) -> Result<FrameBuffer>;

    /// Transcode a clip's audio into a playable intermediate file and
    /// return its path.
    fn transcode_fallback_audio(&self, path: &Path) -> Result<PathBuf>;
}

/// `ffmpeg` CLI implementation of [`WaveformService`].
#[derive(Debug, Default)]
pub struct FfmpegWaveforms;

impl WaveformService for FfmpegWaveforms {
    fn render_waveform(
        &self,
        descriptor: &ClipDescriptor,
        width: u32,
        height: u32,
        colors: WaveformColors,
    ) -> Result<FrameBuffer> {
        let peaks = extract_peaks(Path::new(&descriptor.path), width as usize)?;
        Ok(render_peaks(&peaks, width, height, colors))
    }

    fn transcode_fallback_audio(&self, path: &Path) -> Result<PathBuf> {
        let out = std::env::temp_dir().join(format!("trimdeck-audio-{}.flac", Uuid::new_v4()));
        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args(["-vn", "-c:a", "flac", "-y"])
            .arg(&out)
            .output()
            .map_err(|e| TrimdeckError::Fallback(format!("ffmpeg spawn failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(path = %path.display(), "fallback audio transcode failed");
            return Err(TrimdeckError::Fallback(
                stderr.lines().last().unwrap_or("audio transcode failed").to_string(),
            ));
        }
        debug!(out = %out.display(), "fallback audio ready");
        Ok(out)
    }
}

/// Decode a file's audio to mono f32 and fold it into `columns` peaks.
pub fn extract_peaks(path: &Path, columns: usize) -> Result<Vec<f32>> {
    let rate = PEAK_SAMPLE_RATE.to_string();
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args([
            "-vn",
            "-acodec",
            "pcm_f32le",
            "-ar",
            rate.as_str(),
            "-ac",
            "1",
            "-f",
            "f32le",
            "pipe:1",
        ])
        .output()
        .map_err(|e| TrimdeckError::Fallback(format!("ffmpeg spawn failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TrimdeckError::Fallback(
            stderr.lines().last().unwrap_or("waveform decode failed").to_string(),
        ));
    }

    let samples: Vec<f32> = output
        .stdout
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]).clamp(-1.0, 1.0))
        .collect();
    if samples.is_empty() {
        return Err(TrimdeckError::Fallback("no audio samples".into()));
    }

    Ok(fold_peaks(&samples, columns))
}

/// Fold samples into per-column maximum amplitudes.
pub fn fold_peaks(samples: &[f32], columns: usize) -> Vec<f32> {
    if samples.is_empty() || columns == 0 {
        return Vec::new();
    }
    let block = (samples.len() / columns).max(1);
    samples
        .chunks(block)
        .take(columns)
        .map(|chunk| chunk.iter().map(|s| s.abs()).fold(0.0f32, f32::max))
        .collect()
}

/// Draw folded peaks as a centered bar chart.
pub fn render_peaks(peaks: &[f32], width: u32, height: u32, colors: WaveformColors) -> FrameBuffer {
    let mut image = FrameBuffer::solid(width, height, colors.background);
    if peaks.is_empty() || height == 0 {
        return image;
    }
    let mid = height as f32 / 2.0;
    for x in 0..width {
        let peak = peaks[(x as usize * peaks.len()) / width as usize].clamp(0.0, 1.0);
        let half = (peak * mid).max(0.5);
        let top = (mid - half).floor().max(0.0) as u32;
        let bottom = ((mid + half).ceil() as u32).min(height);
        for y in top..bottom {
            image.set_pixel_rgb(x, y, colors.foreground);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_peaks_takes_block_maxima() {
        let samples = vec![0.1, -0.9, 0.2, 0.3, -0.1, 0.5];
        let peaks = fold_peaks(&samples, 3);
        assert_eq!(peaks, vec![0.9, 0.3, 0.5]);
    }

    #[test]
    fn test_fold_peaks_empty() {
        assert!(fold_peaks(&[], 10).is_empty());
        assert!(fold_peaks(&[0.5], 0).is_empty());
    }

    #[test]
    fn test_render_peaks_marks_loud_columns() {
        let colors = WaveformColors::default();
        let image = render_peaks(&[1.0, 0.0], 2, 100, colors);
        // Full-scale column reaches the top row; silent column does not.
        assert_eq!(image.pixel_rgb(0, 0), colors.foreground);
        assert_eq!(image.pixel_rgb(1, 0), colors.background);
        // Both touch the midline.
        assert_eq!(image.pixel_rgb(1, 50), colors.foreground);
    }
}
