//! Media file probing to get metadata without a full decode.
//!
//! Shells out to `ffprobe` with JSON output; the parsed result becomes an
//! immutable [`ClipDescriptor`] created once per input file, before any
//! player exists.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;
use trimdeck_core::{FrameRate, Result, TrimdeckError};

/// What kind of media a clip is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

/// Information about an audio sub-stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Immutable description of one source clip.
///
/// Produced by a [`Prober`] before the timeline exists; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// File path
    pub path: String,
    /// Media kind
    pub kind: MediaKind,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// Frame rate (meaningful for video)
    pub frame_rate: FrameRate,
    /// Coded width in pixels
    pub raw_width: u32,
    /// Coded height in pixels
    pub raw_height: u32,
    /// Width after sample-aspect correction
    pub display_width: u32,
    /// Height after sample-aspect correction
    pub display_height: u32,
    /// Video codec name
    pub codec: String,
    /// Container format name
    pub container: String,
    /// Audio sub-streams
    pub audio_streams: Vec<AudioStreamInfo>,
}

/// Probe service contract: resolve a path into a [`ClipDescriptor`].
pub trait Prober: Send + Sync {
    /// Probe a media file. Unreadable or unsupported files fail with
    /// [`TrimdeckError::Probe`].
    fn probe(&self, path: &Path) -> Result<ClipDescriptor>;
}

/// `ffprobe`-backed prober.
#[derive(Debug, Default)]
pub struct FfprobeProber;

impl Prober for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<ClipDescriptor> {
        let path_str = path.to_string_lossy().to_string();
        if !path.exists() {
            return Err(TrimdeckError::Probe {
                path: path_str,
                reason: "file not found".into(),
            });
        }

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| TrimdeckError::Probe {
                path: path_str.clone(),
                reason: format!("ffprobe spawn failed: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrimdeckError::Probe {
                path: path_str,
                reason: stderr.lines().last().unwrap_or("unsupported format").to_string(),
            });
        }

        let parsed: FfprobeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| TrimdeckError::Probe {
                path: path_str.clone(),
                reason: format!("unreadable probe output: {e}"),
            })?;

        descriptor_from_ffprobe(path_str, parsed)
    }
}

fn descriptor_from_ffprobe(path: String, parsed: FfprobeOutput) -> Result<ClipDescriptor> {
    let container = parsed
        .format
        .as_ref()
        .map(|f| f.format_name.clone())
        .unwrap_or_default();
    let duration_ms = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .map(|secs| secs * 1000.0)
        .unwrap_or(0.0);

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio_streams: Vec<AudioStreamInfo> = parsed
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioStreamInfo {
            index: s.index.unwrap_or(0),
            codec: s.codec_name.clone().unwrap_or_default(),
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
        })
        .collect();

    let kind = match video {
        Some(v) if duration_ms <= 0.0 || v.nb_frames.as_deref() == Some("1") => MediaKind::Image,
        Some(_) => MediaKind::Video,
        None if !audio_streams.is_empty() => MediaKind::Audio,
        None => {
            return Err(TrimdeckError::Probe {
                path,
                reason: "no decodable streams".into(),
            })
        }
    };

    let (raw_width, raw_height) = video
        .map(|v| (v.width.unwrap_or(0), v.height.unwrap_or(0)))
        .unwrap_or((0, 0));
    let (sar_num, sar_den) = video
        .and_then(|v| v.sample_aspect_ratio.as_deref())
        .and_then(parse_ratio)
        .unwrap_or((1, 1));
    let display_width = (raw_width as u64 * sar_num / sar_den.max(1)) as u32;

    let frame_rate = video
        .and_then(|v| v.r_frame_rate.as_deref())
        .and_then(parse_ratio)
        .filter(|(num, _)| *num > 0)
        .map(|(num, den)| FrameRate::new(num as u32, den.max(1) as u32))
        .unwrap_or_default();

    debug!(path = %path, ?kind, duration_ms, "probed clip");

    Ok(ClipDescriptor {
        path,
        kind,
        duration_ms,
        frame_rate,
        raw_width,
        raw_height,
        display_width: if display_width > 0 { display_width } else { raw_width },
        display_height: raw_height,
        codec: video.and_then(|v| v.codec_name.clone()).unwrap_or_default(),
        container,
        audio_streams,
    })
}

/// Parse "num:den" or "num/den" ratios as used by ffprobe.
fn parse_ratio(text: &str) -> Option<(u64, u64)> {
    let (num, den) = text.split_once([':', '/'])?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

// ── ffprobe JSON shapes ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: Option<usize>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_aspect_ratio: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}
