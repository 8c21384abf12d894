//! Playback mode resolution.
//!
//! Decided once per clip: `Loading` transitions to exactly one of
//! `Native`, `Fallback` or `Unsupported`. The only secondary decision is
//! the fallback-audio transcode when native video lacks a supported audio
//! track; if that transcode itself fails the clip is unsupported.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trimdeck_media::{ClipDescriptor, MediaKind, WaveformService};

use crate::native::{NativeSupport, NativeSurface};

/// How a clip is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Capability probe not finished yet.
    #[default]
    Loading,
    /// The host's media element decodes this clip.
    Native,
    /// Externally decoded frame stream.
    Fallback,
    /// Neither path can play this clip.
    Unsupported,
}

/// Outcome of the capability probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDecision {
    pub mode: PlaybackMode,
    /// Transcoded audio file, when the clip's own audio is not natively
    /// playable.
    pub fallback_audio: Option<PathBuf>,
}

/// Resolve the playback mode for a clip.
pub fn probe_playback_mode(
    descriptor: &ClipDescriptor,
    surface: &dyn NativeSurface,
    waveforms: &dyn WaveformService,
) -> ModeDecision {
    let decision = match surface.supports(descriptor) {
        NativeSupport::Full => ModeDecision {
            mode: PlaybackMode::Native,
            fallback_audio: None,
        },
        NativeSupport::VideoOnly => {
            match waveforms.transcode_fallback_audio(Path::new(&descriptor.path)) {
                Ok(audio) => ModeDecision {
                    mode: PlaybackMode::Native,
                    fallback_audio: Some(audio),
                },
                Err(e) => {
                    warn!(path = %descriptor.path, "fallback audio transcode failed: {e}");
                    ModeDecision {
                        mode: PlaybackMode::Unsupported,
                        fallback_audio: None,
                    }
                }
            }
        }
        NativeSupport::None => match descriptor.kind {
            MediaKind::Video | MediaKind::Image => ModeDecision {
                mode: PlaybackMode::Fallback,
                fallback_audio: None,
            },
            MediaKind::Audio => {
                match waveforms.transcode_fallback_audio(Path::new(&descriptor.path)) {
                    Ok(audio) => ModeDecision {
                        mode: PlaybackMode::Fallback,
                        fallback_audio: Some(audio),
                    },
                    Err(e) => {
                        warn!(path = %descriptor.path, "fallback audio transcode failed: {e}");
                        ModeDecision {
                            mode: PlaybackMode::Unsupported,
                            fallback_audio: None,
                        }
                    }
                }
            }
        },
    };

    info!(path = %descriptor.path, mode = ?decision.mode, "playback mode resolved");
    decision
}
