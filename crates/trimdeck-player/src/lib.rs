//! TrimDeck Player - single-clip playback engine
//!
//! One player owns one probed clip:
//! - Capability probe deciding native vs. fallback playback
//! - Transport (play/pause/seek/speed) proxied or stream-driven
//! - The fallback timing loop behind a swappable clock abstraction
//! - Throttled paused-seek rendering with stale-result discard
//! - Per-clip crop detection and waveform loading

pub mod clock;
pub mod mode;
pub mod native;
pub mod player;

pub use clock::{FrameClock, ManualClock, ThreadClock};
pub use mode::{probe_playback_mode, ModeDecision, PlaybackMode};
pub use native::{MockSurface, NativeSupport, NativeSurface, NullSurface, SurfaceCall};
pub use player::{
    ClipPlaybackState, ClipPlayer, FrameHandle, PlayerDeps, WaveformStatus, MAX_SPEED, MIN_SPEED,
    WAVEFORM_AUTO_THRESHOLD_MS,
};
