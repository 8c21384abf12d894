//! Native media surface contract.
//!
//! The host's built-in media element, when it can decode a clip at all,
//! is both faster and cheaper than the external frame stream. The player
//! proxies transport calls straight through in native mode.

use parking_lot::Mutex;
use std::sync::Arc;

use trimdeck_media::ClipDescriptor;

/// What the native surface can do with a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeSupport {
    /// Video and audio both natively decodable.
    Full,
    /// Video decodable, but no supported audio track.
    VideoOnly,
    /// Not natively decodable at all.
    None,
}

/// The host's media element.
pub trait NativeSurface: Send + Sync {
    /// Capability probe, consulted exactly once per clip.
    fn supports(&self, descriptor: &ClipDescriptor) -> NativeSupport;
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, ms: f64);
    fn set_speed(&self, speed: f64);
    /// Current native playback position.
    fn position_ms(&self) -> f64;
}

/// Surface for hosts with no native media element (headless tools).
/// Every clip takes the fallback path.
#[derive(Debug, Default)]
pub struct NullSurface;

impl NativeSurface for NullSurface {
    fn supports(&self, _descriptor: &ClipDescriptor) -> NativeSupport {
        NativeSupport::None
    }

    fn play(&self) {}
    fn pause(&self) {}
    fn seek_to(&self, _ms: f64) {}
    fn set_speed(&self, _speed: f64) {}

    fn position_ms(&self) -> f64 {
        0.0
    }
}

/// Transport calls a [`MockSurface`] records.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Play,
    Pause,
    SeekTo(f64),
    SetSpeed(f64),
}

/// Scriptable surface for tests: reports a fixed capability and records
/// every transport call.
pub struct MockSurface {
    support: NativeSupport,
    calls: Mutex<Vec<SurfaceCall>>,
    position: Mutex<f64>,
}

impl MockSurface {
    pub fn new(support: NativeSupport) -> Arc<Self> {
        Arc::new(Self {
            support,
            calls: Mutex::new(Vec::new()),
            position: Mutex::new(0.0),
        })
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    /// Simulate native playback advancing to a position.
    pub fn set_position(&self, ms: f64) {
        *self.position.lock() = ms;
    }
}

impl NativeSurface for MockSurface {
    fn supports(&self, _descriptor: &ClipDescriptor) -> NativeSupport {
        self.support
    }

    fn play(&self) {
        self.calls.lock().push(SurfaceCall::Play);
    }

    fn pause(&self) {
        self.calls.lock().push(SurfaceCall::Pause);
    }

    fn seek_to(&self, ms: f64) {
        self.calls.lock().push(SurfaceCall::SeekTo(ms));
        *self.position.lock() = ms;
    }

    fn set_speed(&self, speed: f64) {
        self.calls.lock().push(SurfaceCall::SetSpeed(speed));
    }

    fn position_ms(&self) -> f64 {
        *self.position.lock()
    }
}
