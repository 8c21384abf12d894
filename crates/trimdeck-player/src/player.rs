//! Single-clip player.
//!
//! Owns playback of exactly one probed clip. In native mode transport
//! calls proxy straight to the host surface; in fallback mode the player
//! drives an external frame stream and derives the current time from a
//! repeating clock callback (wall-clock elapsed × speed, rounded to the
//! frame boundary). Reaching the clip duration ends playback regardless
//! of what the decode stream reports, because audio and video sub-streams
//! can have mismatched lengths.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use trimdeck_core::{
    detect_crop, CancelFlag, CropDetectOptions, Disposer, FrameBuffer, Notifier, Region, Result,
    StateCell, TrimdeckError,
};
use trimdeck_media::{
    ClipDescriptor, FrameSink, FrameSource, MediaKind, StreamFrame, WaveformColors,
    WaveformService,
};

use crate::clock::FrameClock;
use crate::mode::{probe_playback_mode, PlaybackMode};
use crate::native::NativeSurface;

/// Slowest supported playback speed.
pub const MIN_SPEED: f64 = 0.5;
/// Fastest supported playback speed.
pub const MAX_SPEED: f64 = 100.0;

/// Clips at most this long get their waveform loaded at construction.
pub const WAVEFORM_AUTO_THRESHOLD_MS: f64 = 120_000.0;

const WAVEFORM_WIDTH: u32 = 1000;
const WAVEFORM_HEIGHT: u32 = 120;

/// Collaborators a player needs.
#[derive(Clone)]
pub struct PlayerDeps {
    pub surface: Arc<dyn NativeSurface>,
    pub frames: Arc<dyn FrameSource>,
    pub waveforms: Arc<dyn WaveformService>,
    pub clock: Arc<dyn FrameClock>,
}

/// Observable per-clip playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlaybackState {
    /// Clip-local position in milliseconds.
    pub current_time_ms: f64,
    pub is_playing: bool,
    /// Playback speed, within [`MIN_SPEED`]..=[`MAX_SPEED`].
    pub speed: f64,
    pub mode: PlaybackMode,
    pub muted: bool,
    pub volume: f64,
    /// Last recoverable fallback failure, shown as a dismissible report.
    pub last_fallback_error: Option<String>,
}

impl Default for ClipPlaybackState {
    fn default() -> Self {
        Self {
            current_time_ms: 0.0,
            is_playing: false,
            speed: 1.0,
            mode: PlaybackMode::Loading,
            muted: false,
            volume: 1.0,
            last_fallback_error: None,
        }
    }
}

/// The most recently rendered frame. Equality is identity (position and
/// buffer pointer), not pixel data.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    pub timestamp_ms: f64,
    pub frame_number: u64,
    pub buffer: Arc<FrameBuffer>,
}

impl PartialEq for FrameHandle {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_ms == other.timestamp_ms
            && self.frame_number == other.frame_number
            && Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

/// Waveform loading progress. Failure is retryable, never blocking.
#[derive(Debug, Clone, Default)]
pub enum WaveformStatus {
    #[default]
    NotLoaded,
    Loading,
    Ready(Arc<FrameBuffer>),
    Failed,
}

impl PartialEq for WaveformStatus {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotLoaded, Self::NotLoaded)
            | (Self::Loading, Self::Loading)
            | (Self::Failed, Self::Failed) => true,
            (Self::Ready(a), Self::Ready(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Stream and render bookkeeping, guarded by one mutex.
///
/// Lock discipline: never set a state cell or fire a notifier while this
/// is held; listeners are free to call back into the player.
#[derive(Default)]
struct Internals {
    /// Active fallback stream, if any.
    stream: Option<Disposer>,
    /// Active timing loop, if any.
    clock: Option<Disposer>,
    /// Bumped on every stream (re)start and stop; stale callbacks compare
    /// against it and drop themselves.
    stream_generation: u64,
    /// Local time the current stream started from.
    play_start_offset_ms: f64,
    /// Whether the current stream has delivered its first frame.
    first_frame_seen: bool,
    /// Latest requested paused-seek render target. Replaced, never queued.
    pending_render: Option<f64>,
    render_in_flight: bool,
    waveform_cancel: Option<CancelFlag>,
    fallback_audio: Option<PathBuf>,
    closed: bool,
}

/// Player for a single clip.
pub struct ClipPlayer {
    id: Uuid,
    descriptor: ClipDescriptor,
    deps: PlayerDeps,
    state: StateCell<ClipPlaybackState>,
    frame: StateCell<Option<FrameHandle>>,
    waveform: StateCell<WaveformStatus>,
    ended: Notifier,
    internals: Mutex<Internals>,
}

impl ClipPlayer {
    /// Create a player and run its capability probe.
    pub fn new(descriptor: ClipDescriptor, deps: PlayerDeps) -> Arc<Self> {
        let player = Arc::new(Self {
            id: Uuid::new_v4(),
            descriptor,
            deps,
            state: StateCell::new(ClipPlaybackState::default()),
            frame: StateCell::new(None),
            waveform: StateCell::new(WaveformStatus::NotLoaded),
            ended: Notifier::new(),
            internals: Mutex::new(Internals::default()),
        });

        let decision = probe_playback_mode(
            &player.descriptor,
            player.deps.surface.as_ref(),
            player.deps.waveforms.as_ref(),
        );
        player.internals.lock().fallback_audio = decision.fallback_audio;
        player.state.update(|s| s.mode = decision.mode);

        if player.descriptor.duration_ms <= WAVEFORM_AUTO_THRESHOLD_MS
            && !player.descriptor.audio_streams.is_empty()
        {
            player.load_waveform();
        }

        player
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &ClipDescriptor {
        &self.descriptor
    }

    pub fn duration_ms(&self) -> f64 {
        self.descriptor.duration_ms
    }

    /// Snapshot of the playback state.
    pub fn state(&self) -> ClipPlaybackState {
        self.state.get()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.get().mode
    }

    /// Transcoded audio path when the clip's own audio is not natively
    /// playable.
    pub fn fallback_audio(&self) -> Option<PathBuf> {
        self.internals.lock().fallback_audio.clone()
    }

    pub fn current_frame(&self) -> Option<FrameHandle> {
        self.frame.get()
    }

    pub fn waveform_status(&self) -> WaveformStatus {
        self.waveform.get()
    }

    pub fn subscribe_state(
        &self,
        listener: impl Fn(&ClipPlaybackState) + Send + Sync + 'static,
    ) -> Disposer {
        self.state.subscribe(listener)
    }

    pub fn subscribe_frame(
        &self,
        listener: impl Fn(&Option<FrameHandle>) + Send + Sync + 'static,
    ) -> Disposer {
        self.frame.subscribe(listener)
    }

    /// Subscribe to the end-of-clip notification.
    pub fn subscribe_ended(&self, listener: impl Fn() + Send + Sync + 'static) -> Disposer {
        self.ended.subscribe(listener)
    }

    // ── Transport ───────────────────────────────────────────────

    /// Start playback from the current position.
    pub fn play(self: &Arc<Self>) {
        let st = self.state.get();
        match st.mode {
            PlaybackMode::Native => {
                self.deps.surface.play();
                self.state.update(|s| s.is_playing = true);
            }
            PlaybackMode::Fallback => self.start_stream(st.current_time_ms),
            PlaybackMode::Loading | PlaybackMode::Unsupported => {}
        }
    }

    /// Stop playback, keeping the current position.
    pub fn pause(&self) {
        match self.state.get().mode {
            PlaybackMode::Native => {
                self.deps.surface.pause();
                self.state.update(|s| s.is_playing = false);
            }
            PlaybackMode::Fallback => self.stop_stream(),
            PlaybackMode::Loading | PlaybackMode::Unsupported => {}
        }
    }

    /// Seek to a clip-local position.
    ///
    /// While playing, the fallback stream restarts at the new offset.
    /// While paused, a single throttled full-frame render is requested;
    /// renders issued while one is in flight replace the pending target
    /// rather than queueing.
    pub fn seek_to(self: &Arc<Self>, ms: f64) {
        let ms = ms.clamp(0.0, self.descriptor.duration_ms);
        let st = self.state.get();
        match st.mode {
            PlaybackMode::Native => {
                self.deps.surface.seek_to(ms);
                self.state.update(|s| s.current_time_ms = ms);
            }
            PlaybackMode::Fallback => {
                if st.is_playing {
                    self.start_stream(ms);
                } else {
                    let rounded = self.descriptor.frame_rate.round_to_frame_ms(ms);
                    self.state.update(|s| s.current_time_ms = rounded);
                    self.request_render(rounded);
                }
            }
            PlaybackMode::Loading | PlaybackMode::Unsupported => {
                self.state.update(|s| s.current_time_ms = ms);
            }
        }
    }

    /// Seek and start playing in one step.
    pub fn play_from(self: &Arc<Self>, ms: f64) {
        let ms = ms.clamp(0.0, self.descriptor.duration_ms);
        match self.state.get().mode {
            PlaybackMode::Native => {
                self.deps.surface.seek_to(ms);
                self.deps.surface.play();
                self.state.update(|s| {
                    s.current_time_ms = ms;
                    s.is_playing = true;
                });
            }
            PlaybackMode::Fallback => self.start_stream(ms),
            PlaybackMode::Loading | PlaybackMode::Unsupported => {}
        }
    }

    /// Change playback speed.
    ///
    /// Out-of-range values are a caller contract violation: the call
    /// fails and no state changes. While playing in fallback mode the
    /// stream restarts so frame pacing stays consistent.
    pub fn set_speed(self: &Arc<Self>, speed: f64) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(TrimdeckError::InvalidSpeed(speed));
        }
        self.state.update(|s| s.speed = speed);
        let st = self.state.get();
        match st.mode {
            PlaybackMode::Native => self.deps.surface.set_speed(speed),
            PlaybackMode::Fallback => {
                if st.is_playing {
                    self.start_stream(st.current_time_ms);
                }
            }
            PlaybackMode::Loading | PlaybackMode::Unsupported => {}
        }
        Ok(())
    }

    pub fn set_muted(&self, muted: bool) {
        self.state.update(|s| s.muted = muted);
    }

    pub fn set_volume(&self, volume: f64) {
        self.state.update(|s| s.volume = volume.clamp(0.0, 1.0));
    }

    /// Pull the native surface's position into the player state. The host
    /// shell calls this on its render tick while a native clip plays.
    pub fn sync_native_position(&self) {
        let st = self.state.get();
        if st.mode != PlaybackMode::Native {
            return;
        }
        let pos = self.deps.surface.position_ms();
        if st.is_playing && pos >= self.descriptor.duration_ms {
            self.deps.surface.pause();
            self.state.update(|s| {
                s.is_playing = false;
                s.current_time_ms = self.descriptor.duration_ms;
            });
            self.ended.fire();
        } else {
            self.state.update(|s| s.current_time_ms = pos);
        }
    }

    // ── Analysis ────────────────────────────────────────────────

    /// Detect the content crop of the frame at the current position.
    /// Audio clips have nothing to detect.
    pub fn crop_detect(&self, options: CropDetectOptions) -> Result<Option<Region>> {
        if self.descriptor.kind == MediaKind::Audio {
            return Ok(None);
        }
        let at = self.state.get().current_time_ms;
        let frame = self.deps.frames.get_one_raw_frame(&self.descriptor, at)?;
        Ok(detect_crop(&frame, options))
    }

    /// Load (or retry) the waveform overview. Cancelled by teardown;
    /// failure leaves a retryable status instead of an error.
    pub fn load_waveform(self: &Arc<Self>) {
        let cancel = CancelFlag::new();
        {
            let mut internals = self.internals.lock();
            if internals.closed {
                return;
            }
            if let Some(old) = internals.waveform_cancel.replace(cancel.clone()) {
                old.cancel();
            }
        }
        self.waveform.set(WaveformStatus::Loading);

        let weak = Arc::downgrade(self);
        let descriptor = self.descriptor.clone();
        let waveforms = self.deps.waveforms.clone();
        thread::spawn(move || {
            let result = waveforms.render_waveform(
                &descriptor,
                WAVEFORM_WIDTH,
                WAVEFORM_HEIGHT,
                WaveformColors::default(),
            );
            let Some(player) = weak.upgrade() else { return };
            if cancel.is_cancelled() {
                return;
            }
            match result {
                Ok(image) => {
                    player.waveform.set(WaveformStatus::Ready(Arc::new(image)));
                }
                Err(e) => {
                    warn!(path = %descriptor.path, "waveform load failed: {e}");
                    player.waveform.set(WaveformStatus::Failed);
                }
            }
        });
    }

    /// Drop the rendered frame (used when a chained clip becomes active
    /// so its predecessor's stale frame is not shown).
    pub fn clear_frame(&self) {
        self.frame.set(None);
    }

    /// Dismiss the fallback error report.
    pub fn dismiss_fallback_error(&self) {
        self.state.update(|s| s.last_fallback_error = None);
    }

    /// Tear down streams, clocks and in-flight loads. Idempotent.
    pub fn close(&self) {
        {
            let mut internals = self.internals.lock();
            internals.closed = true;
            internals.stream_generation += 1;
            internals.stream.take();
            internals.clock.take();
            internals.pending_render = None;
            if let Some(cancel) = internals.waveform_cancel.take() {
                cancel.cancel();
            }
        }
        self.state.update(|s| s.is_playing = false);
    }

    // ── Fallback stream machinery ───────────────────────────────

    /// (Re)start the fallback frame stream from a local offset.
    fn start_stream(self: &Arc<Self>, from_ms: f64) {
        let from_ms = self
            .descriptor
            .frame_rate
            .round_to_frame_ms(from_ms.clamp(0.0, self.descriptor.duration_ms));
        let speed = self.state.get().speed;

        let generation;
        {
            let mut internals = self.internals.lock();
            if internals.closed {
                return;
            }
            internals.stream_generation += 1;
            generation = internals.stream_generation;
            internals.play_start_offset_ms = from_ms;
            internals.first_frame_seen = false;
            internals.stream.take();
            internals.clock.take();
        }

        // State goes first: a source that fails synchronously must land
        // its error after the play transition, not get clobbered by it.
        self.state.update(|s| {
            s.is_playing = true;
            s.current_time_ms = from_ms;
            s.last_fallback_error = None;
        });

        let on_frame = {
            let weak = Arc::downgrade(self);
            move |frame: StreamFrame| {
                if let Some(player) = weak.upgrade() {
                    player.on_stream_frame(generation, frame);
                }
            }
        };
        let on_end = {
            let weak = Arc::downgrade(self);
            move || {
                if let Some(player) = weak.upgrade() {
                    player.on_stream_source_end(generation);
                }
            }
        };
        let on_error = {
            let weak = Arc::downgrade(self);
            move |error: TrimdeckError| {
                if let Some(player) = weak.upgrade() {
                    player.on_stream_error(generation, error);
                }
            }
        };

        let disposer = self.deps.frames.open_frame_stream(
            &self.descriptor,
            from_ms,
            speed,
            FrameSink {
                on_frame: Box::new(on_frame),
                on_end: Box::new(on_end),
                on_error: Box::new(on_error),
            },
        );

        let mut internals = self.internals.lock();
        if internals.stream_generation == generation {
            internals.stream = Some(disposer);
        }
        // Otherwise a newer stream superseded this one while it was being
        // opened; dropping the disposer cancels it.
    }

    /// Stop the stream and the timing loop.
    fn stop_stream(&self) {
        {
            let mut internals = self.internals.lock();
            internals.stream_generation += 1;
            internals.stream.take();
            internals.clock.take();
        }
        self.state.update(|s| s.is_playing = false);
    }

    fn on_stream_frame(self: &Arc<Self>, generation: u64, frame: StreamFrame) {
        let start_clock;
        {
            let mut internals = self.internals.lock();
            if internals.stream_generation != generation || internals.closed {
                return;
            }
            start_clock = !internals.first_frame_seen;
            internals.first_frame_seen = true;
        }

        self.frame.set(Some(FrameHandle {
            timestamp_ms: frame.timestamp_ms,
            frame_number: frame.frame_number,
            buffer: Arc::new(frame.buffer),
        }));

        if start_clock {
            // The clock starts with the first decoded frame; elapsed time
            // is measured from here, not from the stream request.
            let weak = Arc::downgrade(self);
            let disposer = self.deps.clock.schedule_repeating(Box::new(move |elapsed| {
                if let Some(player) = weak.upgrade() {
                    player.on_clock_tick(generation, elapsed);
                }
            }));
            let mut internals = self.internals.lock();
            if internals.stream_generation == generation {
                internals.clock = Some(disposer);
            }
        }
    }

    fn on_clock_tick(self: &Arc<Self>, generation: u64, elapsed: Duration) {
        let offset;
        {
            let internals = self.internals.lock();
            if internals.stream_generation != generation {
                return;
            }
            offset = internals.play_start_offset_ms;
        }
        let st = self.state.get();
        if !st.is_playing {
            return;
        }

        let raw = offset + elapsed.as_secs_f64() * 1000.0 * st.speed;
        let time = self.descriptor.frame_rate.round_to_frame_ms(raw);
        if time >= self.descriptor.duration_ms {
            self.finish_playback();
        } else {
            self.state.update(|s| s.current_time_ms = time);
        }
    }

    /// Timer-driven end of clip: pause, render the final frame, notify.
    fn finish_playback(self: &Arc<Self>) {
        debug!(path = %self.descriptor.path, "clip ended by timing loop");
        self.stop_stream();
        let end = self.descriptor.duration_ms;
        self.state.update(|s| s.current_time_ms = end);
        self.request_render(end);
        self.ended.fire();
    }

    fn on_stream_source_end(&self, _generation: u64) {
        // End-of-stream from the decoder is deliberately ignored: audio
        // and video sub-streams can have mismatched lengths, so only the
        // timing loop ends playback.
        debug!(path = %self.descriptor.path, "decode stream ended");
    }

    fn on_stream_error(&self, generation: u64, error: TrimdeckError) {
        {
            let internals = self.internals.lock();
            if internals.stream_generation != generation {
                return;
            }
        }
        warn!(path = %self.descriptor.path, "fallback stream failed: {error}");
        self.stop_stream();
        self.state
            .update(|s| s.last_fallback_error = Some(error.to_string()));
    }

    // ── Throttled paused-seek rendering ─────────────────────────

    fn request_render(self: &Arc<Self>, target_ms: f64) {
        let spawn_worker;
        {
            let mut internals = self.internals.lock();
            if internals.closed {
                return;
            }
            internals.pending_render = Some(target_ms);
            spawn_worker = !internals.render_in_flight;
            if spawn_worker {
                internals.render_in_flight = true;
            }
        }
        if spawn_worker {
            let player = self.clone();
            thread::spawn(move || player.render_worker());
        }
    }

    fn render_worker(self: Arc<Self>) {
        loop {
            let target = {
                let mut internals = self.internals.lock();
                match internals.pending_render.take() {
                    Some(target) => target,
                    None => {
                        internals.render_in_flight = false;
                        return;
                    }
                }
            };

            match self.deps.frames.get_one_raw_frame(&self.descriptor, target) {
                Ok(buffer) => {
                    let st = self.state.get();
                    // Discard results that are stale by the time they
                    // resolve: position moved on, or playback started.
                    let fresh = !st.is_playing && (st.current_time_ms - target).abs() < 0.001;
                    if fresh {
                        let frame_number =
                            (target / self.descriptor.frame_rate.frame_duration_ms()) as u64;
                        self.frame.set(Some(FrameHandle {
                            timestamp_ms: target,
                            frame_number,
                            buffer: Arc::new(buffer),
                        }));
                    } else {
                        debug!(target, "discarding stale frame render");
                    }
                }
                Err(e) => {
                    warn!(path = %self.descriptor.path, "full-frame render failed: {e}");
                    self.state
                        .update(|s| s.last_fallback_error = Some(e.to_string()));
                }
            }
        }
    }
}

impl std::fmt::Debug for ClipPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipPlayer")
            .field("id", &self.id)
            .field("path", &self.descriptor.path)
            .field("state", &self.state.get())
            .finish()
    }
}
