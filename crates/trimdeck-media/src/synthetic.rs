//! Synthetic in-process media for tests and development.
//!
//! Generates deterministic frames instead of decoding real files, so the
//! players and the combined timeline can be exercised without an ffmpeg
//! binary on the machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use trimdeck_core::{
    CancelFlag, Disposer, FrameBuffer, FrameRate, Result, TrimdeckError,
};

use crate::probe::{AudioStreamInfo, ClipDescriptor, MediaKind, Prober};
use crate::source::{FrameSink, FrameSource, StreamFrame};
use crate::waveform::{render_peaks, WaveformColors, WaveformService};

/// Build a descriptor for a clip that exists only in memory.
pub fn synthetic_descriptor(
    name: &str,
    duration_ms: f64,
    frame_rate: FrameRate,
    width: u32,
    height: u32,
) -> ClipDescriptor {
    ClipDescriptor {
        path: format!("synthetic://{name}"),
        kind: MediaKind::Video,
        duration_ms,
        frame_rate,
        raw_width: width,
        raw_height: height,
        display_width: width,
        display_height: height,
        codec: "rawvideo".into(),
        container: "synthetic".into(),
        audio_streams: vec![AudioStreamInfo {
            index: 1,
            codec: "pcm_s16le".into(),
            sample_rate: 48_000,
            channels: 2,
        }],
    }
}

/// Prober that fabricates a descriptor for any path.
#[derive(Debug, Clone)]
pub struct SyntheticProber {
    pub duration_ms: f64,
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
}

impl Default for SyntheticProber {
    fn default() -> Self {
        Self {
            duration_ms: 10_000.0,
            frame_rate: FrameRate::FPS_25,
            width: 640,
            height: 480,
        }
    }
}

impl Prober for SyntheticProber {
    fn probe(&self, path: &Path) -> Result<ClipDescriptor> {
        let name = path.to_string_lossy();
        Ok(synthetic_descriptor(
            &name,
            self.duration_ms,
            self.frame_rate,
            self.width,
            self.height,
        ))
    }
}

/// How the synthetic stream paces frame delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Sleep one frame interval (divided by speed) between frames.
    #[default]
    Realtime,
    /// Deliver all frames as fast as the sink consumes them.
    Instant,
}

type FrameGenerator = Arc<dyn Fn(&ClipDescriptor, f64, u64) -> FrameBuffer + Send + Sync>;

/// Deterministic [`FrameSource`].
#[derive(Clone)]
pub struct SyntheticFrameSource {
    pacing: Pacing,
    generator: FrameGenerator,
    fail: bool,
}

impl SyntheticFrameSource {
    /// Test-pattern frames, paced at the descriptor's frame rate.
    pub fn new() -> Self {
        Self {
            pacing: Pacing::Realtime,
            generator: Arc::new(|descriptor, _, _| {
                FrameBuffer::test_pattern(descriptor.raw_width, descriptor.raw_height)
            }),
            fail: false,
        }
    }

    /// Test-pattern frames delivered without pacing.
    pub fn instant() -> Self {
        Self {
            pacing: Pacing::Instant,
            ..Self::new()
        }
    }

    /// A source whose every request fails, for error-path tests.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Replace the frame generator. The callback receives the descriptor,
    /// the frame timestamp in ms, and the frame number.
    pub fn with_generator(
        mut self,
        generator: impl Fn(&ClipDescriptor, f64, u64) -> FrameBuffer + Send + Sync + 'static,
    ) -> Self {
        self.generator = Arc::new(generator);
        self
    }
}

impl Default for SyntheticFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticFrameSource {
    fn get_one_raw_frame(
        &self,
        descriptor: &ClipDescriptor,
        seek_to_ms: f64,
    ) -> Result<FrameBuffer> {
        if self.fail {
            return Err(TrimdeckError::Fallback("synthetic decode failure".into()));
        }
        let frame_number = (seek_to_ms / descriptor.frame_rate.frame_duration_ms()) as u64;
        Ok((self.generator)(descriptor, seek_to_ms, frame_number))
    }

    fn open_frame_stream(
        &self,
        descriptor: &ClipDescriptor,
        seek_to_ms: f64,
        speed: f64,
        sink: FrameSink,
    ) -> Disposer {
        if self.fail {
            (sink.on_error)(TrimdeckError::Fallback("synthetic stream failure".into()));
            return Disposer::noop();
        }

        let cancel = CancelFlag::new();
        let thread_cancel = cancel.clone();
        let descriptor = descriptor.clone();
        let generator = self.generator.clone();
        let pacing = self.pacing;

        thread::spawn(move || {
            let frame_ms = descriptor.frame_rate.frame_duration_ms();
            let mut ts_ms = seek_to_ms;
            let mut frame_number = (seek_to_ms / frame_ms) as u64;
            while ts_ms < descriptor.duration_ms {
                if thread_cancel.is_cancelled() {
                    return;
                }
                if pacing == Pacing::Realtime {
                    thread::sleep(Duration::from_secs_f64(
                        frame_ms / speed.max(0.01) / 1000.0,
                    ));
                    if thread_cancel.is_cancelled() {
                        return;
                    }
                }
                (sink.on_frame)(StreamFrame {
                    buffer: generator(&descriptor, ts_ms, frame_number),
                    timestamp_ms: ts_ms,
                    frame_number,
                });
                ts_ms += frame_ms;
                frame_number += 1;
            }
            (sink.on_end)();
        });

        cancel.disposer()
    }
}

/// Deterministic [`WaveformService`]: a sine envelope, no audio decode.
#[derive(Debug, Clone, Default)]
pub struct SyntheticWaveforms {
    /// When set, transcode requests fail (drives the unsupported path).
    pub fail_transcode: bool,
}

impl WaveformService for SyntheticWaveforms {
    fn render_waveform(
        &self,
        _descriptor: &ClipDescriptor,
        width: u32,
        height: u32,
        colors: WaveformColors,
    ) -> Result<FrameBuffer> {
        let peaks: Vec<f32> = (0..width)
            .map(|x| ((x as f32 * 0.12).sin().abs()))
            .collect();
        Ok(render_peaks(&peaks, width, height, colors))
    }

    fn transcode_fallback_audio(&self, path: &Path) -> Result<PathBuf> {
        if self.fail_transcode {
            return Err(TrimdeckError::Fallback("synthetic transcode failure".into()));
        }
        Ok(PathBuf::from(format!("{}.fallback.flac", path.display())))
    }
}
