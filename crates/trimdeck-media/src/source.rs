//! Frame source contract and the FFmpeg-backed implementation.
//!
//! Two operations: a one-shot decode of a single frame at a position, and
//! a continuous frame stream delivered through callbacks. Both can fail at
//! any point; stream failures surface through the sink's `on_error`, never
//! as panics. Every stream start returns an idempotent [`Disposer`].

use std::thread;
use std::time::{Duration, Instant};

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use tracing::{debug, warn};
use trimdeck_core::{CancelFlag, Disposer, FrameBuffer, PixelFormat, Result, TrimdeckError};

use crate::probe::ClipDescriptor;

/// One frame delivered by a frame stream.
#[derive(Debug, Clone)]
pub struct StreamFrame {
    pub buffer: FrameBuffer,
    /// Position of this frame on the clip's local timeline.
    pub timestamp_ms: f64,
    pub frame_number: u64,
}

/// Callbacks a frame stream delivers into.
pub struct FrameSink {
    pub on_frame: Box<dyn Fn(StreamFrame) + Send>,
    pub on_end: Box<dyn Fn() + Send>,
    pub on_error: Box<dyn Fn(TrimdeckError) + Send>,
}

/// External decode collaborator.
pub trait FrameSource: Send + Sync {
    /// Decode exactly one frame at the given clip-local position.
    fn get_one_raw_frame(&self, descriptor: &ClipDescriptor, seek_to_ms: f64)
        -> Result<FrameBuffer>;

    /// Start a continuous decoded frame stream from the given position at
    /// the given speed. Frames arrive on a background thread through the
    /// sink. The returned disposer stops the stream.
    fn open_frame_stream(
        &self,
        descriptor: &ClipDescriptor,
        seek_to_ms: f64,
        speed: f64,
        sink: FrameSink,
    ) -> Disposer;
}

/// Frame source backed by an `ffmpeg` child process (rawvideo pipe).
#[derive(Debug, Default)]
pub struct FfmpegFrameSource;

impl FrameSource for FfmpegFrameSource {
    fn get_one_raw_frame(
        &self,
        descriptor: &ClipDescriptor,
        seek_to_ms: f64,
    ) -> Result<FrameBuffer> {
        let seek = format!("{:.3}", seek_to_ms / 1000.0);
        let mut command = FfmpegCommand::new();
        command
            .args(["-ss", seek.as_str()])
            .input(&descriptor.path)
            .args(["-an", "-frames:v", "1"])
            .rawvideo();

        let mut child = command
            .spawn()
            .map_err(|e| TrimdeckError::Fallback(format!("ffmpeg spawn failed: {e}")))?;
        let iter = child
            .iter()
            .map_err(|e| TrimdeckError::Fallback(format!("ffmpeg pipe failed: {e}")))?;

        let mut decoded = None;
        let mut failure = None;
        for event in iter {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    decoded = FrameBuffer::from_packed(
                        frame.width,
                        frame.height,
                        PixelFormat::Rgb24,
                        frame.data,
                    );
                    break;
                }
                FfmpegEvent::Error(message) => {
                    failure = Some(message);
                    break;
                }
                _ => {}
            }
        }
        let _ = child.kill();
        let _ = child.wait();

        match (decoded, failure) {
            (Some(frame), _) => Ok(frame),
            (None, Some(message)) => Err(TrimdeckError::Fallback(message)),
            (None, None) => Err(TrimdeckError::Fallback(format!(
                "no frame decoded at {seek_to_ms} ms from {}",
                descriptor.path
            ))),
        }
    }

    fn open_frame_stream(
        &self,
        descriptor: &ClipDescriptor,
        seek_to_ms: f64,
        speed: f64,
        sink: FrameSink,
    ) -> Disposer {
        let cancel = CancelFlag::new();
        let thread_cancel = cancel.clone();
        let path = descriptor.path.clone();
        debug!(path = %path, seek_to_ms, speed, "opening frame stream");

        thread::spawn(move || {
            run_stream(&path, seek_to_ms, speed, &sink, &thread_cancel);
        });

        cancel.disposer()
    }
}

fn run_stream(path: &str, seek_to_ms: f64, speed: f64, sink: &FrameSink, cancel: &CancelFlag) {
    let seek = format!("{:.3}", seek_to_ms / 1000.0);
    let mut command = FfmpegCommand::new();
    command
        .args(["-ss", seek.as_str()])
        .input(path)
        .args(["-an"])
        .rawvideo();

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            (sink.on_error)(TrimdeckError::Fallback(format!("ffmpeg spawn failed: {e}")));
            return;
        }
    };

    let mut errored = false;
    {
        let iter = match child.iter() {
            Ok(iter) => iter,
            Err(e) => {
                (sink.on_error)(TrimdeckError::Fallback(format!("ffmpeg pipe failed: {e}")));
                return;
            }
        };

        let start = Instant::now();
        let mut first_ts_ms: Option<f64> = None;
        for event in iter {
            if cancel.is_cancelled() {
                break;
            }
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let ts_ms = frame.timestamp as f64 * 1000.0;
                    let rel_ms = ts_ms - *first_ts_ms.get_or_insert(ts_ms);
                    pace(start, rel_ms / speed.max(0.01), cancel);
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(buffer) = FrameBuffer::from_packed(
                        frame.width,
                        frame.height,
                        PixelFormat::Rgb24,
                        frame.data,
                    ) else {
                        continue;
                    };
                    (sink.on_frame)(StreamFrame {
                        buffer,
                        timestamp_ms: seek_to_ms + ts_ms,
                        frame_number: frame.frame_num as u64,
                    });
                }
                FfmpegEvent::Error(message) => {
                    warn!(path = %path, "frame stream error: {message}");
                    (sink.on_error)(TrimdeckError::Fallback(message));
                    errored = true;
                    break;
                }
                _ => {}
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();

    if !errored && !cancel.is_cancelled() {
        (sink.on_end)();
    }
}

/// Sleep until `rel_ms` past `start`, in short slices so cancellation
/// stays responsive.
fn pace(start: Instant, rel_ms: f64, cancel: &CancelFlag) {
    let target = Duration::from_secs_f64((rel_ms / 1000.0).max(0.0));
    while let Some(remaining) = target.checked_sub(start.elapsed()) {
        if cancel.is_cancelled() {
            return;
        }
        thread::sleep(remaining.min(Duration::from_millis(50)));
    }
}
