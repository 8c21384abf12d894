//! TrimDeck Media - decode collaborators for the players
//!
//! This crate holds the contracts the playback engine consumes and their
//! implementations:
//! - Media file probing (`ffprobe` JSON)
//! - Single-frame and streaming decode (`ffmpeg` rawvideo pipe)
//! - Waveform extraction and fallback audio transcode
//! - Synthetic in-process media for tests and development

pub mod probe;
pub mod source;
pub mod synthetic;
pub mod waveform;

pub use probe::{AudioStreamInfo, ClipDescriptor, FfprobeProber, MediaKind, Prober};
pub use source::{FfmpegFrameSource, FrameSink, FrameSource, StreamFrame};
pub use synthetic::{
    synthetic_descriptor, Pacing, SyntheticFrameSource, SyntheticProber, SyntheticWaveforms,
};
pub use waveform::{FfmpegWaveforms, WaveformColors, WaveformService};
