//! TrimDeck Core - Foundation types for the cut editor
//!
//! This crate provides the fundamental types used throughout TrimDeck:
//! - Error taxonomy
//! - Frame rates and millisecond timeline math
//! - Crop regions with raw/aware coordinate transforms
//! - Resize dimension resolution
//! - Crop detection over raw frames
//! - Frame buffers
//! - Observable state cells and disposers

pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod observe;
pub mod resize;
pub mod time;

pub use detect::{detect_crop, CropDetectOptions};
pub use error::{Result, TrimdeckError};
pub use frame::{FrameBuffer, PixelFormat};
pub use geometry::{
    flip_region_horizontal, flip_region_vertical, rescale_to_canvas, rotate_region, Orientation,
    Region, Rotation,
};
pub use observe::{CancelFlag, Disposer, Notifier, StateCell};
pub use resize::{parse_pixel_count, resize_dimensions, Dimension, FitMode, ResizeSpec};
pub use time::{format_timestamp, parse_timestamp, FrameRate};
