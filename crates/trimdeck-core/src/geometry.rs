//! Crop regions and raw/aware coordinate transforms.
//!
//! A [`Region`] lives in exactly one of two coordinate spaces:
//!
//! - **raw** — source pixels, before any rotation or flip
//! - **aware** — as rendered, after flips and rotation
//!
//! Flips are defined in raw space and rotation is applied last, so the
//! forward chain is flip-H → flip-V → rotate and the reverse chain undoes
//! the rotation first. [`Orientation`] packages both directions and the
//! round trip is lossless for every valid region (all math is integer).

use serde::{Deserialize, Serialize};

/// A crop rectangle within a source of known dimensions.
///
/// Invariants: `x + width <= source_width`, `y + height <= source_height`,
/// `width >= 1`, `height >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Width of the space this region is expressed in.
    pub source_width: u32,
    /// Height of the space this region is expressed in.
    pub source_height: u32,
}

impl Region {
    /// Create a new region.
    #[inline]
    pub const fn new(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            source_width,
            source_height,
        }
    }

    /// A region covering the whole source.
    #[inline]
    pub const fn full(source_width: u32, source_height: u32) -> Self {
        Self::new(0, 0, source_width, source_height, source_width, source_height)
    }

    /// Check the region invariants.
    pub fn is_valid(self) -> bool {
        self.width >= 1
            && self.height >= 1
            && self.x + self.width <= self.source_width
            && self.y + self.height <= self.source_height
    }

    /// True if this region covers its entire source.
    pub fn is_full(self) -> bool {
        self.x == 0
            && self.y == 0
            && self.width == self.source_width
            && self.height == self.source_height
    }
}

/// Rotation applied when rendering, in degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Construct from degrees; anything not a multiple of 90 in 0..360 is `None`.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::R0),
            90 => Some(Self::R90),
            180 => Some(Self::R180),
            270 => Some(Self::R270),
            _ => None,
        }
    }

    /// Degrees clockwise.
    pub fn degrees(self) -> u32 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::R0 => Self::R0,
            Self::R90 => Self::R270,
            Self::R180 => Self::R180,
            Self::R270 => Self::R90,
        }
    }

    /// True if this rotation swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }
}

/// Rotate a region 90 degrees clockwise. The source dimensions swap.
fn rotate_region_90(region: Region) -> Region {
    Region {
        x: region.source_height - region.y - region.height,
        y: region.x,
        width: region.height,
        height: region.width,
        source_width: region.source_height,
        source_height: region.source_width,
    }
}

/// Rotate a region clockwise by the given rotation.
pub fn rotate_region(region: Region, rotation: Rotation) -> Region {
    let mut r = region;
    for _ in 0..(rotation.degrees() / 90) {
        r = rotate_region_90(r);
    }
    r
}

/// Mirror a region across the vertical axis of its source.
pub fn flip_region_horizontal(region: Region) -> Region {
    Region {
        x: region.source_width - region.x - region.width,
        ..region
    }
}

/// Mirror a region across the horizontal axis of its source.
pub fn flip_region_vertical(region: Region) -> Region {
    Region {
        y: region.source_height - region.y - region.height,
        ..region
    }
}

/// The display orientation of a clip: flips in raw space, then rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Orientation {
    /// No rotation, no flips.
    pub const IDENTITY: Self = Self {
        rotation: Rotation::R0,
        flip_horizontal: false,
        flip_vertical: false,
    };

    /// Map a raw-space region into aware (as-rendered) space.
    pub fn raw_to_aware(self, region: Region) -> Region {
        let mut r = region;
        if self.flip_horizontal {
            r = flip_region_horizontal(r);
        }
        if self.flip_vertical {
            r = flip_region_vertical(r);
        }
        rotate_region(r, self.rotation)
    }

    /// Map an aware-space region back into raw space.
    ///
    /// Exact inverse of [`Self::raw_to_aware`]: rotation is undone first,
    /// then the flips in reverse order.
    pub fn aware_to_raw(self, region: Region) -> Region {
        let mut r = rotate_region(region, self.rotation.inverse());
        if self.flip_vertical {
            r = flip_region_vertical(r);
        }
        if self.flip_horizontal {
            r = flip_region_horizontal(r);
        }
        r
    }

    /// Dimensions of the aware space for a raw source of the given size.
    pub fn aware_dimensions(self, raw_width: u32, raw_height: u32) -> (u32, u32) {
        if self.rotation.swaps_axes() {
            (raw_height, raw_width)
        } else {
            (raw_width, raw_height)
        }
    }
}

/// Rescale a region detected against one clip's frame into a common
/// display canvas of a different size.
///
/// The clip is letterboxed into the canvas: a uniform scale from the
/// constraining axis, then centered on the other axis. The result is
/// clamped so it never exceeds the canvas bounds.
pub fn rescale_to_canvas(region: Region, canvas_width: u32, canvas_height: u32) -> Region {
    let sw = region.source_width.max(1) as f64;
    let sh = region.source_height.max(1) as f64;
    let cw = canvas_width as f64;
    let ch = canvas_height as f64;

    let scale = (cw / sw).min(ch / sh);
    let offset_x = (cw - sw * scale) / 2.0;
    let offset_y = (ch - sh * scale) / 2.0;

    let x = (region.x as f64 * scale + offset_x).round().max(0.0) as u32;
    let y = (region.y as f64 * scale + offset_y).round().max(0.0) as u32;
    let width = (region.width as f64 * scale).round().max(1.0) as u32;
    let height = (region.height as f64 * scale).round().max(1.0) as u32;

    let x = x.min(canvas_width.saturating_sub(1));
    let y = y.min(canvas_height.saturating_sub(1));
    Region {
        x,
        y,
        width: width.min(canvas_width - x),
        height: height.min(canvas_height - y),
        source_width: canvas_width,
        source_height: canvas_height,
    }
}
