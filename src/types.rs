//! Core value types shared across the pipeline.

use opencv::core::{Mat, Rect, Size};
use opencv::prelude::*;

/// Axis-aligned rectangle in frame coordinates.
///
/// Regions are produced by a selection collaborator once at seed time
/// and by the tracker session on every subsequent frame. They carry no
/// state of their own beyond geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A region with non-positive extent cannot seed a tracker.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Clip the region to the bounds of a `frame_width` x `frame_height` frame.
    pub fn clamp_to(&self, frame_width: i32, frame_height: i32) -> Region {
        let x = self.x.clamp(0, frame_width);
        let y = self.y.clamp(0, frame_height);
        let width = self.width.min(frame_width - x).max(0);
        let height = self.height.min(frame_height - y).max(0);
        Region {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::new(rect.x, rect.y, rect.width, rect.height)
    }
}

impl From<Region> for Rect {
    fn from(region: Region) -> Self {
        Rect::new(region.x, region.y, region.width, region.height)
    }
}

/// Source geometry captured once at open time.
///
/// The output writer is sized from these values for the whole run;
/// the source is never re-queried, so a device that reconfigures
/// mid-run keeps the geometry seen at open.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceGeometry {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

impl SourceGeometry {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// One decoded image in the sequence.
///
/// Owned by the loop iteration that read it: stages mutate the pixels
/// in place, sinks only read them, and the frame is dropped at the end
/// of the iteration.
pub struct Frame {
    pub mat: Mat,
    pub index: u64,
}

impl Frame {
    pub fn new(mat: Mat, index: u64) -> Self {
        Self { mat, index }
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }
}
