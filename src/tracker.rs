//! Multi-object tracker session backed by OpenCV KCF.
//!
//! The session is opaque external state: one correlation-filter
//! tracker per seeded object, updated frame-to-frame. The object count
//! is fixed at seed time and never changes during a run.

use opencv::core::{Ptr, Rect};
use opencv::prelude::*;
use opencv::tracking::{TrackerKCF, TrackerKCF_Params};

use crate::error::{PipelineError, Result};
use crate::types::{Frame, Region};

struct TrackedObject {
    tracker: Ptr<TrackerKCF>,
    region: Region,
    lost_reported: bool,
}

/// Tracker state for a fixed set of objects, seeded once.
pub struct TrackerSession {
    objects: Vec<TrackedObject>,
}

impl TrackerSession {
    /// Seed one KCF tracker per region on the given frame.
    ///
    /// The region list must be non-empty (an empty selection is a
    /// short-circuit handled by the caller, not a session) and every
    /// region must have positive extent.
    pub fn seed(frame: &Frame, regions: &[Region]) -> Result<Self> {
        if regions.is_empty() {
            return Err(PipelineError::invalid_region(
                "cannot seed a tracker session with no regions",
            ));
        }

        let mut objects = Vec::with_capacity(regions.len());
        for region in regions {
            // KCF rejects regions outside the image.
            let region = region.clamp_to(frame.width(), frame.height());
            if region.is_empty() {
                return Err(PipelineError::invalid_region(format!(
                    "region {:?} has no extent inside the frame",
                    region
                )));
            }
            let params = TrackerKCF_Params::default().map_err(PipelineError::tracker)?;
            let mut tracker = TrackerKCF::create(params).map_err(PipelineError::tracker)?;
            tracker
                .init(&frame.mat, region.into())
                .map_err(PipelineError::tracker)?;
            objects.push(TrackedObject {
                tracker,
                region,
                lost_reported: false,
            });
        }

        Ok(Self { objects })
    }

    /// Update every tracker against the current frame.
    ///
    /// The returned regions correspond to seed order. An object the
    /// tracker lost keeps its last known region (stale geometry) and
    /// the run continues; the loss is logged once per object.
    pub fn update(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        let mut regions = Vec::with_capacity(self.objects.len());
        for (idx, object) in self.objects.iter_mut().enumerate() {
            let mut rect: Rect = object.region.into();
            match object.tracker.update(&frame.mat, &mut rect) {
                Ok(true) => {
                    object.region = rect.into();
                    object.lost_reported = false;
                }
                _ => {
                    // Lost target: stale geometry, not an error.
                    if !object.lost_reported {
                        log::warn!(
                            "tracker lost object {} at frame {}, keeping last region",
                            idx,
                            frame.index
                        );
                        object.lost_reported = true;
                    }
                }
            }
            regions.push(object.region);
        }
        Ok(regions)
    }

    /// Number of tracked objects, fixed since seeding.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
