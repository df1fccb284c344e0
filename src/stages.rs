//! Per-frame transform stages.

use opencv::core::Scalar;
use opencv::imgproc;

use crate::error::{PipelineError, Result};
use crate::tracker::TrackerSession;
use crate::types::{Frame, Region};

/// A transform applied to each frame in order, before any sink sees it.
///
/// Stages mutate the frame in place; they have no control-flow impact
/// on the loop beyond failing with an error.
pub trait Stage {
    /// Stage name for logging.
    fn name(&self) -> &str;

    fn apply(&mut self, frame: &mut Frame) -> Result<()>;
}

/// Draw one rectangle per region onto the frame in place.
///
/// Purely visual; the drawing primitive behind [`TrackingStage`].
pub fn draw_regions(
    frame: &mut Frame,
    regions: &[Region],
    color: Scalar,
    thickness: i32,
) -> Result<()> {
    for region in regions {
        imgproc::rectangle(
            &mut frame.mat,
            (*region).into(),
            color,
            thickness,
            imgproc::LINE_8,
            0,
        )
        .map_err(|e| PipelineError::stage("annotate", e.to_string()))?;
    }
    Ok(())
}

/// Updates a seeded tracker session and annotates the tracked regions.
pub struct TrackingStage {
    session: TrackerSession,
    color: Scalar,
    thickness: i32,
}

impl TrackingStage {
    /// Green boxes, thickness 2.
    pub fn new(session: TrackerSession) -> Self {
        Self::with_style(session, Scalar::new(0.0, 255.0, 0.0, 0.0), 2)
    }

    pub fn with_style(session: TrackerSession, color: Scalar, thickness: i32) -> Self {
        Self {
            session,
            color,
            thickness,
        }
    }

    /// Number of tracked objects; constant for the life of the stage.
    pub fn region_count(&self) -> usize {
        self.session.len()
    }
}

impl Stage for TrackingStage {
    fn name(&self) -> &str {
        "tracking"
    }

    fn apply(&mut self, frame: &mut Frame) -> Result<()> {
        let regions = self.session.update(frame)?;
        draw_regions(frame, &regions, self.color, self.thickness)
    }
}
