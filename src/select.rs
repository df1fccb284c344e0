//! Region selection collaborators for seeding the tracker.

use opencv::core::{Rect, Vector};
use opencv::highgui;

use crate::error::{PipelineError, Result};
use crate::types::{Frame, Region};

/// Collaborator that picks zero or more regions on a frame.
///
/// Invoked at most once per run, before the tracking loop starts.
/// Returning an empty list is not an error: the runner skips tracking
/// for the run.
pub trait RegionSelector {
    fn select(&mut self, frame: &Frame) -> Result<Vec<Region>>;
}

/// Interactive selection via the highgui ROI picker.
pub struct RoiSelector {
    window: String,
}

impl RoiSelector {
    pub fn new(window: &str) -> Self {
        Self {
            window: window.to_string(),
        }
    }
}

impl RegionSelector for RoiSelector {
    fn select(&mut self, frame: &Frame) -> Result<Vec<Region>> {
        let mut rois = Vector::<Rect>::new();
        highgui::select_rois(&self.window, &frame.mat, &mut rois, true, false)
            .map_err(|e| PipelineError::selection(e.to_string()))?;
        let regions: Vec<Region> = rois
            .iter()
            .map(Region::from)
            .filter(|region| !region.is_empty())
            .collect();
        log::info!("selected {} region(s)", regions.len());
        Ok(regions)
    }
}

/// Non-interactive selector returning a preset list; used for headless
/// runs and as a test double.
pub struct FixedRegions {
    regions: Vec<Region>,
}

impl FixedRegions {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }
}

impl RegionSelector for FixedRegions {
    fn select(&mut self, _frame: &Frame) -> Result<Vec<Region>> {
        Ok(self.regions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Mat, Scalar, CV_8UC3};

    #[test]
    fn fixed_regions_returns_preset_list() {
        let regions = vec![Region::new(1, 2, 3, 4), Region::new(5, 6, 7, 8)];
        let mut selector = FixedRegions::new(regions.clone());

        let mat = Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(0.0)).unwrap();
        let frame = Frame::new(mat, 0);
        assert_eq!(selector.select(&frame).unwrap(), regions);
    }

    #[test]
    fn fixed_regions_may_be_empty() {
        let mut selector = FixedRegions::new(Vec::new());
        let mat = Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(0.0)).unwrap();
        let frame = Frame::new(mat, 0);
        assert!(selector.select(&frame).unwrap().is_empty());
    }
}
