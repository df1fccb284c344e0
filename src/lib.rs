//! Composable capture -> stage -> sink frame pipeline for OpenCV
//! video sources.
//!
//! Drives frames from a camera or video file through an ordered list
//! of per-frame stages (tracking update, rectangle annotation) into
//! one or more sinks (display window, MJPG file writer). Cancellation
//! is cooperative, observed at the display sink's key poll, and every
//! acquired resource is released on every exit path — normal
//! exhaustion, cancellation, or failure after partial setup.
//!
//! The tracker (OpenCV KCF), codecs, and windowing are opaque external
//! collaborators reached through the `opencv` crate; this crate only
//! owns the pipeline contract around them.

pub mod error;
pub mod runner;
pub mod select;
pub mod sinks;
pub mod source;
pub mod stages;
pub mod tracker;
pub mod types;

pub use error::{PipelineError, Result};
pub use runner::{PipelineRunner, RunStats};
pub use select::{FixedRegions, RegionSelector, RoiSelector};
pub use sinks::{DisplaySink, FlowControl, FrameSink, VideoFileSink, OUTPUT_FPS};
pub use source::{Capture, FrameSource, VideoSource};
pub use stages::{draw_regions, Stage, TrackingStage};
pub use tracker::TrackerSession;
pub use types::{Frame, Region, SourceGeometry};
