//! Video sources: camera devices and files behind a common trait.

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_ANY};

use crate::error::{PipelineError, Result};
use crate::types::{Frame, SourceGeometry};

/// Frame rate assumed when the source reports none (common with cameras).
pub const FALLBACK_FPS: f64 = 30.0;

/// Input source: a local capture device by index, or a video file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSource {
    Camera(i32),
    File(PathBuf),
}

impl VideoSource {
    /// An integer literal selects a camera index, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        match arg.parse::<i32>() {
            Ok(index) => VideoSource::Camera(index),
            Err(_) => VideoSource::File(PathBuf::from(arg)),
        }
    }
}

impl FromStr for VideoSource {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(VideoSource::from_arg(s))
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::Camera(index) => write!(f, "camera {}", index),
            VideoSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Producer of frames for the pipeline runner.
pub trait FrameSource {
    /// Geometry captured when the source was opened.
    fn geometry(&self) -> SourceGeometry;

    /// Produce the next frame, or `Ok(None)` when the source is
    /// exhausted or the device disconnects. End-of-stream is not an
    /// error.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// OpenCV-backed frame source.
pub struct Capture {
    capture: VideoCapture,
    geometry: SourceGeometry,
    next_index: u64,
}

impl Capture {
    /// Open a capture device or video file.
    ///
    /// Fails with `SourceUnavailable` when the device/file cannot be
    /// opened; the check happens before any frame read. Geometry is
    /// read once here and never again.
    pub fn open(source: &VideoSource) -> Result<Self> {
        let capture = match source {
            VideoSource::Camera(index) => VideoCapture::new(*index, CAP_ANY),
            VideoSource::File(path) => {
                let path_str = path.to_str().ok_or_else(|| {
                    PipelineError::source_unavailable(format!(
                        "invalid path: {}",
                        path.display()
                    ))
                })?;
                VideoCapture::from_file(path_str, CAP_ANY)
            }
        }
        .map_err(|e| PipelineError::source_unavailable(format!("{}: {}", source, e)))?;

        if !capture.is_opened().unwrap_or(false) {
            return Err(PipelineError::source_unavailable(source.to_string()));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as i32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as i32;
        let mut fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        if fps <= 0.0 {
            log::warn!(
                "source reported invalid fps ({}), assuming {}",
                fps,
                FALLBACK_FPS
            );
            fps = FALLBACK_FPS;
        }

        log::info!("opened {}: {}x{} @ {:.2} fps", source, width, height, fps);

        Ok(Self {
            capture,
            geometry: SourceGeometry { width, height, fps },
            next_index: 0,
        })
    }
}

impl FrameSource for Capture {
    fn geometry(&self) -> SourceGeometry {
        self.geometry
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        let read = self
            .capture
            .read(&mut mat)
            .map_err(PipelineError::capture)?;
        if !read || mat.empty() {
            log::info!("end of stream after {} frames", self.next_index);
            return Ok(None);
        }
        let frame = Frame::new(mat, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }
}
