//! Frame sinks: interactive display window and MJPG file writer.

use std::path::Path;

use opencv::highgui;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;

use crate::error::{PipelineError, Result};
use crate::types::{Frame, SourceGeometry};

/// Output recordings are written at a fixed rate, independent of the
/// rate the source happens to deliver frames at.
pub const OUTPUT_FPS: f64 = 30.0;

/// Default display refresh / key poll slice in milliseconds.
pub const DEFAULT_KEY_DELAY_MS: i32 = 25;

/// What the loop should do after a sink consumed a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowControl {
    Continue,
    Stop,
}

/// Consumer of frames: display surface, file writer, or a test double.
pub trait FrameSink {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Consume one frame. `Stop` requests cooperative cancellation;
    /// the runner still delivers the current frame to every sink
    /// before honoring it.
    fn consume(&mut self, frame: &Frame) -> Result<FlowControl>;

    /// Release the sink's resources. Must be idempotent; the runner
    /// calls it on every exit path.
    fn close(&mut self) -> Result<()>;
}

/// Appends frames to an MJPG-in-AVI recording at [`OUTPUT_FPS`], sized
/// from the geometry the source reported at open time.
pub struct VideoFileSink {
    writer: Option<VideoWriter>,
    frames_written: u64,
}

impl VideoFileSink {
    pub fn create(path: &Path, geometry: SourceGeometry) -> Result<Self> {
        let path_str = path.to_str().ok_or_else(|| {
            PipelineError::sink_unavailable(format!("invalid output path: {}", path.display()))
        })?;

        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')
            .map_err(|e| PipelineError::sink_unavailable(e.to_string()))?;
        let writer = VideoWriter::new(path_str, fourcc, OUTPUT_FPS, geometry.size(), true)
            .map_err(|e| {
                PipelineError::sink_unavailable(format!("{}: {}", path.display(), e))
            })?;

        if !writer.is_opened().unwrap_or(false) {
            return Err(PipelineError::sink_unavailable(format!(
                "could not create writer for {}",
                path.display()
            )));
        }

        log::info!(
            "recording to {} at {}x{} @ {} fps",
            path.display(),
            geometry.width,
            geometry.height,
            OUTPUT_FPS
        );

        Ok(Self {
            writer: Some(writer),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for VideoFileSink {
    fn name(&self) -> &str {
        "writer"
    }

    fn consume(&mut self, frame: &Frame) -> Result<FlowControl> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write(&frame.mat)
                .map_err(|e| PipelineError::sink("writer", e.to_string()))?;
            self.frames_written += 1;
        }
        Ok(FlowControl::Continue)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .release()
                .map_err(|e| PipelineError::sink("writer", e.to_string()))?;
            log::info!("released writer after {} frames", self.frames_written);
        }
        Ok(())
    }
}

/// Renders frames to a highgui window.
///
/// The `wait_key` call inside `consume` is the single suspension point
/// of the whole loop: it lets the surface refresh and polls for a
/// keypress. Any key requests cancellation, observed at most one frame
/// late.
pub struct DisplaySink {
    window: String,
    key_delay_ms: i32,
    open: bool,
}

impl DisplaySink {
    pub fn open(window: &str) -> Result<Self> {
        Self::with_key_delay(window, DEFAULT_KEY_DELAY_MS)
    }

    pub fn with_key_delay(window: &str, key_delay_ms: i32) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE).map_err(|e| {
            PipelineError::sink_unavailable(format!("window '{}': {}", window, e))
        })?;
        Ok(Self {
            window: window.to_string(),
            key_delay_ms: key_delay_ms.max(1),
            open: true,
        })
    }

    pub fn window(&self) -> &str {
        &self.window
    }
}

impl FrameSink for DisplaySink {
    fn name(&self) -> &str {
        "display"
    }

    fn consume(&mut self, frame: &Frame) -> Result<FlowControl> {
        highgui::imshow(&self.window, &frame.mat)
            .map_err(|e| PipelineError::sink("display", e.to_string()))?;

        let key = highgui::wait_key(self.key_delay_ms)
            .map_err(|e| PipelineError::sink("display", e.to_string()))?;
        if key >= 0 {
            log::info!("key {} pressed at frame {}, stopping", key, frame.index);
            Ok(FlowControl::Stop)
        } else {
            Ok(FlowControl::Continue)
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            highgui::destroy_window(&self.window)
                .map_err(|e| PipelineError::sink("display", e.to_string()))?;
        }
        Ok(())
    }
}
