//! Error types for the frame pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running a frame pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The capture device or input file could not be opened.
    /// Terminal: the pipeline never starts reading frames.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// An output writer or display surface could not be created.
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("frame capture failed: {0}")]
    Capture(#[source] opencv::Error),

    #[error("tracker error: {0}")]
    Tracker(#[source] opencv::Error),

    #[error("stage '{stage}' failed: {message}")]
    Stage {
        stage: &'static str,
        message: String,
    },

    #[error("sink '{sink}' failed: {message}")]
    Sink { sink: &'static str, message: String },

    #[error("region selection failed: {0}")]
    Selection(String),

    #[error("invalid region: {0}")]
    InvalidRegion(String),
}

impl PipelineError {
    pub fn source_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn sink_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SinkUnavailable(msg.into())
    }

    pub fn capture(err: opencv::Error) -> Self {
        Self::Capture(err)
    }

    pub fn tracker(err: opencv::Error) -> Self {
        Self::Tracker(err)
    }

    pub fn stage<S: Into<String>>(stage: &'static str, msg: S) -> Self {
        Self::Stage {
            stage,
            message: msg.into(),
        }
    }

    pub fn sink<S: Into<String>>(sink: &'static str, msg: S) -> Self {
        Self::Sink {
            sink,
            message: msg.into(),
        }
    }

    pub fn selection<S: Into<String>>(msg: S) -> Self {
        Self::Selection(msg.into())
    }

    pub fn invalid_region<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRegion(msg.into())
    }
}
