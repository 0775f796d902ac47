//! Error types shared by every stage of the pipeline.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MotionError>;

#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("pixels_to_skip must be greater than zero")]
    InvalidStride,

    #[error("history_buffer_length must be greater than zero")]
    InvalidHistoryLength,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load config {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: anyhow::Error },

    #[error("frame buffers differ in length (current {current}, previous {previous})")]
    LengthMismatch { current: usize, previous: usize },

    #[error("circular buffer is empty")]
    EmptyBuffer,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Failure reported by a [`FrameSource`](crate::source::FrameSource).
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("frame source could not be initialized: {0}")]
    Init(String),

    #[error("frame source has no more frames")]
    Exhausted,

    #[error("frame {index} has size {got:?}, expected {expected:?}")]
    WrongSize {
        index: usize,
        got: (u32, u32),
        expected: (u32, u32),
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
