//! Directional swipe detection from camera frames.
//!
//! Consecutive frames are differenced into a binary motion mask, the mask's
//! movement centroid is tracked over time, and the resulting trajectory is
//! matched against directional gesture detectors. No model is involved.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod gestures;
pub mod logging;
pub mod region;
pub mod source;
pub mod trajectory;

pub use config::{EngineConfig, GestureThresholds};
pub use engine::{EngineState, MotionEngine, StopHandle, TickReport};
pub use error::{CaptureError, MotionError, Result};
pub use events::{Event, Notifier};
pub use frame::{MotionMask, PixelFrame};
pub use gestures::{
    Classification, ClassificationRound, Direction, GestureClassifier, GestureDetector,
    MotionWindow,
};
pub use region::{MovementPoint, Region, RegionAnalyzer};
pub use source::{FrameSource, ImageSequenceSource, ReplaySource};
pub use trajectory::{Point, TrajectoryBuffer};
