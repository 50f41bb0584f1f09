//! Frame analysis engine module

pub mod difference;
pub mod progress;

pub use difference::{mean_absolute_difference, FrameDifferenceEngine};
pub use progress::{
    AnalysisStage, CancelOnDrop, CancelToken, JsonProgressCallback, NoProgress, ProgressCallback,
    TracingProgressCallback,
};
