//! VidGuard video forensic analysis library
//!
//! Produces a forensic report for a video file: container metadata, a content
//! fingerprint of the raw bytes, and the frame positions whose transition from
//! the preceding frame is statistically anomalous.
//!
//! # Usage
//!
//! ```bash
//! vidguard analyze -i evidence.mp4 -o evidence.mp4.forensic.json
//! vidguard inspect -i evidence.mp4
//! vidguard verify -r evidence.mp4.forensic.json
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod hash;
pub mod output;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use adapters::toml_config::AnalysisConfig;
pub use app::AnalyzeInteractor;
pub use domain::model::{
    AlteredFrameSet, ContentFingerprint, FileIdentity, ForensicReport, FrameAnalysis,
    VideoMetadata,
};
pub use domain::rules::DetectionSettings;
pub use engine::{CancelToken, FrameDifferenceEngine, ProgressCallback};
pub use error::{VidGuardError, VidGuardResult};
pub use hash::{ContentHasher, HashAlgorithm};
pub use output::ForensicReportAssembler;
pub use probe::MetadataReader;

/// Initialize VidGuard library
///
/// Safe to call more than once. Lowers libav's own logging to errors so it
/// does not interleave with ours.
pub fn init() -> VidGuardResult<()> {
    ffmpeg_next::init().map_err(|e| VidGuardError::FFmpegInit {
        message: e.to_string(),
    })?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    Ok(())
}
