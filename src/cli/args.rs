//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::adapters::toml_config::AnalysisConfig;
use crate::hash::HashAlgorithm;
use crate::output::writer::ReportFormat;

/// How stage progress is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// No progress output
    #[default]
    None,
    /// Progress through the log
    Log,
    /// One JSON event per line on stderr
    Json,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Video file, or directory searched recursively for mp4/avi/mov/mkv files
    #[arg(short, long)]
    pub input: PathBuf,

    /// Report file (single input) or report directory (directory input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ReportFormat,

    /// Standard deviations above the mean a transition must exceed
    #[arg(long, env = "VIDGUARD_SENSITIVITY")]
    pub sensitivity: Option<f64>,

    /// Absolute dissimilarity floor in [0, 1] a transition must also exceed
    #[arg(long, env = "VIDGUARD_MIN_SCORE")]
    pub min_score: Option<f64>,

    /// Report every flagged transition instead of the first of each run
    #[arg(long)]
    pub no_collapse: bool,

    /// Content hash algorithm
    #[arg(long, env = "VIDGUARD_HASH_ALGORITHM")]
    pub algorithm: Option<HashAlgorithm>,

    /// Width frames are downscaled to before comparison
    #[arg(long, env = "VIDGUARD_ANALYSIS_WIDTH")]
    pub analysis_width: Option<u32>,

    /// Abort a file's analysis after this many seconds
    #[arg(long, env = "VIDGUARD_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Files analyzed concurrently in directory mode (default: CPU count)
    #[arg(long, env = "VIDGUARD_JOBS")]
    pub jobs: Option<usize>,

    /// Progress reporting
    #[arg(long, value_enum, default_value = "none")]
    pub progress: ProgressMode,
}

impl AnalyzeArgs {
    /// Overlay command-line and environment values onto `config`
    pub fn apply_to(&self, config: &mut AnalysisConfig) {
        if let Some(sensitivity) = self.sensitivity {
            config.detection.sensitivity = sensitivity;
        }
        if let Some(min_score) = self.min_score {
            config.detection.min_score = min_score;
        }
        if self.no_collapse {
            config.detection.collapse_adjacent = false;
        }
        if let Some(algorithm) = self.algorithm {
            config.hashing.algorithm = algorithm;
        }
        if let Some(width) = self.analysis_width {
            config.decode.analysis_width = width;
        }
        if let Some(timeout) = self.timeout {
            config.pipeline.timeout_secs = Some(timeout);
        }
        if let Some(jobs) = self.jobs {
            config.pipeline.max_parallel_files = Some(jobs);
        }
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

/// Arguments for the hash command
#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to fingerprint
    #[arg(short, long)]
    pub input: PathBuf,

    /// Content hash algorithm
    #[arg(long, env = "VIDGUARD_HASH_ALGORITHM")]
    pub algorithm: Option<HashAlgorithm>,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Saved JSON forensic report
    #[arg(short, long)]
    pub report: PathBuf,

    /// Video to check (default: the report's file name beside the report)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Content hash algorithm the report was produced with
    #[arg(long, env = "VIDGUARD_HASH_ALGORITHM")]
    pub algorithm: Option<HashAlgorithm>,
}
