//! CLI module for VidGuard
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

pub use args::{AnalyzeArgs, HashArgs, InspectArgs, ProgressMode, VerifyArgs};

/// VidGuard video forensic analyzer
///
/// Reads container metadata, fingerprints file content and flags frames whose
/// transition from the previous frame is statistically anomalous.
#[derive(Parser, Debug)]
#[command(name = "vidguard")]
#[command(about = "VidGuard - Video tamper analysis and forensic reports")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn", env = "VIDGUARD_LOG_LEVEL", global = true)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", env = "VIDGUARD_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Configuration file (default: ./vidguard.toml when present)
    #[arg(long, env = "VIDGUARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a video file, or every video under a directory, for tampering
    Analyze(AnalyzeArgs),
    /// Show container and stream metadata
    Inspect(InspectArgs),
    /// Print the content fingerprint of a file
    Hash(HashArgs),
    /// Check a video against a saved forensic report
    Verify(VerifyArgs),
}
