//! Error handling module for VidGuard

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for VidGuard operations
#[derive(Error, Debug)]
pub enum VidGuardError {
    /// Container could not be opened or its video stream identified
    #[error("Unreadable container {path}: {message}")]
    UnreadableContainer { path: PathBuf, message: String },

    /// No decoder is available for the primary video stream
    #[error("Unsupported codec in {path}: {codec}")]
    UnsupportedCodec { path: PathBuf, codec: String },

    /// Frame rate is zero, negative or not a number, so duration is undefined
    #[error("Invalid frame rate {frame_rate}: duration cannot be derived")]
    InvalidFrameRate { frame_rate: f64 },

    /// Read failure while streaming bytes into the hash
    #[error("Failed to read {path} while hashing: {source}")]
    HashIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stream-level decode failure; no further frames can be read
    #[error("Decode error: {message}")]
    DecodeError { message: String },

    /// A single frame failed to decode and was skipped
    #[error("Corrupt frame {index}: {reason}")]
    CorruptFrame { index: u64, reason: String },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    FFmpegInit { message: String },

    /// Analysis aborted through its cancel token
    #[error("Analysis cancelled")]
    Cancelled,

    /// Analysis exceeded the configured time limit
    #[error("Analysis timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// A producer task panicked or was aborted
    #[error("Analysis task failed: {message}")]
    TaskFailed { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A report could not be serialized or parsed
    #[error("Report format error: {message}")]
    ReportFormat { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] ffmpeg_next::Error),
}

impl VidGuardError {
    /// Whether this error aborts report assembly.
    ///
    /// Only [`VidGuardError::CorruptFrame`] is absorbed locally by the frame
    /// engine; everything else stops the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VidGuardError::CorruptFrame { .. })
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        VidGuardError::UnreadableContainer {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(message: impl ToString) -> Self {
        VidGuardError::DecodeError {
            message: message.to_string(),
        }
    }
}

/// Result type alias for VidGuard operations
pub type VidGuardResult<T> = std::result::Result<T, VidGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_corrupt_frame_is_recoverable() {
        let corrupt = VidGuardError::CorruptFrame {
            index: 3,
            reason: "invalid data".to_string(),
        };
        assert!(!corrupt.is_fatal());

        assert!(VidGuardError::InvalidFrameRate { frame_rate: 0.0 }.is_fatal());
        assert!(VidGuardError::decode("demuxer failed").is_fatal());
        assert!(VidGuardError::Cancelled.is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_input() {
        let err = VidGuardError::unreadable("/tmp/clip.mp4", "no video stream");
        let message = err.to_string();
        assert!(message.contains("/tmp/clip.mp4"));
        assert!(message.contains("no video stream"));
    }
}
