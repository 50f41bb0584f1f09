//! Chain-of-custody verification of saved reports

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::model::{FileIdentity, ForensicReport, VideoMetadata};
use crate::engine::progress::{CancelToken, ProgressCallback};
use crate::error::{VidGuardError, VidGuardResult};
use crate::hash::ContentHasher;
use crate::probe::MetadataReader;

/// Frame rates closer than this are considered equal
const FRAME_RATE_TOLERANCE: f64 = 1e-6;

/// Individual verification check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCheck {
    /// Field compared
    pub check_type: String,
    /// Value recorded in the report
    pub expected: String,
    /// Value observed on disk now
    pub actual: String,
    /// Check passed
    pub success: bool,
}

impl VerificationCheck {
    fn compare(check_type: &str, expected: impl ToString, actual: impl ToString, success: bool) -> Self {
        Self {
            check_type: check_type.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            success,
        }
    }
}

/// Outcome of verifying one file against its report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Every check passed
    pub success: bool,
    /// Individual verification checks
    pub checks: Vec<VerificationCheck>,
}

impl VerificationOutcome {
    fn from_checks(checks: Vec<VerificationCheck>) -> Self {
        Self {
            success: checks.iter().all(|check| check.success),
            checks,
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|check| !check.success)
    }
}

/// Load a saved JSON report
pub fn load_report(path: &Path) -> VidGuardResult<ForensicReport> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| VidGuardError::ReportFormat {
        message: format!("failed to parse report {}: {}", path.display(), e),
    })
}

/// Re-examines a video and compares it with a saved report
pub struct ReportVerifier {
    hasher: ContentHasher,
    reader: MetadataReader,
}

impl ReportVerifier {
    pub fn new(hasher: ContentHasher) -> Self {
        Self {
            hasher,
            reader: MetadataReader::new(),
        }
    }

    /// Re-hash `video` and re-read its metadata, comparing both with `report`.
    ///
    /// Duration is derived from frame count and rate so it is not compared on
    /// its own.
    pub fn verify(
        &self,
        report: &ForensicReport,
        video: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressCallback,
    ) -> VidGuardResult<VerificationOutcome> {
        info!("Verifying {} against its report", video.display());

        let identity = FileIdentity::from_path(video)?;
        let hash = self.hasher.hash_path(video, cancel, progress)?;
        let metadata = self.reader.read(video, cancel)?;

        let mut checks = vec![
            VerificationCheck::compare(
                "hash",
                report.hash(),
                &hash,
                report.hash().matches(&hash),
            ),
            VerificationCheck::compare(
                "filesize",
                report.filesize(),
                identity.filesize,
                report.filesize() == identity.filesize,
            ),
        ];
        checks.extend(compare_metadata(report.metadata(), &metadata));

        let outcome = VerificationOutcome::from_checks(checks);
        if outcome.success {
            info!("Verification passed: {}", video.display());
        } else {
            for check in outcome.failed_checks() {
                warn!(
                    check = %check.check_type,
                    expected = %check.expected,
                    actual = %check.actual,
                    "Verification check failed"
                );
            }
        }
        Ok(outcome)
    }
}

/// Field-by-field metadata comparison
pub fn compare_metadata(expected: &VideoMetadata, actual: &VideoMetadata) -> Vec<VerificationCheck> {
    let created = |m: &VideoMetadata| m.creation_timestamp().unwrap_or("none").to_string();
    vec![
        VerificationCheck::compare(
            "frame_count",
            expected.frame_count(),
            actual.frame_count(),
            expected.frame_count() == actual.frame_count(),
        ),
        VerificationCheck::compare(
            "fps",
            expected.frame_rate(),
            actual.frame_rate(),
            (expected.frame_rate() - actual.frame_rate()).abs() < FRAME_RATE_TOLERANCE,
        ),
        VerificationCheck::compare(
            "resolution",
            format!("{}x{}", expected.width(), expected.height()),
            format!("{}x{}", actual.width(), actual.height()),
            expected.width() == actual.width() && expected.height() == actual.height(),
        ),
        VerificationCheck::compare(
            "codec",
            expected.codec_id(),
            actual.codec_id(),
            expected.codec_id() == actual.codec_id(),
        ),
        VerificationCheck::compare(
            "creation_timestamp",
            created(expected),
            created(actual),
            expected.creation_timestamp() == actual.creation_timestamp(),
        ),
    ]
}
