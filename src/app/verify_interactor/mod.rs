// Verify interactor - Orchestrates chain-of-custody verification

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::engine::progress::{CancelToken, NoProgress, ProgressCallback};
use crate::error::{VidGuardError, VidGuardResult};
use crate::hash::ContentHasher;
use crate::output::verifier::{load_report, ReportVerifier, VerificationOutcome};

/// Request for report verification
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    /// Saved JSON report
    pub report_path: PathBuf,
    /// Video to check; defaults to the report's file name next to the report
    pub video_path: Option<PathBuf>,
}

impl VerifyRequest {
    /// Video path to check
    pub fn resolve_video_path(&self, report_filename: &str) -> PathBuf {
        match &self.video_path {
            Some(path) => path.clone(),
            None => self
                .report_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(report_filename),
        }
    }
}

/// Interactor for report verification
#[derive(Clone)]
pub struct VerifyInteractor {
    hasher: ContentHasher,
    progress: Arc<dyn ProgressCallback>,
}

impl VerifyInteractor {
    pub fn new(hasher: ContentHasher) -> Self {
        Self {
            hasher,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Execute verification off the async runtime
    pub async fn execute(&self, request: VerifyRequest) -> VidGuardResult<VerificationOutcome> {
        info!("Starting verification: {}", request.report_path.display());
        let hasher = self.hasher;
        let progress = Arc::clone(&self.progress);

        tokio::task::spawn_blocking(move || {
            let report = load_report(&request.report_path)?;
            let video = request.resolve_video_path(report.filename());
            ReportVerifier::new(hasher).verify(&report, &video, &CancelToken::new(), &*progress)
        })
        .await
        .map_err(|e| VidGuardError::TaskFailed {
            message: e.to_string(),
        })?
    }
}
