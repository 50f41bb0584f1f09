//! Progress tracking and cancellation hooks for the analysis pipeline

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{VidGuardError, VidGuardResult};

/// Pipeline stages reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Reading container and stream metadata
    Metadata,
    /// Streaming file bytes through the content hash
    Hashing,
    /// Decoding and differencing the frame sequence
    FrameAnalysis,
    /// Joining producer outputs into the report
    Assembly,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisStage::Metadata => "metadata",
            AnalysisStage::Hashing => "hashing",
            AnalysisStage::FrameAnalysis => "frame analysis",
            AnalysisStage::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

/// Progress callback trait for UI integration.
///
/// Callbacks may be invoked from several producer threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage starts
    fn on_start(&self, _stage: AnalysisStage) {}

    /// Called periodically with completed work units (frames or bytes)
    fn on_progress(&self, _stage: AnalysisStage, _completed: u64, _total: Option<u64>) {}

    /// Called when a stage completes successfully
    fn on_complete(&self, _stage: AnalysisStage) {}

    /// Called when a stage fails
    fn on_error(&self, _stage: AnalysisStage, _error: &str) {}
}

/// Callback that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

/// Reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressCallback;

impl ProgressCallback for TracingProgressCallback {
    fn on_start(&self, stage: AnalysisStage) {
        tracing::info!(%stage, "Stage started");
    }

    fn on_progress(&self, stage: AnalysisStage, completed: u64, total: Option<u64>) {
        match total {
            Some(total) if total > 0 => {
                let percent = (completed as f64 / total as f64 * 100.0).min(100.0);
                tracing::info!(%stage, completed, total, "{:>5.1}%", percent);
            }
            _ => tracing::info!(%stage, completed, "Progress"),
        }
    }

    fn on_complete(&self, stage: AnalysisStage) {
        tracing::info!(%stage, "Stage completed");
    }

    fn on_error(&self, stage: AnalysisStage, error: &str) {
        tracing::error!(%stage, error, "Stage failed");
    }
}

/// JSON progress callback for structured output on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProgressCallback;

impl JsonProgressCallback {
    fn emit(&self, event: serde_json::Value) {
        eprintln!("{}", event);
    }
}

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, stage: AnalysisStage) {
        self.emit(serde_json::json!({
            "event": "start",
            "stage": stage,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_progress(&self, stage: AnalysisStage, completed: u64, total: Option<u64>) {
        let percent = total
            .filter(|&t| t > 0)
            .map(|t| (completed as f64 / t as f64 * 100.0).min(100.0));

        self.emit(serde_json::json!({
            "event": "progress",
            "stage": stage,
            "completed": completed,
            "total": total,
            "percent": percent,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_complete(&self, stage: AnalysisStage) {
        self.emit(serde_json::json!({
            "event": "complete",
            "stage": stage,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_error(&self, stage: AnalysisStage, error: &str) {
        self.emit(serde_json::json!({
            "event": "error",
            "stage": stage,
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }
}

/// Shared flag that aborts every producer holding a clone of it
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> VidGuardResult<()> {
        if self.is_cancelled() {
            Err(VidGuardError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Cancels its token when dropped unless disarmed first
#[derive(Debug)]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    pub fn new(token: CancelToken) -> Self {
        Self { token: Some(token) }
    }

    /// Drop without cancelling
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ProgressCallback for Recorder {
        fn on_start(&self, stage: AnalysisStage) {
            self.events.lock().unwrap().push(format!("start:{}", stage));
        }

        fn on_complete(&self, stage: AnalysisStage) {
            self.events.lock().unwrap().push(format!("complete:{}", stage));
        }
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(VidGuardError::Cancelled)));
    }

    #[test]
    fn test_cancel_on_drop_cancels_unless_disarmed() {
        let token = CancelToken::new();
        drop(CancelOnDrop::new(token.clone()));
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        CancelOnDrop::new(token.clone()).disarm();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_default_callback_methods_are_optional() {
        let recorder = Recorder::default();
        recorder.on_start(AnalysisStage::Hashing);
        recorder.on_progress(AnalysisStage::Hashing, 10, Some(20));
        recorder.on_complete(AnalysisStage::Hashing);

        let events = recorder.events.lock().unwrap();
        assert_eq!(*events, vec!["start:hashing", "complete:hashing"]);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let value = serde_json::to_value(AnalysisStage::FrameAnalysis).unwrap();
        assert_eq!(value, "frame_analysis");
    }
}
