// Analyze interactor - Orchestrates the concurrent forensic analysis use case

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::adapters::decode_libav::LibavFrameSourceOpener;
use crate::adapters::toml_config::AnalysisConfig;
use crate::domain::model::{FileIdentity, ForensicReport};
use crate::engine::difference::FrameDifferenceEngine;
use crate::engine::progress::{
    AnalysisStage, CancelOnDrop, CancelToken, NoProgress, ProgressCallback,
};
use crate::error::{VidGuardError, VidGuardResult};
use crate::hash::ContentHasher;
use crate::output::assembler::ForensicReportAssembler;
use crate::ports::FrameSourceOpener;
use crate::probe::MetadataReader;
use crate::utils::time::analysis_timestamp;

/// Interactor for the analyze use case
#[derive(Clone)]
pub struct AnalyzeInteractor {
    config: Arc<AnalysisConfig>,
    opener: Arc<dyn FrameSourceOpener>,
    progress: Arc<dyn ProgressCallback>,
}

impl AnalyzeInteractor {
    /// Create an interactor decoding through libav
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
            opener: Arc::new(LibavFrameSourceOpener),
            progress: Arc::new(NoProgress),
        }
    }

    /// Replace the frame source used by the frame analysis producer
    pub fn with_frame_source_opener(mut self, opener: Arc<dyn FrameSourceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one file with a fresh cancel token
    pub async fn analyze(&self, path: &Path) -> VidGuardResult<ForensicReport> {
        self.analyze_with_cancel(path, CancelToken::new()).await
    }

    /// Analyze one file; cancelling `cancel` stops every producer.
    ///
    /// Metadata, hashing and frame analysis run concurrently on blocking
    /// threads. The report is only assembled after all three have returned,
    /// including when the time limit expires. Dropping the returned future
    /// before it completes also cancels the producers.
    pub async fn analyze_with_cancel(
        &self,
        path: &Path,
        cancel: CancelToken,
    ) -> VidGuardResult<ForensicReport> {
        info!("Starting forensic analysis: {}", path.display());
        let identity = FileIdentity::from_path(path)?;
        let timestamp = analysis_timestamp();

        let metadata_task = {
            let path = path.to_path_buf();
            let cancel = cancel.clone();
            let progress = Arc::clone(&self.progress);
            tokio::task::spawn_blocking(move || {
                run_stage(AnalysisStage::Metadata, &*progress, &cancel, || {
                    MetadataReader::new().read(&path, &cancel)
                })
            })
        };

        let hash_task = {
            let path = path.to_path_buf();
            let cancel = cancel.clone();
            let progress = Arc::clone(&self.progress);
            let hasher = ContentHasher::new(self.config.hashing.algorithm)
                .with_chunk_size(self.config.hashing.chunk_size);
            tokio::task::spawn_blocking(move || {
                run_stage(AnalysisStage::Hashing, &*progress, &cancel, || {
                    hasher.hash_path(&path, &cancel, &*progress)
                })
            })
        };

        let frames_task = {
            let path = path.to_path_buf();
            let cancel = cancel.clone();
            let progress = Arc::clone(&self.progress);
            let opener = Arc::clone(&self.opener);
            let engine = FrameDifferenceEngine::new(self.config.detection.clone())
                .with_progress_interval(self.config.pipeline.progress_interval);
            let analysis_width = self.config.decode.analysis_width;
            tokio::task::spawn_blocking(move || {
                run_stage(AnalysisStage::FrameAnalysis, &*progress, &cancel, || {
                    let mut source = opener.open(&path, analysis_width)?;
                    engine.analyze(&mut source, &cancel, &*progress)
                })
            })
        };

        let abandon_guard = CancelOnDrop::new(cancel.clone());
        let joined = async { tokio::join!(metadata_task, hash_task, frames_task) };
        let (metadata, hash, frames) = match self.config.pipeline.timeout_secs {
            Some(seconds) => {
                tokio::pin!(joined);
                match tokio::time::timeout(Duration::from_secs(seconds), &mut joined).await {
                    Ok(results) => results,
                    Err(_) => {
                        warn!(seconds, "Analysis timed out; cancelling producers");
                        cancel.cancel();
                        let _ = joined.await;
                        return Err(VidGuardError::Timeout { seconds });
                    }
                }
            }
            None => joined.await,
        };
        abandon_guard.disarm();

        self.progress.on_start(AnalysisStage::Assembly);
        let assembled = ForensicReportAssembler::new().assemble(
            identity,
            flatten_join(metadata),
            flatten_join(hash),
            flatten_join(frames),
            timestamp,
        );
        match &assembled {
            Ok(_) => self.progress.on_complete(AnalysisStage::Assembly),
            Err(e) => self
                .progress
                .on_error(AnalysisStage::Assembly, &e.to_string()),
        }
        assembled
    }

    /// Analyze several files, at most `max_parallel_files` at a time.
    ///
    /// Results come back in input order; one file failing does not stop the
    /// others.
    pub async fn analyze_many(
        &self,
        paths: Vec<PathBuf>,
        cancel: CancelToken,
    ) -> Vec<(PathBuf, VidGuardResult<ForensicReport>)> {
        let limit = self
            .config
            .pipeline
            .max_parallel_files
            .unwrap_or_else(num_cpus::get)
            .max(1);
        debug!(files = paths.len(), limit, "Analyzing batch");

        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        for (position, path) in paths.iter().cloned().enumerate() {
            let interactor = self.clone();
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => interactor.analyze_with_cancel(&path, cancel).await,
                    Err(e) => Err(VidGuardError::TaskFailed {
                        message: e.to_string(),
                    }),
                };
                (position, result)
            });
        }

        let mut results: Vec<Option<VidGuardResult<ForensicReport>>> =
            paths.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(e) => warn!(error = %e, "Batch analysis task failed"),
            }
        }

        paths
            .into_iter()
            .zip(results)
            .map(|(path, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(VidGuardError::TaskFailed {
                        message: "analysis task did not complete".to_string(),
                    })
                });
                (path, result)
            })
            .collect()
    }
}

/// Run one producer with progress events; a fatal failure cancels its siblings
fn run_stage<T>(
    stage: AnalysisStage,
    progress: &dyn ProgressCallback,
    cancel: &CancelToken,
    work: impl FnOnce() -> VidGuardResult<T>,
) -> VidGuardResult<T> {
    progress.on_start(stage);
    let result = work();
    match &result {
        Ok(_) => progress.on_complete(stage),
        Err(e) => {
            if !matches!(e, VidGuardError::Cancelled) {
                debug!(%stage, "Producer failed; cancelling siblings");
                cancel.cancel();
            }
            progress.on_error(stage, &e.to_string());
        }
    }
    result
}

fn flatten_join<T>(joined: Result<VidGuardResult<T>, JoinError>) -> VidGuardResult<T> {
    joined.unwrap_or_else(|e| {
        Err(VidGuardError::TaskFailed {
            message: e.to_string(),
        })
    })
}
