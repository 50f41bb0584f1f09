//! Frame-sequence tamper detection by inter-frame differencing
//!
//! Frames are pulled one at a time from a [`FrameSource`]; only the previous
//! decoded frame is retained. Each consecutive pair gets a dissimilarity score,
//! the scores feed a running mean/variance, and after the pass every pair whose
//! score exceeds `mean + k * stddev` marks its later frame as altered.

use tracing::{debug, info, warn};

use crate::domain::model::{AlteredFrameSet, FrameAnalysis};
use crate::domain::rules::{DetectionSettings, RunningStats, ThresholdRule};
use crate::engine::progress::{AnalysisStage, CancelToken, ProgressCallback};
use crate::error::{VidGuardError, VidGuardResult};
use crate::ports::{FrameEvent, FrameSource, LumaFrame};

/// Default number of frames between progress callbacks
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 250;

/// Inter-frame difference analyzer
pub struct FrameDifferenceEngine {
    rule: ThresholdRule,
    progress_interval: u64,
}

impl FrameDifferenceEngine {
    /// Create an engine with the given decision settings
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            rule: ThresholdRule::new(settings),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Report progress every `frames` frames; 0 disables progress events
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    /// Run one pass over `source` and flag altered frames
    pub fn analyze<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancelToken,
        progress: &dyn ProgressCallback,
    ) -> VidGuardResult<FrameAnalysis> {
        let expected = source.expected_frames();
        let mut previous: Option<LumaFrame> = None;
        let mut stats = RunningStats::new();
        let mut scores: Vec<(u64, f64)> = Vec::new();
        let mut corrupt_frames = Vec::new();
        let mut index: u64 = 0;

        loop {
            cancel.check()?;
            let Some(event) = source.next_event()? else {
                break;
            };

            match event {
                FrameEvent::Frame(frame) => {
                    if let Some(prev) = previous.as_ref() {
                        let score = mean_absolute_difference(prev, &frame);
                        stats.push(score);
                        scores.push((index, score));
                    }
                    previous = Some(frame);
                }
                FrameEvent::Corrupt { reason } => {
                    let skipped = VidGuardError::CorruptFrame { index, reason };
                    warn!(error = %skipped, "Skipping undecodable frame");
                    corrupt_frames.push(index);
                    // Neither neighbouring pair is scored
                    previous = None;
                }
            }

            index += 1;
            if self.progress_interval > 0 && index % self.progress_interval == 0 {
                progress.on_progress(AnalysisStage::FrameAnalysis, index, expected);
            }
        }

        let threshold = self.rule.threshold(&stats);
        let altered = AlteredFrameSet::from_indices(self.rule.flag(&scores, threshold));

        debug!(
            pairs = stats.count(),
            mean = stats.mean(),
            stddev = stats.stddev(),
            threshold,
            "Frame difference statistics"
        );
        if !corrupt_frames.is_empty() {
            warn!(
                skipped = corrupt_frames.len(),
                frames = index,
                "Frames skipped as corrupt"
            );
        }
        info!(
            frames = index,
            altered = altered.len(),
            "Frame difference analysis complete"
        );

        Ok(FrameAnalysis {
            altered,
            corrupt_frames,
            frames_seen: index,
            pairs_scored: stats.count(),
            mean: stats.mean(),
            stddev: stats.stddev(),
            threshold,
        })
    }
}

impl Default for FrameDifferenceEngine {
    fn default() -> Self {
        Self::new(DetectionSettings::default())
    }
}

/// Mean absolute luma difference normalized to `[0, 1]`.
///
/// Symmetric and zero for identical frames. Frames of different geometry
/// cannot be compared pixel by pixel and score the maximum.
pub fn mean_absolute_difference(a: &LumaFrame, b: &LumaFrame) -> f64 {
    if !a.same_geometry(b) {
        return 1.0;
    }
    if a.pixels.is_empty() {
        return 0.0;
    }

    let total: u64 = a
        .pixels
        .iter()
        .zip(&b.pixels)
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();

    total as f64 / (a.pixels.len() as f64 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NoProgress;
    use std::collections::VecDeque;

    struct ScriptedSource {
        events: VecDeque<VidGuardResult<FrameEvent>>,
    }

    impl ScriptedSource {
        fn new(events: Vec<VidGuardResult<FrameEvent>>) -> Self {
            Self {
                events: events.into(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_event(&mut self) -> VidGuardResult<Option<FrameEvent>> {
            self.events.pop_front().transpose()
        }
    }

    fn gray(value: u8) -> VidGuardResult<FrameEvent> {
        Ok(FrameEvent::Frame(LumaFrame::filled(8, 8, value)))
    }

    #[test]
    fn test_difference_of_identical_frames_is_zero() {
        let frame = LumaFrame::filled(16, 9, 77);
        assert_eq!(mean_absolute_difference(&frame, &frame), 0.0);
    }

    #[test]
    fn test_difference_is_symmetric_and_bounded() {
        let black = LumaFrame::filled(4, 4, 0);
        let white = LumaFrame::filled(4, 4, 255);
        let mid = LumaFrame::filled(4, 4, 51);

        assert_eq!(mean_absolute_difference(&black, &white), 1.0);
        assert_eq!(
            mean_absolute_difference(&black, &mid),
            mean_absolute_difference(&mid, &black)
        );
        assert!((mean_absolute_difference(&black, &mid) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_mismatch_scores_maximum() {
        let a = LumaFrame::filled(4, 4, 10);
        let b = LumaFrame::filled(8, 2, 10);
        assert_eq!(mean_absolute_difference(&a, &b), 1.0);
    }

    #[test]
    fn test_empty_stream_yields_empty_analysis() {
        let mut source = ScriptedSource::new(vec![]);
        let analysis = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap();

        assert!(analysis.altered.is_empty());
        assert_eq!(analysis.frames_seen, 0);
        assert_eq!(analysis.pairs_scored, 0);
    }

    #[test]
    fn test_single_frame_yields_empty_analysis() {
        let mut source = ScriptedSource::new(vec![gray(128)]);
        let analysis = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap();

        assert!(analysis.altered.is_empty());
        assert_eq!(analysis.frames_seen, 1);
    }

    #[test]
    fn test_all_corrupt_is_not_fatal() {
        let events = (0..5)
            .map(|_| {
                Ok(FrameEvent::Corrupt {
                    reason: "invalid data".to_string(),
                })
            })
            .collect();
        let mut source = ScriptedSource::new(events);
        let analysis = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap();

        assert!(analysis.altered.is_empty());
        assert_eq!(analysis.corrupt_frames, vec![0, 1, 2, 3, 4]);
        assert_eq!(analysis.pairs_scored, 0);
    }

    #[test]
    fn test_corrupt_frame_excludes_both_neighbouring_pairs() {
        let mut source = ScriptedSource::new(vec![
            gray(10),
            gray(10),
            Ok(FrameEvent::Corrupt {
                reason: "bad slice".to_string(),
            }),
            gray(10),
            gray(10),
        ]);
        let analysis = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap();

        // Pairs (0,1) and (3,4) only
        assert_eq!(analysis.pairs_scored, 2);
        assert_eq!(analysis.corrupt_frames, vec![2]);
    }

    #[test]
    fn test_fatal_decode_error_propagates() {
        let mut source = ScriptedSource::new(vec![
            gray(10),
            Err(VidGuardError::decode("demuxer lost sync")),
            gray(10),
        ]);
        let err = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap_err();
        assert!(matches!(err, VidGuardError::DecodeError { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut source = ScriptedSource::new(vec![gray(1), gray(2)]);

        let err = FrameDifferenceEngine::default()
            .analyze(&mut source, &cancel, &NoProgress)
            .unwrap_err();
        assert!(matches!(err, VidGuardError::Cancelled));
    }

    #[test]
    fn test_threshold_statistics_are_reported() {
        let mut source = ScriptedSource::new(vec![gray(0), gray(0), gray(51), gray(51)]);
        let analysis = FrameDifferenceEngine::default()
            .analyze(&mut source, &CancelToken::new(), &NoProgress)
            .unwrap();

        assert_eq!(analysis.pairs_scored, 3);
        assert!((analysis.mean - 0.2 / 3.0).abs() < 1e-12);
        assert!(analysis.threshold > analysis.mean);
    }
}
