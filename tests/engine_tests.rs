//! Frame difference engine tests over synthetic frame sequences

use std::collections::VecDeque;

use vidguard::engine::difference::FrameDifferenceEngine;
use vidguard::engine::progress::{AnalysisStage, CancelToken, NoProgress, ProgressCallback};
use vidguard::ports::{FrameEvent, FrameSource, LumaFrame};
use vidguard::{DetectionSettings, FrameAnalysis, VidGuardResult};

const WIDTH: u32 = 32;
const HEIGHT: u32 = 24;

// Test utilities

/// Deterministic pseudo-random bytes (xorshift64)
struct Noise(u64);

impl Noise {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn frame(&mut self) -> LumaFrame {
        let pixels = (0..WIDTH * HEIGHT).map(|_| (self.next() >> 24) as u8).collect();
        LumaFrame::new(WIDTH, HEIGHT, pixels).unwrap()
    }
}

/// Frame sequence built up front and replayed in order
struct SyntheticSource {
    events: VecDeque<FrameEvent>,
}

impl SyntheticSource {
    /// `len` frames of flat gray, with frames listed in `noise_at` replaced by noise
    fn static_with_noise(len: u64, noise_at: &[u64]) -> Self {
        let mut noise = Noise::new(0x5eed);
        let events = (0..len)
            .map(|i| {
                if noise_at.contains(&i) {
                    FrameEvent::Frame(noise.frame())
                } else {
                    FrameEvent::Frame(LumaFrame::filled(WIDTH, HEIGHT, 128))
                }
            })
            .collect();
        Self { events }
    }

    fn corrupt_at(mut self, index: usize) -> Self {
        self.events[index] = FrameEvent::Corrupt {
            reason: "invalid NAL unit".to_string(),
        };
        self
    }
}

impl FrameSource for SyntheticSource {
    fn next_event(&mut self) -> VidGuardResult<Option<FrameEvent>> {
        Ok(self.events.pop_front())
    }

    fn expected_frames(&self) -> Option<u64> {
        Some(self.events.len() as u64)
    }
}

fn run(source: &mut SyntheticSource) -> FrameAnalysis {
    FrameDifferenceEngine::default()
        .analyze(source, &CancelToken::new(), &NoProgress)
        .unwrap()
}

fn assert_well_formed(analysis: &FrameAnalysis, frame_count: u64) {
    let indices = analysis.altered.as_slice();
    assert!(indices.iter().all(|&i| i >= 1 && i < frame_count.max(1)));
    assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
}

// Scenarios

#[test]
fn test_single_substituted_frame_is_flagged() {
    let mut source = SyntheticSource::static_with_noise(10, &[5]);
    let analysis = run(&mut source);

    assert_eq!(analysis.altered.as_slice(), &[5]);
    assert_eq!(analysis.frames_seen, 10);
    assert_eq!(analysis.pairs_scored, 9);
}

#[test]
fn test_corrupt_frame_in_static_content_is_skipped() {
    let mut source = SyntheticSource::static_with_noise(10, &[]).corrupt_at(3);
    let analysis = run(&mut source);

    assert!(analysis.altered.is_empty());
    assert!(!analysis.altered.contains(3));
    assert_eq!(analysis.corrupt_frames, vec![3]);
    assert_eq!(analysis.frames_seen, 10);
}

#[test]
fn test_two_distant_edits_are_flagged() {
    let mut source = SyntheticSource::static_with_noise(300, &[10, 200]);
    let analysis = run(&mut source);

    assert_eq!(analysis.altered.as_slice(), &[10, 200]);
    assert_well_formed(&analysis, 300);
}

#[test]
fn test_without_collapse_both_transitions_are_reported() {
    let settings = DetectionSettings {
        collapse_adjacent: false,
        ..DetectionSettings::default()
    };
    let mut source = SyntheticSource::static_with_noise(10, &[5]);
    let analysis = FrameDifferenceEngine::new(settings)
        .analyze(&mut source, &CancelToken::new(), &NoProgress)
        .unwrap();

    assert_eq!(analysis.altered.as_slice(), &[5, 6]);
}

#[test]
fn test_min_score_suppresses_weak_transitions() {
    // A 2-level luma step scores 2/255, below the floor
    let mut events: VecDeque<FrameEvent> = (0..20)
        .map(|_| FrameEvent::Frame(LumaFrame::filled(WIDTH, HEIGHT, 100)))
        .collect();
    events[12] = FrameEvent::Frame(LumaFrame::filled(WIDTH, HEIGHT, 102));
    let mut source = SyntheticSource { events };

    let settings = DetectionSettings {
        min_score: 0.05,
        ..DetectionSettings::default()
    };
    let analysis = FrameDifferenceEngine::new(settings)
        .analyze(&mut source, &CancelToken::new(), &NoProgress)
        .unwrap();
    assert!(analysis.altered.is_empty());
}

// Properties

#[test]
fn test_short_sequences_never_flag() {
    for len in 0..=1 {
        let mut source = SyntheticSource::static_with_noise(len, &[0]);
        assert!(run(&mut source).altered.is_empty());
    }
}

#[test]
fn test_static_content_never_flags() {
    let mut source = SyntheticSource::static_with_noise(120, &[]);
    let analysis = run(&mut source);
    assert!(analysis.altered.is_empty());
    assert_eq!(analysis.threshold, 0.0);
}

#[test]
fn test_indices_stay_in_range_for_noisy_sequences() {
    let mut noise = Noise::new(42);
    for len in [2u64, 3, 17, 64] {
        let events = (0..len).map(|_| FrameEvent::Frame(noise.frame())).collect();
        let mut source = SyntheticSource { events };
        let analysis = run(&mut source);
        assert_well_formed(&analysis, len);
        assert!(!analysis.altered.contains(0));
    }
}

#[test]
fn test_analysis_is_repeatable() {
    let first = run(&mut SyntheticSource::static_with_noise(300, &[10, 200]));
    let second = run(&mut SyntheticSource::static_with_noise(300, &[10, 200]));
    assert_eq!(first, second);
}

#[derive(Default)]
struct CancelAfter {
    cancel: CancelToken,
    after: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, stage: AnalysisStage, completed: u64, _total: Option<u64>) {
        if stage == AnalysisStage::FrameAnalysis && completed >= self.after {
            self.cancel.cancel();
        }
    }
}

#[test]
fn test_cancellation_mid_stream_stops_analysis() {
    let progress = CancelAfter {
        cancel: CancelToken::new(),
        after: 50,
    };
    let mut source = SyntheticSource::static_with_noise(300, &[]);
    let result = FrameDifferenceEngine::default()
        .with_progress_interval(10)
        .analyze(&mut source, &progress.cancel, &progress);

    assert!(matches!(result, Err(vidguard::VidGuardError::Cancelled)));
    // The source was not drained
    assert!(source.events.len() > 200);
}
