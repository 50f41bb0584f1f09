// Domain rules - Running statistics and the altered-frame decision rule

use serde::{Deserialize, Serialize};

use crate::error::{VidGuardError, VidGuardResult};

/// Single-pass mean and variance accumulator (Welford's method).
///
/// Updates incrementally so no score history is needed for the statistics and
/// large sums of squares never cancel against each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the statistics
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta_after = value - self.mean;
        self.m2 += delta * delta_after;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of all observations, 0 when empty
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, 0 when empty
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Calibration parameters of the altered-frame decision rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Multiplier `k` in `mean + k * stddev`
    pub sensitivity: f64,
    /// Absolute score a pair must also exceed, in `[0, 1]`
    pub min_score: f64,
    /// Report only the first frame of a run of consecutive flagged frames
    pub collapse_adjacent: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1.5,
            min_score: 0.0,
            collapse_adjacent: true,
        }
    }
}

impl DetectionSettings {
    /// Validate settings
    pub fn validate(&self) -> VidGuardResult<()> {
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(VidGuardError::Config {
                message: format!(
                    "sensitivity must be a finite, non-negative number (got {})",
                    self.sensitivity
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(VidGuardError::Config {
                message: format!("min_score must lie in [0, 1] (got {})", self.min_score),
            });
        }
        Ok(())
    }
}

/// Threshold rule applied once all pair scores are known
#[derive(Debug, Clone)]
pub struct ThresholdRule {
    settings: DetectionSettings,
}

impl ThresholdRule {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    /// `mean + k * stddev` over the whole sequence
    pub fn threshold(&self, stats: &RunningStats) -> f64 {
        stats.mean() + self.settings.sensitivity * stats.stddev()
    }

    /// Strict comparison keeps a zero-motion sequence free of flags
    pub fn is_altered(&self, score: f64, threshold: f64) -> bool {
        score > threshold && score > self.settings.min_score
    }

    /// Select flagged indices from `(index, score)` pairs in ascending index order
    pub fn flag(&self, scores: &[(u64, f64)], threshold: f64) -> Vec<u64> {
        let flagged: Vec<u64> = scores
            .iter()
            .filter(|(_, score)| self.is_altered(*score, threshold))
            .map(|(index, _)| *index)
            .collect();

        if self.settings.collapse_adjacent {
            collapse_runs(&flagged)
        } else {
            flagged
        }
    }
}

/// Reduce each run of consecutive indices to its first element.
///
/// A substituted frame differs from both neighbours, so it raises the score of
/// its own pair and of the pair that follows it.
pub fn collapse_runs(sorted: &[u64]) -> Vec<u64> {
    let mut out: Vec<u64> = Vec::with_capacity(sorted.len());
    let mut previous: Option<u64> = None;
    for &index in sorted {
        let continues_run = previous.map_or(false, |p| p + 1 == index);
        if !continues_run {
            out.push(index);
        }
        previous = Some(index);
    }
    out
}
