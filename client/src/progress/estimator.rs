use crate::progress::format::format_eta;
use std::collections::VecDeque;
use std::time::Duration;

/// Constants of the ETA policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaTuning {
    /// Most recent instantaneous rates kept.
    pub window: usize,
    /// Rate samples needed before the window is trusted at all.
    pub min_samples: usize,
    /// `max / min` of the window at or above which rates count as bursty.
    pub variance_threshold: f64,
    /// Share of the recent mean rate in the blended rate.
    pub recent_weight: f64,
    /// Multiplier applied to every estimate.
    pub buffer: f64,
}

impl Default for EtaTuning {
    fn default() -> Self {
        EtaTuning {
            window: 5,
            min_samples: 3,
            variance_threshold: 2.0,
            recent_weight: 0.3,
            buffer: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtaStrategy {
    /// Elapsed time per processed paragraph.
    RunningAverage,
    /// Recent window mean mixed with the overall rate.
    Blended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eta {
    pub remaining: Duration,
    pub strategy: EtaStrategy,
}

impl Eta {
    pub fn label(&self) -> String {
        format_eta(self.remaining.as_secs_f64())
    }
}

/// Turns successive `(elapsed, processed, total)` observations of one job
/// into remaining-time estimates.
///
/// Workers publish progress in batches, so counts jump and then sit still.
/// Instantaneous rates are only taken when the count actually rises and are
/// measured against the time of the previous rise, not the poll interval.
/// When the recent rates disagree by `variance_threshold` or more the
/// estimator ignores them and uses the running average.
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    tuning: EtaTuning,
    rates: VecDeque<f64>,
    last_processed: usize,
    last_increase_at: Duration,
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(EtaTuning::default())
    }
}

impl ProgressEstimator {
    pub fn new(tuning: EtaTuning) -> Self {
        ProgressEstimator {
            tuning,
            rates: VecDeque::with_capacity(tuning.window),
            last_processed: 0,
            last_increase_at: Duration::ZERO,
        }
    }

    /// Instantaneous rates currently in the window, oldest first.
    pub fn rates(&self) -> &VecDeque<f64> {
        &self.rates
    }

    /// Records one poll. `elapsed` is the job's age: time since it was created.
    /// The first rate sample is measured from that origin.
    ///
    /// Returns `None` until at least one paragraph is done or while the total
    /// is unknown.
    pub fn observe(&mut self, elapsed: Duration, processed: usize, total: usize) -> Option<Eta> {
        if processed > self.last_processed {
            let delta = elapsed.saturating_sub(self.last_increase_at).as_secs_f64();
            if delta > 0.0 {
                let rate = (processed - self.last_processed) as f64 / delta;
                self.rates.push_back(rate);
                while self.rates.len() > self.tuning.window {
                    self.rates.pop_front();
                }
            }
            self.last_processed = processed;
            self.last_increase_at = elapsed;
        }

        if processed == 0 || total == 0 {
            return None;
        }

        let elapsed_secs = elapsed.as_secs_f64();
        let remaining = total.saturating_sub(processed) as f64;
        let running_average = remaining * (elapsed_secs / processed as f64);

        let (seconds, strategy) = match self.blended_rate(processed, elapsed_secs) {
            Some(rate) => (remaining / rate, EtaStrategy::Blended),
            None => (running_average, EtaStrategy::RunningAverage),
        };
        let remaining = Duration::try_from_secs_f64(seconds * self.tuning.buffer)
            .unwrap_or_default();
        Some(Eta {
            remaining,
            strategy,
        })
    }

    /// The blended rate, or `None` when the window is too small or too noisy.
    fn blended_rate(&self, processed: usize, elapsed_secs: f64) -> Option<f64> {
        if self.rates.len() < self.tuning.min_samples || elapsed_secs <= 0.0 {
            return None;
        }
        let max = self.rates.iter().copied().fold(f64::MIN, f64::max);
        let min = self.rates.iter().copied().fold(f64::MAX, f64::min);
        if min <= 0.0 || max / min >= self.tuning.variance_threshold {
            return None;
        }
        let mean = self.rates.iter().sum::<f64>() / self.rates.len() as f64;
        let overall = processed as f64 / elapsed_secs;
        Some(self.tuning.recent_weight * mean + (1.0 - self.tuning.recent_weight) * overall)
    }
}
