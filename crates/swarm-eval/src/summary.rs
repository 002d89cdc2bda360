//! Population statistics.
//!
//! All spreads here divide by the sample count `n`, not `n - 1`. Confidence
//! half-widths use the normal approximation `1.96 * std / sqrt(n)`.

use serde::{Deserialize, Serialize};

/// z-score of a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Running statistics for a scalar sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance (σ²)
    pub variance: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Number of samples contributing to these stats
    pub sample_count: usize,
}

impl Default for SampleStats {
    fn default() -> Self {
        Self::empty()
    }
}

impl SampleStats {
    /// Create stats from a single value.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self {
            mean: value,
            variance: 0.0,
            min: value,
            max: value,
            sample_count: 1,
        }
    }

    /// Create empty stats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            variance: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sample_count: 0,
        }
    }

    /// Stats over every value of `samples`.
    #[must_use]
    pub fn from_samples<I: IntoIterator<Item = f64>>(samples: I) -> Self {
        samples
            .into_iter()
            .fold(Self::empty(), |acc, v| Self::merge(&acc, &Self::from_value(v)))
    }

    /// Merge two stats using weighted combination.
    ///
    /// Uses the parallel form of Welford's algorithm for the variance.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        if a.sample_count == 0 {
            return *b;
        }
        if b.sample_count == 0 {
            return *a;
        }

        #[allow(clippy::cast_precision_loss)]
        let (n_a, n_b) = (a.sample_count as f64, b.sample_count as f64);
        let n_total = n_a + n_b;

        let delta = b.mean - a.mean;
        let mean = a.mean + delta * (n_b / n_total);
        let variance =
            (a.variance * n_a + b.variance * n_b + delta * delta * n_a * n_b / n_total) / n_total;

        Self {
            mean,
            variance,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
            sample_count: a.sample_count + b.sample_count,
        }
    }

    /// Whether no samples were seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Population standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Half-width of the 95% confidence interval of the mean.
    #[must_use]
    pub fn ci95_half_width(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.sample_count as f64;
        Z_95 * self.std_dev() / n.sqrt()
    }
}

/// `{mean, std, max, min}` of per-step QP solve times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveTimeSummary {
    /// Mean solve time
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Slowest solve
    pub max: f64,
    /// Fastest solve
    pub min: f64,
}

impl SolveTimeSummary {
    /// Summarize stats, or `None` if there were no samples.
    #[must_use]
    pub fn from_stats(stats: &SampleStats) -> Option<Self> {
        (!stats.is_empty()).then(|| Self {
            mean: stats.mean,
            std: stats.std_dev(),
            max: stats.max,
            min: stats.min,
        })
    }
}

/// Mean and 95% confidence half-width of one metric across experiments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Sample mean
    pub mean: f64,
    /// `1.96 * std / sqrt(n)` with population std
    pub ci95: f64,
}

impl MetricSummary {
    /// Summarize samples, or `None` if there are none.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let stats = SampleStats::from_samples(samples.iter().copied());
        (!stats.is_empty()).then(|| Self {
            mean: stats.mean,
            ci95: stats.ci95_half_width(),
        })
    }
}
