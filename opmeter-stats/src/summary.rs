//! Summary Statistics
//!
//! Durations go in as [`Duration`]s and come out as nanoseconds in `f64`,
//! which is what the report layer formats.

use crate::percentiles::{Percentiles, compute_percentile, compute_percentiles};
use std::time::Duration;

/// Summary of a set of repetition durations, all values in nanoseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Fastest repetition
    pub min: f64,
    /// Slowest repetition
    pub max: f64,
    /// Tail percentiles
    pub percentiles: Percentiles,
    /// Number of samples summarized
    pub sample_count: usize,
}

/// Compute summary statistics over raw nanosecond samples
pub fn compute_summary(samples: &[f64]) -> DurationStatistics {
    if samples.is_empty() {
        return DurationStatistics::default();
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let median = compute_percentile(samples, 50.0);

    let std_dev = if samples.len() < 2 {
        0.0
    } else {
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
        variance.sqrt()
    };

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    DurationStatistics {
        mean,
        median,
        std_dev,
        min,
        max,
        percentiles: compute_percentiles(samples),
        sample_count: samples.len(),
    }
}

/// Compute summary statistics over measured durations
pub fn compute_duration_stats(durations: &[Duration]) -> DurationStatistics {
    let nanos: Vec<f64> = durations.iter().map(|d| d.as_nanos() as f64).collect();
    compute_summary(&nanos)
}
