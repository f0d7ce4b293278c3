//! Percentile Computation
//!
//! Percentiles over raw samples; nothing is discarded, slow repetitions are
//! exactly what the tail is meant to show.

/// Tail percentiles reported alongside the summary; the median lives on
/// [`DurationStatistics`](crate::DurationStatistics)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentiles {
    /// 99th percentile
    pub p99: f64,
}

/// Compute a single percentile from samples
///
/// Uses linear interpolation between nearest ranks.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    if samples.len() == 1 {
        return samples[0];
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let p = percentile.clamp(0.0, 100.0) / 100.0;

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
}

/// Compute the reported percentiles
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    Percentiles {
        p99: compute_percentile(samples, 99.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((compute_percentile(&samples, 50.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_interpolation() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        // rank 1.5 sits halfway between 2 and 3
        assert!((compute_percentile(&samples, 50.0) - 2.5).abs() < f64::EPSILON);
        assert!((compute_percentile(&samples, 100.0) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(compute_percentile(&[], 50.0), 0.0);
        assert_eq!(compute_percentile(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn test_tail_includes_slow_sample() {
        let mut samples: Vec<f64> = (0..99).map(|_| 10.0).collect();
        samples.push(1000.0);
        let p = compute_percentiles(&samples);
        assert_eq!(compute_percentile(&samples, 50.0), 10.0);
        assert!(p.p99 > 10.0);
    }
}
