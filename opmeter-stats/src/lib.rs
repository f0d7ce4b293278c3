#![warn(missing_docs)]
//! opmeter Statistics
//!
//! Summaries over the per-repetition durations the driver measures:
//! - Mean, median and sample standard deviation
//! - Extremes and tail percentiles from the raw samples

mod percentiles;
mod summary;

pub use percentiles::{Percentiles, compute_percentile, compute_percentiles};
pub use summary::{DurationStatistics, compute_duration_stats, compute_summary};
