//! Final Run Summary

use crate::human::format_duration;
use opmeter_core::ExecutionError;
use opmeter_stats::DurationStatistics;
use std::time::Duration;

/// What the driver reports after the last repetition
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Identifier the program was supplied as
    pub program_id: String,
    /// Output of the warm-up execution
    pub warmup_output: Vec<u8>,
    /// Error of the warm-up execution
    pub warmup_error: Option<ExecutionError>,
    /// Wall time spanning every sampling repetition
    pub sample_duration: Duration,
    /// Number of sampling repetitions
    pub sample_count: usize,
    /// Statistics over the timed `execute` calls (`all` mode only)
    pub run_durations: Option<DurationStatistics>,
}

fn nanos(value: f64) -> String {
    format_duration(Duration::from_nanos(value.max(0.0).round() as u64))
}

/// Format the summary for the diagnostic stream
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();

    if let Some(err) = &summary.warmup_error {
        output.push_str(&format!("Warm-up error: {}\n", err));
    }
    output.push_str(&format!("Program: {}\n", summary.program_id));
    output.push_str(&format!("Return: 0x{}\n", hex::encode(&summary.warmup_output)));
    output.push_str(&format!(
        "Sample duration: {} ({} runs)\n",
        format_duration(summary.sample_duration),
        summary.sample_count
    ));

    if let Some(stats) = &summary.run_durations {
        output.push_str(&format!(
            "Run durations: mean {}  median {}  stddev {}\n",
            nanos(stats.mean),
            nanos(stats.median),
            nanos(stats.std_dev)
        ));
        output.push_str(&format!(
            "               min {}  max {}  p99 {}\n",
            nanos(stats.min),
            nanos(stats.max),
            nanos(stats.percentiles.p99)
        ));
    }

    output
}
