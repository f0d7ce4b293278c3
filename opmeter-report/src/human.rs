//! Human-readable Output
//!
//! Per-repetition logs for the diagnostic stream.

use opmeter_core::Observation;
use std::time::Duration;

/// Format a duration with the largest unit that keeps it above 1
/// (`850ns`, `12.417µs`, `3.002ms`, `1.250s`)
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.3}µs", nanos as f64 / 1e3)
    } else if nanos < 1_000_000_000 {
        format!("{:.3}ms", nanos as f64 / 1e6)
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

/// Format one repetition: its duration followed by one line per observation
///
/// ```text
/// Run duration: 4.210µs
///      0      0 PUSH1             3 120ns
///      1      2 PUSH1             3 41ns
/// ```
pub fn format_run_log(duration: Duration, observations: &[Observation]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Run duration: {}\n", format_duration(duration)));

    for o in observations {
        output.push_str(&format!(
            "{:>6} {:>6} {:<14} {:>8} {}\n",
            o.index,
            o.pc,
            o.op.to_string(),
            o.cost,
            format_duration(Duration::from_nanos(o.elapsed_ns))
        ));
    }

    output
}
