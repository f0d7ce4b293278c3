#![warn(missing_docs)]
//! opmeter Report - Result Encoders
//!
//! Turns observation and trace logs into the process outputs:
//! - Human-readable per-run logs and the final summary (diagnostic stream)
//! - Aggregate, per-operation and trace CSV rows (standard output)

mod csv;
mod human;
mod summary;

pub use csv::{AGGREGATE_HEADER, CsvKind, CsvWriter, FULL_HEADER, TRACE_STACK_COLUMNS, trace_header};
pub use human::{format_duration, format_run_log};
pub use summary::{RunSummary, format_summary};
