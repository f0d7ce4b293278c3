#![warn(missing_docs)]
//! # opmeter
//!
//! Measures what each executed operation of a bytecode program costs.
//!
//! A program is run once to warm up and then `sample_size` more times under an
//! [`Engine`], with exactly one hook attached per run:
//! - **Instrumentation**: [`InstrumentCollector`] records `{index, pc, op, cost, elapsed}`
//!   for every step with uniform per-step overhead
//! - **Tracing**: [`TraceRecorder`] snapshots stack, memory and return data per step
//!
//! Results come out as aggregate CSV (`total`), per-operation CSV plus a
//! human-readable log (`all`) or fixed-width trace CSV (`trace`).
//!
//! ## Quick Start
//!
//! ```ignore
//! use opmeter::prelude::*;
//!
//! let program = Program::from_hex("6001600201")?;
//! let config = MeasureConfig { mode: "total".into(), print_csv: true, ..Default::default() };
//! measure(Vm::new(), &program, EnvConfig::default(), &config, std::io::stdout(), std::io::stderr())?;
//! ```

// Re-export core types
pub use opmeter_core::{
    Attachment, CollectorSummary, Engine, EnvConfig, Execution, ExecutionError,
    InstrumentCollector, Observation, OpCode, Program, ProgramError, RunConfig, RunConfigBuilder,
    Step, StepHook, TraceRecorder, TraceStep, TracerConfig, Word,
};

// Re-export the reference engine
pub use opmeter_vm::Vm;

// Re-export report and stats
pub use opmeter_report::{CsvWriter, RunSummary, TRACE_STACK_COLUMNS, format_duration};
pub use opmeter_stats::{DurationStatistics, compute_duration_stats};

// Re-export the driver
pub use opmeter_cli::{
    ConfigError, Driver, DriverError, MeasureConfig, MeasureSettings, MeasurementMode,
    OpmeterConfig, measure,
};

// Re-export the program generators
pub use opmeter_cli::{
    Dominant, GeneratedProgram, ValidationOptions, ValidationProgram, generate, generate_validation,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Engine, EnvConfig, MeasureConfig, MeasurementMode, Program, RunConfig, StepHook, Vm,
        measure,
    };
}

/// Run the opmeter CLI.
///
/// ```ignore
/// fn main() {
///     opmeter::run().unwrap();
/// }
/// ```
pub use opmeter_cli::run;
