#![warn(missing_docs)]
//! opmeter Core - Engine and Instrumentation Contract
//!
//! This crate defines what the harness needs from an execution engine and
//! what the engine may call back into:
//! - [`Engine`] with a per-run [`RunConfig`] carrying exactly one hook
//! - [`StepHook`], invoked once per executed operation
//! - [`InstrumentCollector`], the uniform-cost observation log
//! - [`TraceRecorder`], the full per-step state snapshot log
//! - A stopwatch, quiescence and CPU pinning helpers

mod collector;
mod engine;
mod error;
mod hook;
mod measure;
mod opcode;
mod program;
mod tracer;

pub use collector::{CollectorSummary, InstrumentCollector, Observation};
pub use engine::{
    Attachment, Engine, EnvConfig, Execution, RunConfig, RunConfigBuilder, word_from_tail,
};
pub use error::{ExecutionError, ProgramError};
pub use hook::{Step, StepHook};
pub use measure::{Timer, pin_to_cpu, quiesce};
pub use opcode::OpCode;
pub use program::Program;
pub use tracer::{TraceRecorder, TraceStep, TracerConfig};

/// 256-bit machine word used for stack values and storage
pub type Word = ruint::aliases::U256;
