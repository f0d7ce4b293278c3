//! Observation Hook Contract
//!
//! The engine calls a [`StepHook`] synchronously from inside its execution
//! loop: `on_begin` once, `on_step` once per executed operation in program
//! order (before the operation runs), and `on_end` once when the run stops.
//! The hook is borrowed for the duration of a single `execute` call and never
//! outlives it.

use crate::{ExecutionError, OpCode, Word};
use std::collections::BTreeMap;

/// Machine state handed to the hook before an operation executes.
///
/// Borrowed views only; hooks that need to keep data must copy it.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// Program counter of the operation
    pub pc: u64,
    /// Operation about to execute
    pub op: OpCode,
    /// Gas remaining before the operation is charged
    pub gas: u64,
    /// Gas the operation will be charged, `None` if the engine cannot price it
    pub cost: Option<u64>,
    /// Call depth (1 for the outermost frame)
    pub depth: usize,
    /// Operand stack, bottom first (top of stack is the last element)
    pub stack: &'a [Word],
    /// Linear memory
    pub memory: &'a [u8],
    /// Return buffer of the last completed call
    pub return_data: &'a [u8],
    /// Storage slots written or read so far in this execution
    pub storage: &'a BTreeMap<Word, Word>,
}

/// Capability invoked by the engine for every executed operation.
pub trait StepHook {
    /// Called once before the first operation
    fn on_begin(&mut self) {}

    /// Called once per executed operation, in program order
    fn on_step(&mut self, step: &Step<'_>);

    /// Called once after the last operation
    fn on_end(&mut self, _gas_used: u64, _error: Option<&ExecutionError>) {}
}
