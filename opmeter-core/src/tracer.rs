//! Trace Recorder
//!
//! Snapshot hook: copies the machine state at every step. Much heavier than
//! [`InstrumentCollector`](crate::InstrumentCollector) (an allocation per
//! captured buffer per step), so it is never combined with timing.

use crate::hook::{Step, StepHook};
use crate::{ExecutionError, OpCode, Word};
use std::collections::BTreeMap;
use tracing::debug;

/// Capture toggles for [`TraceRecorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracerConfig {
    /// Include memory state per step
    pub enable_memory: bool,
    /// Omit stack capture
    pub disable_stack: bool,
    /// Omit storage capture
    pub disable_storage: bool,
    /// Include the return buffer per step
    pub enable_return_data: bool,
    /// Emit each captured step as a `debug` event
    pub debug: bool,
    /// Maximum number of steps retained, 0 = unlimited
    pub limit: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enable_memory: true,
            disable_stack: false,
            disable_storage: true,
            enable_return_data: true,
            debug: false,
            limit: 0,
        }
    }
}

/// Full machine snapshot for one executed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Sequence index within the run (0-based)
    pub index: usize,
    /// Program counter
    pub pc: u64,
    /// Operation identifier
    pub op: OpCode,
    /// Gas remaining before the operation
    pub gas: u64,
    /// Gas charged for the operation, 0 when unknown
    pub cost: u64,
    /// Call depth
    pub depth: usize,
    /// Stack depth at this step, recorded even when stack capture is off
    pub stack_depth: usize,
    /// Stack, bottom first. Empty when stack capture is disabled.
    pub stack: Vec<Word>,
    /// Memory copy, if enabled
    pub memory: Option<Vec<u8>>,
    /// Return buffer copy, if enabled
    pub return_data: Option<Vec<u8>>,
    /// Storage copy, if enabled
    pub storage: Option<BTreeMap<Word, Word>>,
}

/// Per-run log of [`TraceStep`]s
#[derive(Debug, Default)]
pub struct TraceRecorder {
    config: TracerConfig,
    steps: Vec<TraceStep>,
    seen: usize,
    gas_used: u64,
    error: Option<ExecutionError>,
}

impl TraceRecorder {
    /// Create a recorder with the given capture toggles
    pub fn new(config: TracerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Capture toggles in effect
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Captured steps in program order
    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// Number of operations the engine reported, including ones past `limit`
    pub fn steps_seen(&self) -> usize {
        self.seen
    }

    /// Gas consumed by the traced run
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Error the traced run stopped with, if any
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Drop everything captured so far
    pub fn reset(&mut self) {
        self.steps.clear();
        self.seen = 0;
        self.gas_used = 0;
        self.error = None;
    }
}

impl StepHook for TraceRecorder {
    fn on_begin(&mut self) {
        self.reset();
    }

    fn on_step(&mut self, step: &Step<'_>) {
        let index = self.seen;
        self.seen += 1;
        if self.config.limit != 0 && self.steps.len() >= self.config.limit {
            return;
        }

        let cfg = &self.config;
        let captured = TraceStep {
            index,
            pc: step.pc,
            op: step.op,
            gas: step.gas,
            cost: step.cost.unwrap_or(0),
            depth: step.depth,
            stack_depth: step.stack.len(),
            stack: if cfg.disable_stack {
                Vec::new()
            } else {
                step.stack.to_vec()
            },
            memory: cfg.enable_memory.then(|| step.memory.to_vec()),
            return_data: cfg.enable_return_data.then(|| step.return_data.to_vec()),
            storage: (!cfg.disable_storage).then(|| step.storage.clone()),
        };

        if cfg.debug {
            debug!(
                index,
                pc = captured.pc,
                op = %captured.op,
                gas = captured.gas,
                cost = captured.cost,
                stack_depth = captured.stack_depth,
                "trace step"
            );
        }

        self.steps.push(captured);
    }

    fn on_end(&mut self, gas_used: u64, error: Option<&ExecutionError>) {
        self.gas_used = gas_used;
        self.error = error.cloned();
    }
}
