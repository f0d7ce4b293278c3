//! Instrumentation Collector
//!
//! Cost-only hook. Every `on_step` does the same constant amount of work
//! (one clock read, one write closing the previous observation, one push),
//! so instrumentation overhead is uniform across operations and relative
//! costs stay comparable. Aggregation happens after the run, in
//! [`InstrumentCollector::summary`].

use crate::hook::{Step, StepHook};
use crate::{ExecutionError, OpCode};
use std::time::Instant;

/// One executed operation as seen by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Sequence index within the run (0-based)
    pub index: usize,
    /// Program counter
    pub pc: u64,
    /// Operation identifier
    pub op: OpCode,
    /// Engine-reported gas cost, 0 when the engine could not price it
    pub cost: u64,
    /// Wall time from this step to the next one (or to the end of the run)
    pub elapsed_ns: u64,
}

/// Aggregates exposed to the aggregate CSV encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorSummary {
    /// Number of recorded operations
    pub op_count: usize,
    /// Sum of operation costs
    pub total_cost: u64,
    /// Wall time between `on_begin` and `on_end`
    pub total_ns: u64,
}

/// Ordered per-run log of [`Observation`]s
#[derive(Debug, Default)]
pub struct InstrumentCollector {
    observations: Vec<Observation>,
    begin: Option<Instant>,
    last_mark: Option<Instant>,
    total_ns: u64,
}

impl InstrumentCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collector with room for `capacity` observations
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Drop every observation and timing mark
    pub fn reset(&mut self) {
        self.observations.clear();
        self.begin = None;
        self.last_mark = None;
        self.total_ns = 0;
    }

    /// Observations in program order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of recorded observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Aggregate the log
    pub fn summary(&self) -> CollectorSummary {
        CollectorSummary {
            op_count: self.observations.len(),
            total_cost: self.observations.iter().map(|o| o.cost).sum(),
            total_ns: self.total_ns,
        }
    }

    #[inline]
    fn close_previous(&mut self, now: Instant) {
        if let (Some(last), Some(prev)) = (self.last_mark, self.observations.last_mut()) {
            prev.elapsed_ns = now.duration_since(last).as_nanos() as u64;
        }
    }
}

impl StepHook for InstrumentCollector {
    fn on_begin(&mut self) {
        self.reset();
        self.begin = Some(Instant::now());
    }

    #[inline]
    fn on_step(&mut self, step: &Step<'_>) {
        let now = Instant::now();
        self.close_previous(now);
        self.last_mark = Some(now);

        self.observations.push(Observation {
            index: self.observations.len(),
            pc: step.pc,
            op: step.op,
            cost: step.cost.unwrap_or(0),
            elapsed_ns: 0,
        });
    }

    fn on_end(&mut self, _gas_used: u64, _error: Option<&ExecutionError>) {
        let now = Instant::now();
        self.close_previous(now);
        self.last_mark = None;
        self.total_ns = self
            .begin
            .map(|begin| now.duration_since(begin).as_nanos() as u64)
            .unwrap_or(0);
    }
}
