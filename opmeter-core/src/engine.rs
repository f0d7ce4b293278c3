//! Execution Engine Contract
//!
//! The harness drives any interpreter implementing [`Engine`]. Each call
//! receives a [`RunConfig`] built fresh for that call, carrying the execution
//! environment and exactly one attached hook:
//!
//! ```text
//! RunConfig::builder(env)
//!     ├── .instrumented(&mut InstrumentCollector)  → debug off
//!     └── .traced(&mut TraceRecorder)              → debug on
//! ```
//!
//! There is no way to build a `RunConfig` with zero or two hooks.

use crate::collector::InstrumentCollector;
use crate::hook::StepHook;
use crate::tracer::TraceRecorder;
use crate::{ExecutionError, Word};

/// Chain and block parameters visible to the executed program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Chain identifier (`CHAINID`)
    pub chain_id: u64,
    /// Gas available to the execution (`GASLIMIT`)
    pub gas_limit: u64,
    /// Gas price (`GASPRICE`)
    pub gas_price: u64,
    /// Value sent with the call (`CALLVALUE`)
    pub value: Word,
    /// Block number (`NUMBER`)
    pub block_number: u64,
    /// Block timestamp in seconds (`TIMESTAMP`)
    pub timestamp: u64,
    /// Block difficulty (`DIFFICULTY`)
    pub difficulty: Word,
    /// Block beneficiary (`COINBASE`)
    pub coinbase: Word,
    /// Executing account (`ADDRESS`)
    pub address: Word,
    /// Transaction origin (`ORIGIN`)
    pub origin: Word,
    /// Immediate caller (`CALLER`)
    pub caller: Word,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            gas_limit: u64::MAX,
            gas_price: 0,
            value: Word::ZERO,
            block_number: 0,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            difficulty: Word::ZERO,
            coinbase: Word::ZERO,
            address: word_from_tail(b"contract"),
            origin: Word::ZERO,
            caller: Word::ZERO,
        }
    }
}

/// Right-align `bytes` into a word (last 32 bytes win)
pub fn word_from_tail(bytes: &[u8]) -> Word {
    let mut buf = [0u8; 32];
    let take = bytes.len().min(32);
    buf[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    Word::from_be_bytes(buf)
}

/// The hook attached to a single run
pub enum Attachment<'h> {
    /// Cost-only instrumentation
    Instrumenter(&'h mut InstrumentCollector),
    /// Full state tracing
    Tracer(&'h mut TraceRecorder),
}

/// Configuration for one `execute` call
pub struct RunConfig<'h> {
    /// Execution environment
    pub env: EnvConfig,
    attachment: Attachment<'h>,
}

impl<'h> RunConfig<'h> {
    /// Start building a configuration for one run
    pub fn builder(env: EnvConfig) -> RunConfigBuilder {
        RunConfigBuilder { env }
    }

    /// Whether the run is traced (engine debug mode)
    pub fn is_tracing(&self) -> bool {
        matches!(self.attachment, Attachment::Tracer(_))
    }

    /// The attached hook
    pub fn attachment(&self) -> &Attachment<'h> {
        &self.attachment
    }

    /// The attached hook as the capability the engine calls
    pub fn hook(&mut self) -> &mut dyn StepHook {
        match &mut self.attachment {
            Attachment::Instrumenter(collector) => &mut **collector,
            Attachment::Tracer(recorder) => &mut **recorder,
        }
    }
}

/// Builder step between runs; consumed by attaching exactly one hook
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    env: EnvConfig,
}

impl RunConfigBuilder {
    /// Replace the gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.env.gas_limit = gas_limit;
        self
    }

    /// Attach a cost collector
    pub fn instrumented(self, collector: &mut InstrumentCollector) -> RunConfig<'_> {
        RunConfig {
            env: self.env,
            attachment: Attachment::Instrumenter(collector),
        }
    }

    /// Attach a trace recorder and enable tracing
    pub fn traced(self, recorder: &mut TraceRecorder) -> RunConfig<'_> {
        RunConfig {
            env: self.env,
            attachment: Attachment::Tracer(recorder),
        }
    }
}

/// Outcome of one `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Return (or revert) data
    pub output: Vec<u8>,
    /// Gas left unused
    pub gas_left: u64,
    /// Set when the run stopped abnormally
    pub error: Option<ExecutionError>,
}

impl Execution {
    /// Whether the run completed without error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A bytecode interpreter the harness can measure
pub trait Engine {
    /// Run `program` to completion, reporting each step to `config`'s hook.
    ///
    /// Must call the hook synchronously and must not retain it.
    fn execute(&self, program: &[u8], input: Option<&[u8]>, config: &mut RunConfig<'_>)
        -> Execution;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn execute(
        &self,
        program: &[u8],
        input: Option<&[u8]>,
        config: &mut RunConfig<'_>,
    ) -> Execution {
        (**self).execute(program, input, config)
    }
}
