#![warn(missing_docs)]
//! opmeter VM - Reference Execution Engine
//!
//! A compact interpreter for the EVM-style opcode subset the measurement
//! programs use. It exists so the harness has something to measure out of
//! the box; any other [`opmeter_core::Engine`] plugs in the same way.
//!
//! Execution is single-frame: no calls, no account state, storage lives for
//! one `execute` call only.

mod alu;
pub mod gas;
mod interpreter;
pub mod memory;
pub mod stack;

pub use interpreter::Vm;
pub use memory::MEMORY_LIMIT;
pub use stack::STACK_LIMIT;
