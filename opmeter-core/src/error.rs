//! Error types shared by engines and the harness

use crate::OpCode;
use thiserror::Error;

/// Why a single execution stopped abnormally.
///
/// Returned by the engine inside [`Execution`](crate::Execution); local to the
/// run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("out of gas")]
    OutOfGas,

    #[error("stack underflow ({len} <=> {required})")]
    StackUnderflow { len: usize, required: usize },

    #[error("stack limit reached {len} ({limit})")]
    StackOverflow { len: usize, limit: usize },

    #[error("invalid opcode: {0}")]
    InvalidOpcode(OpCode),

    #[error("invalid jump destination")]
    InvalidJump,

    #[error("execution reverted")]
    Reverted,

    #[error("memory limit exceeded: {requested} bytes (max {limit})")]
    MemoryLimit { requested: u64, limit: u64 },

    #[error("engine failure: {0}")]
    Engine(String),
}

/// Errors decoding a program from its textual form
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,

    #[error("invalid hex program: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
