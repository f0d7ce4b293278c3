//! Program generators
//!
//! - [`generate`]: straight-line arithmetic programs sized by a gas budget
//! - [`generate_validation`]: programs mixing the whole operation selection,
//!   optionally biased toward one dominant opcode
//!
//! Both are reproducible from a seed and print one hex program per line, or a
//! CSV with a `program_id` column.

mod arithmetic;
mod validation;

pub use arithmetic::{GeneratedProgram, generate, generate_arithmetic, write_programs};
pub use validation::{
    DEFAULT_OPS_LIMIT, Dominant, ValidationOptions, ValidationProgram, generate_validation,
    write_validation_programs,
};

use opmeter_core::OpCode;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

/// Invalid generator options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("push size must be between 1 and 32, got {0}")]
    PushSize(usize),

    #[error("unknown or unsupported dominant opcode: {0}")]
    UnknownOpcode(String),

    #[error("{0} takes memory offsets and needs --clean-stack")]
    NeedsCleanStack(OpCode),
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
