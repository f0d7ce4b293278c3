//! Driver errors

use opmeter_core::ProgramError;
use thiserror::Error;

/// Invalid input detected before the engine is ever invoked
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Mode outside `all | total | trace`
    #[error("invalid measurement mode: {0} (expected all, total or trace)")]
    InvalidMode(String),

    /// Sample size of zero
    #[error("sample size must be at least 1")]
    ZeroSampleSize,

    /// Program text could not be decoded
    #[error("invalid program: {0}")]
    Program(#[from] ProgramError),
}

/// Failure of a measurement session
#[derive(Debug, Error)]
pub enum DriverError {
    /// Configuration rejected up front
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Output or diagnostic stream failed
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}
