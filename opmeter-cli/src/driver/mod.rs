//! Measurement Driver
//!
//! Runs one program under an engine following the measurement protocol.
//!
//! ```text
//! MeasureConfig (file + flags)
//!       │  validate: mode, sample size        ← nothing has executed yet
//!       ▼
//! ┌─────────────┐
//! │   warm-up   │  one run, collector attached, observations discarded
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐
//! │  sampling   │  N runs: total | all | trace
//! └──────┬──────┘   each with a freshly built RunConfig and hook
//!        ▼
//! ┌─────────────┐
//! │  finalize   │  sample duration, warm-up result, statistics
//! └─────────────┘
//! ```
//!
//! CSV rows go to the output writer; everything else goes to the
//! diagnostic writer.

mod error;
mod execution;
mod mode;

pub use error::{ConfigError, DriverError};
pub use execution::{Driver, MeasureSettings, SampleResult, measure};
pub use mode::MeasurementMode;
