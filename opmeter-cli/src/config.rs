//! Configuration loading from opmeter.toml
//!
//! Measurement defaults can live in an `opmeter.toml` file. The file is
//! discovered by walking up from the current directory, or named explicitly
//! with `--config`. Command-line flags override whatever the file sets.

use anyhow::Context;
use opmeter_core::EnvConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for by [`OpmeterConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "opmeter.toml";

/// opmeter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OpmeterConfig {
    /// Measurement protocol settings
    #[serde(default)]
    pub measure: MeasureConfig,
    /// Execution environment handed to the engine
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Measurement protocol settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasureConfig {
    /// Number of measured repetitions after the warm-up
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Measurement mode: "all", "total" or "trace"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Print the per-run human-readable log in `all` mode
    #[serde(default = "default_print_each")]
    pub print_each: bool,
    /// Write CSV rows to standard output
    #[serde(default)]
    pub print_csv: bool,
    /// Precede CSV output with a header line
    #[serde(default)]
    pub csv_header: bool,
    /// Pin the measuring thread to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            mode: default_mode(),
            print_each: default_print_each(),
            print_csv: false,
            csv_header: false,
            pin_cpu: None,
        }
    }
}

fn default_sample_size() -> usize {
    1
}
fn default_mode() -> String {
    "all".to_string()
}
fn default_print_each() -> bool {
    true
}

/// Execution environment overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Chain identifier
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Block number
    #[serde(default)]
    pub block_number: u64,
    /// Gas price
    #[serde(default)]
    pub gas_price: u64,
    /// Gas limit (unlimited when absent)
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Block timestamp in seconds (current time when absent)
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            block_number: 0,
            gas_price: 0,
            gas_limit: None,
            timestamp: None,
        }
    }
}

fn default_chain_id() -> u64 {
    1
}

impl EngineConfig {
    /// Build the engine environment from these settings
    pub fn to_env(&self) -> EnvConfig {
        let mut env = EnvConfig {
            chain_id: self.chain_id,
            block_number: self.block_number,
            gas_price: self.gas_price,
            ..EnvConfig::default()
        };
        if let Some(gas_limit) = self.gas_limit {
            env.gas_limit = gas_limit;
        }
        if let Some(timestamp) = self.timestamp {
            env.timestamp = timestamp;
        }
        env
    }
}

impl OpmeterConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))?;
        Ok(config)
    }

    /// Find the nearest `opmeter.toml` walking up from the current directory
    pub fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration; `Ok(None)` when no file exists.
    ///
    /// A file that exists but does not parse is an error.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        match Self::find() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# opmeter configuration

[measure]
# Measured repetitions after the warm-up run
sample_size = 1
# Measurement mode: all, total or trace
mode = "all"
# Print per-run duration and operation log to stderr (all mode)
print_each = true
# Write CSV rows to stdout
print_csv = false
# Write a header line before the first CSV row
csv_header = false
# Pin the measuring thread to a CPU (uncomment to enable)
# pin_cpu = 0

[engine]
chain_id = 1
block_number = 0
gas_price = 0
# Gas limit (default: unlimited)
# gas_limit = 30000000
# Block timestamp in seconds (default: now)
# timestamp = 0
"#
        .to_string()
    }
}
