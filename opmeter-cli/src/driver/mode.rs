//! Measurement modes

use super::ConfigError;
use std::fmt;
use std::str::FromStr;

/// What each sampling repetition measures and emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    /// Timed run, per-operation log and per-operation CSV
    #[default]
    All,
    /// Untimed run, one aggregate CSV row
    Total,
    /// Full state trace, trace CSV
    Trace,
}

impl MeasurementMode {
    /// Name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementMode::All => "all",
            MeasurementMode::Total => "total",
            MeasurementMode::Trace => "trace",
        }
    }
}

impl FromStr for MeasurementMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MeasurementMode::All),
            "total" => Ok(MeasurementMode::Total),
            "trace" => Ok(MeasurementMode::Trace),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_modes() {
        assert_eq!("all".parse::<MeasurementMode>().unwrap(), MeasurementMode::All);
        assert_eq!("total".parse::<MeasurementMode>().unwrap(), MeasurementMode::Total);
        assert_eq!("trace".parse::<MeasurementMode>().unwrap(), MeasurementMode::Trace);
    }

    #[test]
    fn test_mode_is_case_sensitive() {
        assert!(matches!(
            "ALL".parse::<MeasurementMode>(),
            Err(ConfigError::InvalidMode(m)) if m == "ALL"
        ));
        assert!("".parse::<MeasurementMode>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mode in [MeasurementMode::All, MeasurementMode::Total, MeasurementMode::Trace] {
            assert_eq!(mode.to_string().parse::<MeasurementMode>().unwrap(), mode);
        }
    }
}
