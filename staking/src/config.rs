//! Staking configuration with TOML file support.

use lsm_types::Params;
use lsm_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::StakingError;

/// Startup configuration: logging and the initial module params.
///
/// Can be loaded from a TOML file via [`StakingConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub params: Params,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StakingConfig {
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, StakingError> {
        let content = std::fs::read_to_string(path).map_err(|e| StakingError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration.
    pub fn from_toml_str(s: &str) -> Result<Self, StakingError> {
        let config: Self = toml::from_str(s).map_err(|e| StakingError::Config(e.to_string()))?;
        config.params.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, StakingError> {
        toml::to_string_pretty(self).map_err(|e| StakingError::Config(e.to_string()))
    }

    /// Install the global tracing subscriber described by this config.
    /// Returns `false` if one was already installed.
    pub fn init_tracing(&self) -> bool {
        lsm_utils::init_tracing(&self.log_level, self.log_format)
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            params: Params::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsm_types::Dec;
    use std::io::Write;

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = StakingConfig::default();
        let parsed = StakingConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = StakingConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.params, Params::default());
    }

    #[test]
    fn test_partial_params_override() {
        let toml = r#"
            log_format = "json"

            [params]
            epoch_interval = 5
            global_liquid_staking_cap = "0.25"
        "#;
        let config = StakingConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.params.epoch_interval, 5);
        assert_eq!(config.params.global_liquid_staking_cap, Dec::percent(25));
        assert_eq!(config.params.bond_denom, "stake");
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let toml = r#"
            [params]
            epoch_interval = 0
        "#;
        assert!(matches!(
            StakingConfig::from_toml_str(toml),
            Err(StakingError::Types(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug,lsm_staking=trace\"").unwrap();
        let config = StakingConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug,lsm_staking=trace");

        assert!(matches!(
            StakingConfig::from_toml_file("/nonexistent/lsm.toml"),
            Err(StakingError::Config(_))
        ));
    }
}
