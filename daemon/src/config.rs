//! Daemon configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Resolution tunables live in a nested `[params]` table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tsl_types::ResolutionParams;
use tsl_utils::LogFormat;

use crate::error::DaemonError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Seconds between deadline sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive, e.g. `"info"` or `"info,tsl_resolution=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub params: ResolutionParams,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tsl_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            sweep_interval_secs: default_sweep_interval_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            params: ResolutionParams::default(),
        }
    }
}

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, DaemonError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.map_size_mb == 0 {
            return Err(DaemonError::Config("map_size_mb must be positive".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(DaemonError::Config(
                "sweep_interval_secs must be positive".into(),
            ));
        }
        self.params.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./tsl_data"));
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.params, ResolutionParams::community_defaults());
        config.validate().unwrap();
    }

    #[test]
    fn params_table_overrides_selected_fields() {
        let config = DaemonConfig::from_toml_str(
            r#"
            sweep_interval_secs = 5
            log_format = "json"

            [params]
            min_votes_required = 3
            reward_day_utc_offset_secs = 3600
            "#,
        )
        .unwrap();
        assert_eq!(config.sweep_interval_secs, 5);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.params.min_votes_required, 3);
        assert_eq!(config.params.reward_day_utc_offset_secs, Some(3600));
        assert_eq!(config.params.approval_threshold, 0.70);
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut config = DaemonConfig::default();
        config.map_size_mb = 64;
        config.params.vote_reward = 2;
        let text = config.to_toml_string().unwrap();
        let back = DaemonConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.map_size_mb, 64);
        assert_eq!(back.params, config.params);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = DaemonConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));

        let mut config = DaemonConfig::default();
        config.params.rejection_threshold = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = DaemonConfig::from_toml_str("sweep_interval_secs = \"often\"").unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsl.toml");
        std::fs::write(&path, "map_size_mb = 16\n").unwrap();
        let config = DaemonConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.map_size_bytes(), 16 * 1024 * 1024);
    }
}
