//! Configuration management for the CLI

use anyhow::{Context, Result};
use emtech_lib::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Plain,
}

/// CLI configuration
///
/// Sources, lowest precedence first: built-in defaults, the config file,
/// `EMTECH_*` environment variables. Command-line flags override all three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmtechConfig {
    /// Top terms reported per emergence label
    pub nterms: usize,
    /// Minimum occurrences a term needs in at least one quarter
    pub minimum_per_quarter: u64,
    /// Forecast horizon in quarters
    pub steps_ahead: usize,
    pub log_format: LogFormat,
    /// Concurrent evaluation cells (defaults to available parallelism)
    pub max_workers: Option<usize>,
    pub seed: u64,
}

impl EmtechConfig {
    /// Load from defaults, an optional config file, and the environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = EngineConfig::default();
        let mut builder = config::Config::builder()
            .set_default("nterms", 25_i64)?
            .set_default("minimum_per_quarter", 20_i64)?
            .set_default("steps_ahead", 5_i64)?
            .set_default("log_format", "json")?
            .set_default("seed", defaults.seed as i64)?;

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => match Self::default_path() {
                Some(path) => builder.add_source(config::File::from(path).required(false)),
                None => builder,
            },
        };

        builder
            .add_source(config::Environment::with_prefix("EMTECH").try_parsing(true))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// `~/.config/emtech/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("emtech").join("config.toml"))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            max_workers: self.max_workers.unwrap_or(defaults.max_workers),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "nterms = 7\nlog_format = \"plain\"\nmax_workers = 3").unwrap();

        let config = EmtechConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.nterms, 7);
        assert_eq!(config.log_format, LogFormat::Plain);
        assert_eq!(config.steps_ahead, 5);
        assert_eq!(config.minimum_per_quarter, 20);
        assert_eq!(config.engine_config().max_workers, 3);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EmtechConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
