//! Application configuration.
//!
//! # Responsibility
//! - Load tunables from an optional TOML file.
//! - Apply `FOYER_*` environment overrides on top of the file values.
//!
//! # Invariants
//! - A missing config file yields defaults; a malformed one is an error.
//! - `validate()` must pass before the config is handed to services.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "FOYER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "FOYER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FOYER_LOG_DIR";
pub const ENV_CACHE_TTL_SECS: &str = "FOYER_CACHE_TTL_SECS";

/// One day.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub fridge_shelf_days: u32,
    pub freezer_shelf_days: u32,
    /// Spent/limit ratio from which a budget category turns to warning.
    pub budget_warning_ratio: f64,
    pub expiry_warning_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("foyer.sqlite3"),
            log_level: default_log_level().to_string(),
            log_dir: None,
            cache_ttl_secs: 300,
            fridge_shelf_days: 3,
            freezer_shelf_days: 90,
            budget_warning_ratio: 0.8,
            expiry_warning_days: 3,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CACHE_TTL_SECS).contains(&self.cache_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_secs must be in 1..={MAX_CACHE_TTL_SECS}"
            )));
        }
        if self.fridge_shelf_days == 0 || self.freezer_shelf_days == 0 {
            return Err(ConfigError::Invalid("shelf lives must be > 0 days".into()));
        }
        if !(self.budget_warning_ratio > 0.0 && self.budget_warning_ratio <= 1.0) {
            return Err(ConfigError::Invalid(
                "budget_warning_ratio must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Applies overrides from a key lookup (normally the process environment).
    ///
    /// Unparseable numeric overrides are rejected rather than ignored.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR).filter(|v| !v.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_CACHE_TTL_SECS} must be an integer"))
            })?;
        }
        Ok(())
    }
}

/// Loads config from `path` (defaults when absent) and applies environment
/// overrides, then validates the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foyer.toml");
        std::fs::write(&path, "fridge_shelf_days = 4\ncache_ttl_secs = 10\n").unwrap();
        let config = read_config_file(&path).unwrap();
        assert_eq!(config.fridge_shelf_days, 4);
        assert_eq!(config.cache_ttl_secs, 10);
        assert_eq!(config.freezer_shelf_days, 90);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foyer.toml");
        std::fs::write(&path, "cache_ttl_secs = \"soon\"").unwrap();
        assert!(matches!(
            read_config_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/tmp/household.db"),
            (ENV_CACHE_TTL_SECS, "42"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/household.db"));
        assert_eq!(config.cache_ttl_secs, 42);
    }

    #[test]
    fn bad_numeric_override_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_CACHE_TTL_SECS).then(|| "abc".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL_SECS));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.budget_warning_ratio = 1.5;
        assert!(config.validate().is_err());
        config.budget_warning_ratio = 0.8;
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());
        config.cache_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
        config.cache_ttl_secs = MAX_CACHE_TTL_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_ttl_override_fails_validation() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| (key == ENV_CACHE_TTL_SECS).then(|| u64::MAX.to_string()))
            .unwrap();
        assert_eq!(config.cache_ttl_secs, u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_ttl_secs"));
    }
}
