//! Configuration Management
//!
//! Backend endpoints and bulk tuning, read from `config.yaml` and overridden
//! by `HASTILY_*` environment variables.

use crate::api::BulkOptions;
use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.yaml";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the backend API
    #[serde(default)]
    pub api: String,
    /// OAuth token endpoint; when set, every model call needs credentials
    #[serde(default)]
    pub login: Option<String>,
    /// User-listing endpoint used to check credentials
    #[serde(default)]
    pub verify: Option<String>,
    /// Cap on concurrent per-item units in bulk calls
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Per-item deadline for bulk calls, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Candidate config files, first existing one wins
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("hastily").join(CONFIG_FILE));
        }
        paths
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path)?,
            None => {
                tracing::debug!("No config file found, using environment only");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Option<Self> = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config.unwrap_or_default())
    }

    /// Apply `HASTILY_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api) = lookup("HASTILY_API") {
            self.api = api;
        }
        if let Some(login) = lookup("HASTILY_LOGIN") {
            self.login = Some(login).filter(|s| !s.is_empty());
        }
        if let Some(verify) = lookup("HASTILY_VERIFY") {
            self.verify = Some(verify).filter(|s| !s.is_empty());
        }
        if let Some(value) = lookup("HASTILY_CONCURRENCY") {
            let limit = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid HASTILY_CONCURRENCY '{}'", value))?;
            self.concurrency = Some(limit);
        }
        if let Some(value) = lookup("HASTILY_TIMEOUT") {
            let secs = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid HASTILY_TIMEOUT '{}'", value))?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Check that the API endpoint is present
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.trim().is_empty() {
            return Err(Error::Validation(
                "No API endpoint configured. Set `api` in config.yaml or HASTILY_API".into(),
            ));
        }
        Ok(())
    }

    /// Whether model calls need stored credentials
    pub fn requires_login(&self) -> bool {
        self.login.is_some()
    }

    /// Bulk tuning derived from the configuration
    pub fn bulk_options(&self) -> BulkOptions {
        let mut options = BulkOptions::new();
        if let Some(limit) = self.concurrency.filter(|n| *n > 0) {
            options = options.with_concurrency(limit);
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_load_from_yaml() {
        let path = std::env::temp_dir().join(format!("hastily-config-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "api: https://api.example.com\nlogin: https://auth.example.com/token\nconcurrency: 4\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.api, "https://api.example.com");
        assert_eq!(config.login.as_deref(), Some("https://auth.example.com/token"));
        assert_eq!(config.verify, None);
        assert_eq!(config.concurrency, Some(4));
        assert!(config.requires_login());
    }

    #[test]
    fn test_empty_file_is_default() {
        let path = std::env::temp_dir().join(format!("hastily-empty-{}.yaml", std::process::id()));
        std::fs::write(&path, "").unwrap();
        let config = Config::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = Config {
            api: "http://file".into(),
            concurrency: Some(2),
            ..Config::default()
        };
        config
            .apply_overrides(env(&[
                ("HASTILY_API", "http://env"),
                ("HASTILY_CONCURRENCY", "8"),
                ("HASTILY_TIMEOUT", "30"),
            ]))
            .unwrap();

        assert_eq!(config.api, "http://env");
        assert_eq!(config.concurrency, Some(8));
        assert_eq!(config.timeout_secs, Some(30));
        assert!(!config.requires_login());
    }

    #[test]
    fn test_invalid_numeric_override_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("HASTILY_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("HASTILY_CONCURRENCY"));
    }

    #[test]
    fn test_missing_api_fails_validation() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_bulk_options() {
        let config = Config {
            concurrency: Some(3),
            timeout_secs: Some(5),
            ..Config::default()
        };
        let options = config.bulk_options();
        assert_eq!(options.concurrency, Some(3));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert!(options.cancel.is_none());

        let unbounded = Config::default().bulk_options();
        assert_eq!(unbounded.concurrency, None);
        assert_eq!(unbounded.timeout, None);
    }
}
