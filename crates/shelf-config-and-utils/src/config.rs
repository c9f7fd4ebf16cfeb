//! Configuration management for the account core.

use crate::{CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default HTTP request timeout for sign-in and profile fetches, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default cutoff for a DRM activation that never calls back, in seconds.
pub const DEFAULT_DRM_TIMEOUT_SECS: u64 = 25;

/// Policy for choosing an authentication scheme when a library declares
/// several and none has been selected before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiSchemePolicy {
    /// Leave the choice to the caller (UI must disambiguate).
    RequireExplicit,
    /// Fall back to the first scheme in document order.
    FirstListed,
}

impl Default for MultiSchemePolicy {
    fn default() -> Self {
        MultiSchemePolicy::RequireExplicit
    }
}

/// Main configuration for the account core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// DRM activation timeout in seconds.
    #[serde(default = "default_drm_timeout")]
    pub drm_timeout_secs: u64,
    /// How to resolve the authentication scheme for multi-scheme libraries.
    #[serde(default)]
    pub multi_scheme_policy: MultiSchemePolicy,
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_drm_timeout() -> u64 {
    DEFAULT_DRM_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            drm_timeout_secs: DEFAULT_DRM_TIMEOUT_SECS,
            multi_scheme_policy: MultiSchemePolicy::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("OPENSHELF_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(timeout) = std::env::var("OPENSHELF_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.request_timeout_secs = secs;
            }
        }
        if let Ok(timeout) = std::env::var("OPENSHELF_DRM_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.drm_timeout_secs = secs;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.drm_timeout_secs, DEFAULT_DRM_TIMEOUT_SECS);
        assert_eq!(
            config.multi_scheme_policy,
            MultiSchemePolicy::RequireExplicit
        );
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.log_level = "debug".to_string();
        config.multi_scheme_policy = MultiSchemePolicy::FirstListed;
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.log_level, "debug");
        assert_eq!(loaded.multi_scheme_policy, MultiSchemePolicy::FirstListed);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("nowhere"));

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(paths.config_file(), r#"{"log_level":"warn"}"#).unwrap();

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.drm_timeout_secs, DEFAULT_DRM_TIMEOUT_SECS);
    }
}
