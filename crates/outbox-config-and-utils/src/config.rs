//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default API base URL (can be overridden at compile time via REQUEST_OUTBOX_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("REQUEST_OUTBOX_API_URL") {
    Some(url) => url,
    None => "https://parroquia.of.ardor.link",
};

/// Default `user:password` credential (can be overridden at compile time via
/// REQUEST_OUTBOX_BASIC_AUTH).
pub const DEFAULT_BASIC_AUTH: &str = match option_env!("REQUEST_OUTBOX_BASIC_AUTH") {
    Some(auth) => auth,
    None => "parroquia:parroquia",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL the submission endpoints are appended to.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// `user:password` for Basic auth. `None` sends no credential.
    #[serde(default = "default_basic_auth")]
    pub basic_auth: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Queue storage directory. Defaults to `Paths::store_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_basic_auth() -> Option<String> {
    Some(DEFAULT_BASIC_AUTH.to_string())
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            basic_auth: default_basic_auth(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
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
        std::fs::create_dir_all(paths.base_dir())?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override fields from `REQUEST_OUTBOX_*` variables looked up by `lookup`.
    ///
    /// Unparsable timeouts are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("REQUEST_OUTBOX_LOG_LEVEL").and_then(non_empty) {
            self.log_level = level;
        }
        if let Some(url) = lookup("REQUEST_OUTBOX_API_URL").and_then(non_empty) {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup("REQUEST_OUTBOX_TIMEOUT_SECS")
            .and_then(non_empty)
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            self.request_timeout_secs = secs;
        }
    }

    /// Reject values that cannot work at all.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The API base URL, parsed.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// `Authorization` header value for the configured credential.
    pub fn authorization_header(&self) -> Option<String> {
        self.basic_auth
            .as_deref()
            .filter(|auth| !auth.is_empty())
            .map(|auth| format!("Basic {}", STANDARD.encode(auth)))
    }

    /// Queue storage directory, configured or default.
    pub fn resolve_store_dir(&self, paths: &Paths) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| paths.store_dir())
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.store_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_authorization_matches_deployment() {
        if DEFAULT_BASIC_AUTH == "parroquia:parroquia" {
            assert_eq!(
                Config::default().authorization_header().as_deref(),
                Some("Basic cGFycm9xdWlhOnBhcnJvcXVpYQ==")
            );
        }
    }

    #[test]
    fn authorization_absent_without_credential() {
        let mut config = Config::default();
        config.basic_auth = None;
        assert!(config.authorization_header().is_none());

        config.basic_auth = Some(String::new());
        assert!(config.authorization_header().is_none());
    }

    #[test]
    fn test_config_load_from_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            api_base_url: "https://api.example.test".to_string(),
            store_dir: Some(dir.path().join("elsewhere")),
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.resolve_store_dir(&paths), paths.store_dir());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), "{ nope").unwrap();

        assert!(matches!(Config::load(&paths), Err(CoreError::Json(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("REQUEST_OUTBOX_LOG_LEVEL", "trace"),
            ("REQUEST_OUTBOX_API_URL", "https://staging.example.test"),
            ("REQUEST_OUTBOX_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.api_base_url, "https://staging.example.test");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn blank_or_bad_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("REQUEST_OUTBOX_LOG_LEVEL", "  "),
            ("REQUEST_OUTBOX_TIMEOUT_SECS", "soon"),
        ]));

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };

        assert!(matches!(config.api_url(), Err(CoreError::InvalidUrl(_))));
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
