//! Configuration management for catatkeu
//!
//! Settings come from an optional YAML file and are then overridden by
//! `CATATKEU_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Records API used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Auth API used when nothing else is configured
pub const DEFAULT_AUTH_API_URL: &str = "http://127.0.0.1:8081";

/// Upload API used when nothing else is configured
pub const DEFAULT_UPLOAD_API_URL: &str = "http://localhost:8080";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Deployment environment, selects which records API variable applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse an environment name, accepting common short forms.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    fn api_url_var(&self) -> &'static str {
        match self {
            Environment::Development => "CATATKEU_API_URL_DEV",
            Environment::Staging => "CATATKEU_API_URL_STAGING",
            Environment::Production => "CATATKEU_API_URL_PROD",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment
    pub environment: Environment,

    /// Records API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Auth API base URL (login and refresh)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_api_url: Option<String>,

    /// Upload API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_api_url: Option<String>,

    /// Request timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Where the remembered session is stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,
}

/// Endpoints after applying file, environment and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_url: String,
    pub auth_api_url: String,
    pub upload_api_url: String,
}

impl Config {
    /// Directory holding catatkeu's files
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".catatkeu"))
    }

    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.yaml"))
    }

    /// Load configuration from an explicit path or the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is
    /// an error. Environment overrides are applied in both cases.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_from(PathBuf::from(p))?,
            None => {
                let default = Self::default_path()?;
                if default.exists() {
                    Self::load_from(default)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Apply `CATATKEU_*` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(env) = var("CATATKEU_ENV") {
            self.environment = Environment::parse(&env);
        }

        // Environment-specific URL wins over the generic one
        if let Some(url) = var(self.environment.api_url_var()).or_else(|| var("CATATKEU_API_URL"))
        {
            self.api_url = Some(url);
        }

        if let Some(url) = var("CATATKEU_AUTH_API_URL") {
            self.auth_api_url = Some(url);
        }

        if let Some(url) = var("CATATKEU_UPLOAD_API_URL") {
            self.upload_api_url = Some(url);
        }

        if let Some(ms) = var("CATATKEU_API_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.timeout_ms = Some(ms);
        }

        if let Some(path) = var("CATATKEU_SESSION_PATH") {
            self.session_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Resolve every endpoint, falling back to the documented defaults.
    ///
    /// The auth service falls back to the upload service before its own
    /// default, since both usually live on the same host.
    pub fn endpoints(&self) -> Endpoints {
        let trim = |url: &str| url.trim_end_matches('/').to_string();

        Endpoints {
            api_url: trim(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)),
            auth_api_url: trim(
                self.auth_api_url
                    .as_deref()
                    .or(self.upload_api_url.as_deref())
                    .unwrap_or(DEFAULT_AUTH_API_URL),
            ),
            upload_api_url: trim(
                self.upload_api_url
                    .as_deref()
                    .unwrap_or(DEFAULT_UPLOAD_API_URL),
            ),
        }
    }

    /// Request timeout to use
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Where the remembered session lives
    pub fn session_path(&self) -> Result<PathBuf> {
        match &self.session_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("session.yaml")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let endpoints = Config::default().endpoints();
        assert_eq!(endpoints.api_url, DEFAULT_API_URL);
        assert_eq!(endpoints.auth_api_url, DEFAULT_AUTH_API_URL);
        assert_eq!(endpoints.upload_api_url, DEFAULT_UPLOAD_API_URL);
        assert_eq!(Config::default().timeout().as_millis(), 15_000);
    }

    #[test]
    fn test_environment_specific_url_wins() {
        let config = Config::default().with_env_overrides(env(&[
            ("CATATKEU_ENV", "prod"),
            ("CATATKEU_API_URL_PROD", "https://api.example.com/"),
            ("CATATKEU_API_URL", "https://generic.example.com"),
        ]));

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.endpoints().api_url, "https://api.example.com");
    }

    #[test]
    fn test_other_environment_url_is_ignored() {
        let config = Config::default().with_env_overrides(env(&[
            ("CATATKEU_API_URL_PROD", "https://api.example.com"),
            ("CATATKEU_API_URL", "https://generic.example.com"),
        ]));

        assert_eq!(config.endpoints().api_url, "https://generic.example.com");
    }

    #[test]
    fn test_auth_falls_back_to_upload_url() {
        let config = Config::default()
            .with_env_overrides(env(&[("CATATKEU_UPLOAD_API_URL", "http://uploads:9000")]));

        let endpoints = config.endpoints();
        assert_eq!(endpoints.auth_api_url, "http://uploads:9000");
        assert_eq!(endpoints.upload_api_url, "http://uploads:9000");
    }

    #[test]
    fn test_blank_and_invalid_values_are_ignored() {
        let config = Config::default().with_env_overrides(env(&[
            ("CATATKEU_AUTH_API_URL", "  "),
            ("CATATKEU_API_TIMEOUT", "soon"),
        ]));

        assert!(config.auth_api_url.is_none());
        assert!(config.timeout_ms.is_none());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("staging"), Environment::Staging);
        assert_eq!(Environment::parse("STAGE"), Environment::Staging);
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("anything"), Environment::Development);
    }

    #[test]
    fn test_load_from_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config {
            api_url: Some("http://records:8080".to_string()),
            timeout_ms: Some(5_000),
            ..Default::default()
        };
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.api_url.as_deref(), Some("http://records:8080"));
        assert_eq!(loaded.timeout_ms, Some(5_000));
        assert_eq!(loaded.environment, Environment::Development);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
