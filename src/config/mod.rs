use crate::catalog;
use crate::client::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, RequestParams};
use crate::core::error::MchatError;
use crate::providers::openrouter::{DEFAULT_APP_TITLE, DEFAULT_ENDPOINT, OpenRouterTransport};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

fn default_models() -> Vec<String> {
    catalog::default_selection()
}

fn default_app_title() -> String {
    DEFAULT_APP_TITLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_app_title")]
    pub app_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            models: default_models(),
            temperature: None,
            max_tokens: None,
            timeout_secs: None,
            app_title: default_app_title(),
            referer: None,
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn app_dir() -> PathBuf {
        Self::config_dir().join(".mchat")
    }

    pub fn config_path() -> PathBuf {
        Self::app_dir().join("config.yaml")
    }

    pub fn load() -> Result<Config, MchatError> {
        Self::load_from(&Self::config_path())
    }

    /// Read the config at `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Config, MchatError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| MchatError::Config(format!("Parse {}: {}", path.display(), e)))?;
            debug!(path = %path.display(), "config loaded");
            return Ok(config);
        }

        let config = Config::default();
        config.save_to(path)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), MchatError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), MchatError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    /// The environment variable wins over the stored key.
    pub fn credential(&self) -> Option<String> {
        Self::resolve_credential(env::var(API_KEY_ENV).ok(), self.api_key.clone())
    }

    fn resolve_credential(from_env: Option<String>, stored: Option<String>) -> Option<String> {
        [from_env, stored]
            .into_iter()
            .flatten()
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn request_params(&self) -> RequestParams {
        RequestParams {
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn transport(&self) -> OpenRouterTransport {
        OpenRouterTransport::with_endpoint(
            self.base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            self.referer.clone(),
            self.app_title.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert_eq!(config.models, catalog::default_selection());
    }

    #[test]
    fn saved_key_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        let config = Config {
            api_key: Some("sk-or-123".to_string()),
            temperature: Some(1.2),
            timeout_secs: Some(30),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
        let params = loaded.request_params();
        assert_eq!(params.temperature, 1.2);
        assert_eq!(params.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(params.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "models:\n  - openai/gpt-4o-mini\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.models, vec!["openai/gpt-4o-mini".to_string()]);
        assert_eq!(config.app_title, DEFAULT_APP_TITLE);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn broken_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "models: [unterminated").unwrap();

        assert!(matches!(Config::load_from(&path), Err(MchatError::Config(_))));
    }

    #[test]
    fn environment_key_takes_precedence() {
        let pick = Config::resolve_credential;
        assert_eq!(
            pick(Some("env".to_string()), Some("file".to_string())).as_deref(),
            Some("env")
        );
        assert_eq!(
            pick(Some("  ".to_string()), Some("file".to_string())).as_deref(),
            Some("file")
        );
        assert_eq!(pick(None, None), None);
    }
}
