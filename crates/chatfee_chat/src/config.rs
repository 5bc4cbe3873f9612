//! Client configuration.
//!
//! Settings are read from `<workspace>/.chatfee/settings.json` when present,
//! then overridden by environment variables:
//!
//! | Variable              | Field            |
//! |-----------------------|------------------|
//! | `CHATFEE_ENDPOINT`    | `endpoint`       |
//! | `CHATFEE_DATA_DIR`    | `dataDir`        |
//! | `CHATFEE_PROVIDER`    | `provider`       |
//! | `CHATFEE_MODEL`       | `model`          |
//! | `CHATFEE_MAX_RETRIES` | `maxRetries`     |
//! | `OPENROUTER_API_KEY`  | (never stored)   |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::delivery::{DeliveryClient, HttpDelivery, RetryPolicy};
use crate::error::{ChatError, ChatResult};
use crate::llm::{CompletionDelivery, DEFAULT_MODEL};

/// Directory under the workspace root holding settings and session data
pub const CONFIG_DIR: &str = ".chatfee";

/// Where replies come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// The companion server's `/api/chat` route
    #[default]
    Server,
    /// An OpenRouter-compatible completion API, called directly
    OpenRouter,
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// ChatFee client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    /// Base URL of the chat server
    pub endpoint: String,
    /// Where sessions and preferences are stored; defaults to the config dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub provider: Provider,
    /// Completion model for the OpenRouter provider
    pub model: String,
    /// Optional override of the completion API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Attempts per delivery, including the first
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Read replies aloud when a synthesizer is available
    pub speak_replies: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000".to_string(),
            data_dir: None,
            provider: Provider::Server,
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            speak_replies: false,
        }
    }
}

impl ChatConfig {
    /// Path of the settings file for a workspace
    pub fn settings_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(CONFIG_DIR).join("settings.json")
    }

    /// Load settings for a workspace, then apply environment overrides.
    /// A missing or invalid settings file falls back to defaults.
    pub fn from_settings(workspace_root: &Path) -> Self {
        let settings_path = Self::settings_path(workspace_root);

        let mut config = if settings_path.exists() {
            match std::fs::read_to_string(&settings_path)
                .map_err(ChatError::from)
                .and_then(|content| Ok(serde_json::from_str::<ChatConfig>(&content)?))
            {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring settings at {}: {}", settings_path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        if config.data_dir.is_none() {
            config.data_dir = Some(workspace_root.join(CONFIG_DIR));
        }
        config.apply_env();
        config
    }

    /// Apply `CHATFEE_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Some(endpoint) = env_var("CHATFEE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(dir) = env_var("CHATFEE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(provider) = env_var("CHATFEE_PROVIDER") {
            match provider.parse() {
                Ok(provider) => self.provider = provider,
                Err(e) => warn!("Ignoring CHATFEE_PROVIDER: {}", e),
            }
        }
        if let Some(model) = env_var("CHATFEE_MODEL") {
            self.model = model;
        }
        if let Some(retries) = env_var("CHATFEE_MAX_RETRIES") {
            match retries.parse() {
                Ok(retries) => self.max_retries = retries,
                Err(_) => warn!("Ignoring CHATFEE_MAX_RETRIES: {}", retries),
            }
        }
    }

    /// Write settings back to the workspace
    pub fn save(&self, workspace_root: &Path) -> ChatResult<()> {
        let path = Self::settings_path(workspace_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Data directory, falling back to `./.chatfee`
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Build the delivery client for the configured provider
    pub fn build_delivery(&self) -> ChatResult<Arc<dyn DeliveryClient>> {
        match self.provider {
            Provider::Server => Ok(Arc::new(
                HttpDelivery::new(&self.endpoint).with_retry(self.retry_policy()),
            )),
            Provider::OpenRouter => {
                let api_key = env_var("OPENROUTER_API_KEY").ok_or_else(|| {
                    ChatError::ProviderNotConfigured("Set OPENROUTER_API_KEY".to_string())
                })?;
                let mut delivery = CompletionDelivery::new(api_key, Some(self.model.clone()))
                    .with_retry(self.retry_policy());
                if let Some(base) = &self.api_base {
                    delivery = delivery.with_base_url(base);
                }
                Ok(Arc::new(delivery))
            }
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings() {
        let temp = tempdir().unwrap();
        let config = ChatConfig::from_settings(temp.path());
        assert_eq!(config.data_dir(), temp.path().join(CONFIG_DIR));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.retry_policy().max_attempts, config.max_retries.max(1));
    }

    #[test]
    fn test_partial_settings_file() {
        let temp = tempdir().unwrap();
        let path = ChatConfig::settings_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"speakReplies": true, "retryBaseDelayMs": 10}"#).unwrap();

        let config = ChatConfig::from_settings(temp.path());
        assert!(config.speak_replies);
        assert_eq!(config.retry_base_delay_ms, 10);
        assert_eq!(config.retry_policy().base_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_invalid_settings_fall_back() {
        let temp = tempdir().unwrap();
        let path = ChatConfig::settings_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "provider = server").unwrap();

        let config = ChatConfig::from_settings(temp.path());
        assert!(!config.speak_replies);
    }

    #[test]
    fn test_save_round_trip() {
        let temp = tempdir().unwrap();
        let config = ChatConfig {
            speak_replies: true,
            max_retries: 5,
            data_dir: Some(temp.path().join("data")),
            ..ChatConfig::default()
        };
        config.save(temp.path()).unwrap();

        let content = std::fs::read_to_string(ChatConfig::settings_path(temp.path())).unwrap();
        let loaded: ChatConfig = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenRouter".parse::<Provider>().unwrap(), Provider::OpenRouter);
        assert_eq!("server".parse::<Provider>().unwrap(), Provider::Server);
        assert!("carrier-pigeon".parse::<Provider>().is_err());
    }

    #[test]
    fn test_server_delivery_builds() {
        let config = ChatConfig::default();
        assert!(config.build_delivery().is_ok());
    }
}
