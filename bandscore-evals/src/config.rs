// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Backend configuration, loaded once at start-up and passed to constructors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub hosted: HostedConfig,
    #[serde(default)]
    pub local: LocalConfig,
}

/// Hosted chat-completion API (OpenAI compatible)
#[derive(Clone, Deserialize, Serialize)]
pub struct HostedConfig {
    /// API key; evaluation fails with an auth error when absent
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_hosted_base_url")]
    pub base_url: String,

    #[serde(default = "default_hosted_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_hosted_timeout")]
    pub timeout_secs: u64,
}

// Keeps the key out of logs.
impl std::fmt::Debug for HostedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_hosted_base_url(),
            model: default_hosted_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_hosted_timeout(),
        }
    }
}

impl HostedConfig {
    /// Whether a non-blank credential is configured
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Locally served model (Ollama)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    #[serde(default = "default_local_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_local_timeout")]
    pub timeout_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_local_model(),
            timeout_secs: default_local_timeout(),
        }
    }
}

// Default values
fn default_hosted_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_hosted_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    500
}

fn default_hosted_timeout() -> u64 {
    60
}

fn default_local_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_local_model() -> String {
    "llama3.2".to_string()
}

fn default_local_timeout() -> u64 {
    120
}

impl BackendConfig {
    /// Defaults overlaid with environment variables
    ///
    /// Supported environment variables:
    /// - OPENAI_API_KEY: hosted backend credential
    /// - OPENAI_BASE_URL: hosted API base URL (default: https://api.openai.com/v1)
    /// - OPENAI_MODEL: hosted model name (default: gpt-4)
    /// - OLLAMA_BASE_URL: local server base URL (default: http://localhost:11434)
    /// - OLLAMA_MODEL: local model name (default: llama3.2)
    /// - BANDSCORE_LLM_TIMEOUT: timeout in seconds applied to both backends
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Override fields whose environment variable is set
    pub fn merge_env(mut self) -> Self {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.hosted.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.hosted.base_url = url;
        }

        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.hosted.model = model;
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.local.base_url = url;
        }

        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            self.local.model = model;
        }

        if let Ok(timeout) = std::env::var("BANDSCORE_LLM_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                self.hosted.timeout_secs = val;
                self.local.timeout_secs = val;
            }
        }

        self
    }

    /// Longest backend timeout, used to size the outer HTTP timeout
    pub fn max_timeout_secs(&self) -> u64 {
        self.hosted.timeout_secs.max(self.local.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.hosted.model, "gpt-4");
        assert_eq!(config.hosted.temperature, 0.2);
        assert_eq!(config.local.base_url, "http://localhost:11434");
        assert!(!config.hosted.has_credential());
        assert_eq!(config.max_timeout_secs(), 120);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BackendConfig = from_json(
            r#"{"hosted": {"api_key": "sk-test", "model": "gpt-4o-mini"}}"#,
        );
        assert!(config.hosted.has_credential());
        assert_eq!(config.hosted.model, "gpt-4o-mini");
        assert_eq!(config.hosted.max_tokens, 500);
        assert_eq!(config.local.model, "llama3.2");
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let config = HostedConfig {
            api_key: Some("   ".to_string()),
            ..HostedConfig::default()
        };
        assert!(!config.has_credential());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = HostedConfig {
            api_key: Some("sk-secret".to_string()),
            ..HostedConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    fn from_json(json: &str) -> BackendConfig {
        serde_json::from_str(json).unwrap()
    }
}
