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

use anyhow::Result;
use bandscore_evals::BackendConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Bandscore Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub llm: BackendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:8000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Upper bound on a whole rating request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            enable_cors: default_enable_cors(),
            cors_origins: vec![],
        }
    }
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    180
}

fn default_enable_cors() -> bool {
    true
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - BANDSCORE_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:8000)
    /// - BANDSCORE_REQUEST_TIMEOUT: Rating request timeout in seconds (default: 180)
    /// - BANDSCORE_ENABLE_CORS: Enable CORS (default: true)
    /// - plus the backend variables read by [`BackendConfig::merge_env`]
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        Ok(config.merge_with_env())
    }

    /// Override fields whose environment variable is set
    fn merge_with_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("BANDSCORE_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }

        if let Ok(timeout) = std::env::var("BANDSCORE_REQUEST_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                self.server.request_timeout_secs = val;
            }
        }

        if let Ok(cors) = std::env::var("BANDSCORE_ENABLE_CORS") {
            self.server.enable_cors = cors.parse().unwrap_or(true);
        }

        self.llm = self.llm.merge_env();
        self
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        // The outer deadline must leave room for the slowest backend.
        let backend_timeout = self.llm.max_timeout_secs();
        if self.server.request_timeout_secs < backend_timeout {
            anyhow::bail!(
                "request_timeout_secs ({}) is shorter than the backend timeout ({})",
                self.server.request_timeout_secs,
                backend_timeout
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8000");
        assert_eq!(config.llm.local.base_url, "http://localhost:11434");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_with_partial_sections() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            listen_addr = "0.0.0.0:9000"

            [llm.hosted]
            model = "gpt-4o-mini"
            timeout_secs = 30

            [llm.local]
            base_url = "http://gpu-box:11434"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 180);
        assert_eq!(config.llm.hosted.model, "gpt-4o-mini");
        assert_eq!(config.llm.hosted.timeout_secs, 30);
        assert_eq!(config.llm.local.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.local.model, "llama3.2");
    }

    #[test]
    fn test_validate_rejects_short_request_timeout() {
        let mut config = ServerConfig::default();
        config.server.request_timeout_secs = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let mut config = ServerConfig::default();
        config.server.listen_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("BANDSCORE_HTTP_ADDR", "0.0.0.0:8080");
        std::env::set_var("BANDSCORE_REQUEST_TIMEOUT", "240");

        let config = ServerConfig::from_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout_secs, 240);

        std::env::remove_var("BANDSCORE_HTTP_ADDR");
        std::env::remove_var("BANDSCORE_REQUEST_TIMEOUT");
    }
}
