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

//! Model backends: the capability that turns a prompt into raw model text.
//!
//! Two variants exist, a hosted OpenAI-compatible chat-completion API and a
//! locally served Ollama model. Both apply a request timeout and report every
//! failure as a [`RatingError`], so callers never need to know which one ran.

use crate::config::{HostedConfig, LocalConfig};
use crate::error::RatingError;
use crate::prompt::SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for model backends used to rate submissions
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send a prompt and return the model's raw reply
    async fn evaluate(&self, prompt: &str) -> Result<BackendReply, RatingError>;

    /// Backend identifier (e.g., "hosted", "local")
    fn name(&self) -> &str;

    /// Model requested from the backend
    fn model_name(&self) -> &str;
}

/// Raw reply from a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendReply {
    pub content: String,
    /// Model that actually answered, as reported by the backend
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Upper bound on how much of an error body is echoed into messages
const ERROR_BODY_LIMIT: usize = 300;

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        body.to_string()
    } else {
        let head: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{}...", head)
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, RatingError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Hosted chat-completion backend (OpenAI compatible)
pub struct HostedBackend {
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    client: reqwest::Client,
}

impl HostedBackend {
    pub fn new(config: &HostedConfig) -> Result<Self, RatingError> {
        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http_client(config.timeout_secs)?,
        })
    }

    fn credential(&self) -> Result<&str, RatingError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(RatingError::Auth(
                "no API key configured for the hosted backend (set OPENAI_API_KEY)".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ModelBackend for HostedBackend {
    async fn evaluate(&self, prompt: &str) -> Result<BackendReply, RatingError> {
        // Checked before any network I/O.
        let api_key = self.credential()?;

        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        debug!(model = %self.model, "Sending evaluation prompt to hosted backend");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Hosted backend rejected the credential");
            return Err(RatingError::Auth(format!(
                "hosted backend rejected the API key ({}): {}",
                status,
                truncate_body(&error_text)
            )));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Hosted backend returned an error status");
            return Err(RatingError::Upstream(format!(
                "hosted backend returned {}: {}",
                status,
                truncate_body(&error_text)
            )));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                RatingError::Upstream(
                    "hosted backend response is missing choices[0].message.content".to_string(),
                )
            })?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = usage_data.is_object().then(|| TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        });

        Ok(BackendReply {
            content,
            model: response_data["model"]
                .as_str()
                .unwrap_or(self.model.as_str())
                .to_string(),
            usage,
        })
    }

    fn name(&self) -> &str {
        "hosted"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Local inference server backend (Ollama chat API)
pub struct LocalBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LocalBackend {
    pub fn new(config: &LocalConfig) -> Result<Self, RatingError> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ModelBackend for LocalBackend {
    async fn evaluate(&self, prompt: &str) -> Result<BackendReply, RatingError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "stream": false
        });

        debug!(
            model = %self.model,
            base_url = %self.base_url,
            "Sending evaluation prompt to local backend"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Local backend returned an error status");
            return Err(RatingError::Upstream(format!(
                "local backend returned {}: {}",
                status,
                truncate_body(&error_text)
            )));
        }

        let json: serde_json::Value = response.json().await?;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                RatingError::Upstream(
                    "local backend response is missing message.content".to_string(),
                )
            })?
            .to_string();

        // Ollama reports prompt_eval_count/eval_count only when it evaluated tokens
        let usage = match (json["prompt_eval_count"].as_u64(), json["eval_count"].as_u64()) {
            (Some(input), Some(output)) => Some(TokenUsage {
                prompt_tokens: input as u32,
                completion_tokens: output as u32,
                total_tokens: (input + output) as u32,
            }),
            _ => None,
        };

        Ok(BackendReply {
            content,
            model: json["model"].as_str().unwrap_or(self.model.as_str()).to_string(),
            usage,
        })
    }

    fn name(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
