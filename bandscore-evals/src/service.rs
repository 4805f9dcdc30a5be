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

//! Rating service: validate, pick a backend, prompt, parse.

use crate::backend::{HostedBackend, LocalBackend, ModelBackend, TokenUsage};
use crate::config::BackendConfig;
use crate::error::RatingError;
use crate::parser::parse_rating;
use crate::prompt::build_prompt;
use crate::rubric::{EvaluationRequest, ModelChoice, RatingResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Maximum characters of model output kept in the preview
const PREVIEW_CHARS: usize = 200;

/// Diagnostics reported alongside a rating when debugging is requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Backend variant that answered ("hosted" or "local")
    pub backend: String,
    pub model: String,
    pub word_count: usize,
    pub duration_ms: u64,
    pub usage: Option<TokenUsage>,
    pub response_preview: String,
    pub raw_output: String,
}

/// Rating plus the diagnostics of the call that produced it
#[derive(Debug, Clone)]
pub struct RatingOutcome {
    pub rating: RatingResult,
    pub diagnostics: Diagnostics,
}

/// Orchestrates prompt building, backend invocation and reply parsing.
///
/// Holds no mutable state; a single instance can serve concurrent callers.
pub struct RatingService {
    hosted: Arc<dyn ModelBackend>,
    local: Arc<dyn ModelBackend>,
}

impl RatingService {
    pub fn new(hosted: Arc<dyn ModelBackend>, local: Arc<dyn ModelBackend>) -> Self {
        Self { hosted, local }
    }

    /// Build both backends from configuration
    pub fn from_config(config: &BackendConfig) -> Result<Self, RatingError> {
        if !config.hosted.has_credential() {
            warn!("OPENAI_API_KEY not set, hosted backend requests will fail");
        }
        Ok(Self::new(
            Arc::new(HostedBackend::new(&config.hosted)?),
            Arc::new(LocalBackend::new(&config.local)?),
        ))
    }

    fn backend(&self, model: ModelChoice) -> &Arc<dyn ModelBackend> {
        match model {
            ModelChoice::Hosted => &self.hosted,
            ModelChoice::Local => &self.local,
        }
    }

    /// Rate one submission
    pub async fn rate(&self, request: &EvaluationRequest) -> Result<RatingResult, RatingError> {
        self.rate_with_diagnostics(request)
            .await
            .map(|outcome| outcome.rating)
    }

    /// Rate one submission and keep the raw model output for debugging
    #[tracing::instrument(skip_all, fields(task_type = %request.task_type, model = %request.model))]
    pub async fn rate_with_diagnostics(
        &self,
        request: &EvaluationRequest,
    ) -> Result<RatingOutcome, RatingError> {
        request.validate()?;

        let backend = self.backend(request.model);
        let prompt = build_prompt(request);

        let start = Instant::now();
        let reply = backend.evaluate(&prompt).await.map_err(|e| {
            warn!(kind = e.kind().as_str(), error = %e, "Model backend call failed");
            e
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let rating = parse_rating(&reply.content).map_err(|e| {
            warn!(kind = e.kind().as_str(), error = %e, "Model output could not be parsed");
            e
        })?;

        info!(
            backend = backend.name(),
            overall = rating.overall_score.value(),
            duration_ms,
            "Submission rated"
        );

        Ok(RatingOutcome {
            rating,
            diagnostics: Diagnostics {
                backend: backend.name().to_string(),
                model: reply.model,
                word_count: request.word_count(),
                duration_ms,
                usage: reply.usage,
                response_preview: preview(&reply.content),
                raw_output: reply.content,
            },
        })
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
