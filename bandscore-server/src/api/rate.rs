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

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use bandscore_evals::{Diagnostics, EvaluationRequest, RatingError, RatingResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiError, AppState};

/// Body of `POST /rate`
#[derive(Debug, Clone, Deserialize)]
pub struct RateRequest {
    #[serde(flatten)]
    pub submission: EvaluationRequest,

    /// Include the raw model output in the response
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateQuery {
    #[serde(default)]
    pub debug_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: RatingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<Diagnostics>,
}

/// POST /rate - Rate an IELTS writing submission
pub async fn rate_writing(
    State(state): State<AppState>,
    query: Option<Query<RateQuery>>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Json<RatingResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected rating request body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;
    let debug_enabled = request.debug || query.map(|Query(q)| q.debug_mode).unwrap_or(false);

    info!(
        task_type = %request.submission.task_type,
        model = %request.submission.model,
        debug = debug_enabled,
        "Rating request received"
    );

    let outcome = tokio::time::timeout(
        state.request_timeout,
        state.service.rate_with_diagnostics(&request.submission),
    )
    .await
    .map_err(|_| {
        RatingError::Upstream(format!(
            "evaluation timed out after {}s",
            state.request_timeout.as_secs()
        ))
    })?
    .map_err(|e| {
        warn!(kind = e.kind().as_str(), "Rating failed: {}", e);
        ApiError(e)
    })?;

    Ok(Json(RatingResponse {
        rating: outcome.rating,
        debug_info: debug_enabled.then_some(outcome.diagnostics),
    }))
}
