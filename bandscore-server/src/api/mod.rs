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

pub mod health;
pub mod rate;

pub use health::{health_check, BackendsHealth, HealthResponse};
pub use rate::{rate_writing, RateQuery, RateRequest, RatingResponse};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bandscore_evals::{BackendConfig, ErrorKind, RatingError, RatingService};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error returned by every handler, rendered as a JSON body with a distinct
/// status and heading per error kind
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub RatingError);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(RatingError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Auth => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Upstream if self.0.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Upstream | ErrorKind::Parse => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.0.kind();

        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: kind.as_str(),
            title: kind.title(),
            raw_output: self.0.raw_output().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RatingService>,
    pub backends: Arc<BackendsHealth>,
    /// Deadline for one rating request, backend call included
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: RatingService, llm: &BackendConfig, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            backends: Arc::new(BackendsHealth::from_config(llm)),
            request_timeout,
        }
    }
}
