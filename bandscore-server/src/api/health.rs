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

use axum::{extract::State, Json};
use bandscore_evals::BackendConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;

/// Health check response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backends: BackendsHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsHealth {
    pub hosted: HostedHealth,
    pub local: LocalHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedHealth {
    pub model: String,
    pub credential_configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalHealth {
    pub model: String,
    pub base_url: String,
}

impl BackendsHealth {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            hosted: HostedHealth {
                model: config.hosted.model.clone(),
                credential_configured: config.hosted.has_credential(),
            },
            local: LocalHealth {
                model: config.local.model.clone(),
                base_url: config.local.base_url.clone(),
            },
        }
    }
}

/// GET /health - Static configuration summary; backends are not probed
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends: state.backends.as_ref().clone(),
    })
}
