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

//! Client for a running `bandscore-server`

use bandscore_evals::{Diagnostics, EvaluationRequest, RatingError, RatingResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct RemoteRating {
    pub rating: RatingResult,
    #[serde(default)]
    pub debug_info: Option<Diagnostics>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    error: String,
    kind: String,
    #[serde(default)]
    raw_output: Option<String>,
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    #[serde(flatten)]
    submission: &'a EvaluationRequest,
    debug: bool,
}

pub struct RatingClient {
    base_url: String,
    client: reqwest::Client,
}

impl RatingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RatingError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub async fn rate(
        &self,
        submission: &EvaluationRequest,
        debug: bool,
    ) -> Result<RemoteRating, RatingError> {
        let url = format!("{}/rate", self.base_url);
        debug!(%url, "Posting submission to rating server");

        let response = self
            .client
            .post(&url)
            .json(&RemoteRequest { submission, debug })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<RemoteError>(&body) {
            Ok(remote) => error_from_remote(remote),
            Err(_) => RatingError::Upstream(format!("rating server returned {}: {}", status, body)),
        })
    }
}

/// Rebuild the typed error the server reported
fn error_from_remote(remote: RemoteError) -> RatingError {
    match remote.kind.as_str() {
        "validation_error" => RatingError::Validation(remote.error),
        "auth_error" => RatingError::Auth(remote.error),
        "parse_error" => RatingError::Parse {
            message: remote.error,
            raw: remote.raw_output.unwrap_or_default(),
        },
        _ => RatingError::Upstream(remote.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandscore_evals::ErrorKind;

    #[test]
    fn test_error_kinds_roundtrip_from_server_body() {
        let body = r#"{
            "error": "Could not parse model output: no overall",
            "kind": "parse_error",
            "title": "Unreadable Model Output",
            "raw_output": "hello"
        }"#;
        let err = error_from_remote(serde_json::from_str(body).unwrap());
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.raw_output(), Some("hello"));

        let body =
            r#"{"error": "no key", "kind": "auth_error", "title": "Model Credentials Error"}"#;
        let err = error_from_remote(serde_json::from_str(body).unwrap());
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_request_body_is_flat() {
        let submission = EvaluationRequest::new(
            bandscore_evals::TaskType::Task1,
            "Write a letter",
            "Dear Sir",
            bandscore_evals::ModelChoice::Local,
        );
        let value = serde_json::to_value(RemoteRequest {
            submission: &submission,
            debug: true,
        })
        .unwrap();
        assert_eq!(value["task_type"], "task1");
        assert_eq!(value["model"], "local");
        assert_eq!(value["debug"], true);
    }
}
