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

//! Error taxonomy shared by every surface that calls the rating service.

use thiserror::Error;

/// Errors that can occur while rating a submission
#[derive(Debug, Error)]
pub enum RatingError {
    /// A required request field is missing or empty. Raised before any network call.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The hosted backend has no usable credential, or rejected it.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network failure, timeout, non-success status or malformed backend payload.
    #[error("Model backend error: {0}")]
    Upstream(String),

    /// The overall score could not be recovered from the model output.
    #[error("Could not parse model output: {message}")]
    Parse { message: String, raw: String },
}

/// Discriminant of [`RatingError`], used for wire encoding and headings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Auth,
    Upstream,
    Parse,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Auth => "auth_error",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::Parse => "parse_error",
        }
    }

    /// Human-readable heading shown by the HTTP and terminal surfaces
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Input Error",
            ErrorKind::Auth => "Model Credentials Error",
            ErrorKind::Upstream => "Model Service Error",
            ErrorKind::Parse => "Unreadable Model Output",
        }
    }
}

impl RatingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RatingError::Validation(_) => ErrorKind::Validation,
            RatingError::Auth(_) => ErrorKind::Auth,
            RatingError::Upstream(_) => ErrorKind::Upstream,
            RatingError::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Raw model output attached to parse failures
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            RatingError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Whether this is an upstream failure caused by the request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, RatingError::Upstream(msg) if msg.contains("timed out"))
    }

    pub(crate) fn parse(message: impl Into<String>, raw: &str) -> Self {
        RatingError::Parse {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}

impl From<reqwest::Error> for RatingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RatingError::Upstream(format!("request timed out: {}", err))
        } else if err.is_connect() {
            RatingError::Upstream(format!("model server unreachable: {}", err))
        } else if err.is_decode() {
            RatingError::Upstream(format!("malformed response body: {}", err))
        } else {
            RatingError::Upstream(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RatingError {
    fn from(err: serde_json::Error) -> Self {
        RatingError::Upstream(format!("malformed response body: {}", err))
    }
}
