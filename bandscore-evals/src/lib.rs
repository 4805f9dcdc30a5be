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

//! # Bandscore Evaluation Core
//!
//! Rates IELTS writing submissions with a large language model.
//!
//! ## Pipeline
//!
//! - **Rubric schema** ([`rubric`]): task types, band scores, the rating result
//! - **Prompt builder** ([`prompt`]): deterministic, task-specific instruction
//! - **Model backends** ([`backend`]): hosted chat-completion API or local Ollama server
//! - **Response parser** ([`parser`]): tolerant reply parsing with per-criterion fallback
//! - **Rating service** ([`service`]): validate → prompt → backend → parse
//!
//! ## Example
//!
//! ```rust,ignore
//! use bandscore_evals::{BackendConfig, EvaluationRequest, ModelChoice, RatingService, TaskType};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = RatingService::from_config(&BackendConfig::from_env()).unwrap();
//!     let request = EvaluationRequest::new(
//!         TaskType::Task2,
//!         "Some cities are becoming overcrowded...",
//!         "In recent years...",
//!         ModelChoice::Hosted,
//!     );
//!     let rating = service.rate(&request).await.unwrap();
//!     println!("Overall band: {}", rating.overall_score);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod rubric;
pub mod service;

pub use backend::{BackendReply, HostedBackend, LocalBackend, ModelBackend, TokenUsage};
pub use config::{BackendConfig, HostedConfig, LocalConfig};
pub use error::{ErrorKind, RatingError};
pub use parser::parse_rating;
pub use prompt::build_prompt;
pub use rubric::{
    BandScore, Criterion, CriterionScore, EvaluationRequest, ModelChoice, RatingResult, TaskType,
    UNPARSED_FEEDBACK,
};
pub use service::{Diagnostics, RatingOutcome, RatingService};
