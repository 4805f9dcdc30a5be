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

//! Plain-text rendering of ratings and errors

use bandscore_evals::{Diagnostics, RatingError, RatingResult, TaskType};
use std::fmt::Write;

/// Render a rating the way the evaluation form shows it
pub fn render_rating(rating: &RatingResult, task_type: TaskType) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall Score: {}", rating.overall_score);
    if !rating.overall_feedback.is_empty() {
        let _ = writeln!(out, "\nFeedback: {}", rating.overall_feedback);
    }

    for (criterion, score) in rating.criteria() {
        let _ = writeln!(out, "\n{}:", criterion.label(task_type));
        if score.is_unparsed() {
            let _ = writeln!(out, "  - Score: n/a");
        } else {
            let _ = writeln!(out, "  - Score: {}", score.score);
        }
        let _ = writeln!(out, "  - Feedback: {}", score.feedback);
    }
    out
}

pub fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Backend: {} ({})", diagnostics.backend, diagnostics.model);
    let _ = writeln!(out, "Words: {}", diagnostics.word_count);
    let _ = writeln!(out, "Duration: {} ms", diagnostics.duration_ms);
    if let Some(usage) = &diagnostics.usage {
        let _ = writeln!(
            out,
            "Tokens: {} prompt + {} completion",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
    let _ = writeln!(out, "Raw output:\n{}", diagnostics.raw_output);
    out
}

/// Heading plus message; parse failures also show what the model said
pub fn render_error(err: &RatingError) -> String {
    let mut out = format!("✗ {}: {}", err.kind().title(), err);
    if let Some(raw) = err.raw_output() {
        let _ = write!(out, "\n\nModel output:\n{}", raw);
    }
    out
}
