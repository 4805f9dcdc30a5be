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

//! Evaluation prompt construction

use crate::rubric::{Criterion, EvaluationRequest};

/// System message sent by backends that accept one
pub const SYSTEM_PROMPT: &str = "You are a certified IELTS examiner.";

/// Label the model must use for the overall line
pub const OVERALL_LABEL: &str = "Overall Score";

/// Build the model-agnostic evaluation prompt for a submission.
///
/// The question and response are embedded verbatim. The reply format is a
/// fixed five-line `Label: score - feedback` block that
/// [`parse_rating`](crate::parser::parse_rating) understands.
pub fn build_prompt(request: &EvaluationRequest) -> String {
    let task_type = request.task_type;

    let mut prompt = format!(
        "You are a certified IELTS examiner, assessing the following IELTS General Training \
         Writing {task} response according to the official IELTS band descriptors.\n\n\
         ### IELTS Assessment Criteria:\n",
        task = task_type.description(),
    );

    for criterion in Criterion::ALL {
        prompt.push_str(&format!(
            "- {label}: {guidance}.\n",
            label = criterion.label(task_type),
            guidance = criterion.guidance(task_type),
        ));
    }
    prompt.push_str(&format!(
        "- {}: the final writing band score (0-9, in increments of 0.5).\n",
        OVERALL_LABEL
    ));

    prompt.push_str("\n### Task Question:\n");
    prompt.push_str(&request.question);
    prompt.push_str(&format!(
        "\n\n### Candidate Response ({words} words, minimum expected {min}):\n",
        words = request.word_count(),
        min = task_type.minimum_words(),
    ));
    prompt.push_str(&request.response);

    prompt.push_str(
        "\n\n### Instructions:\n\
         - Rate the response fairly against IELTS standards, avoiding extreme scores \
         unless justified.\n\
         - Give a concise explanation for each criterion, covering both strengths and weaknesses.\n\
         - Penalise responses that fall short of the minimum word count.\n\
         - Assign every score in 0.5 increments between 0 and 9.\n\
         \n### Reply Format:\n\
         Reply with exactly these five lines and nothing else. Each line is the label, \
         a colon, the numeric score, a hyphen, and one sentence of feedback:\n",
    );

    for criterion in Criterion::ALL {
        prompt.push_str(&format!(
            "{}: <score> - <feedback>\n",
            criterion.label(task_type)
        ));
    }
    prompt.push_str(&format!(
        "{}: <score> - <summary of key strengths and areas for improvement>\n",
        OVERALL_LABEL
    ));

    prompt
}
