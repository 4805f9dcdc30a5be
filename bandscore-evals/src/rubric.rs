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

//! IELTS writing rubric: task types, band scores and the rating result schema.
//!
//! The same types drive prompt construction (criterion labels) and reply
//! parsing (label aliases), so the two can never drift apart.

use crate::error::RatingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two IELTS General Training writing sub-tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Letter writing
    Task1,
    /// Essay writing
    Task2,
}

impl TaskType {
    /// Name of the first criterion, the only one that differs between tasks
    pub fn first_criterion_label(&self) -> &'static str {
        match self {
            TaskType::Task1 => "Task Achievement",
            TaskType::Task2 => "Task Response",
        }
    }

    pub fn minimum_words(&self) -> usize {
        match self {
            TaskType::Task1 => 150,
            TaskType::Task2 => 250,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TaskType::Task1 => "Task 1 (letter)",
            TaskType::Task2 => "Task 2 (essay)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Task1 => "task1",
            TaskType::Task2 => "task2",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task1" | "1" => Ok(TaskType::Task1),
            "task2" | "2" => Ok(TaskType::Task2),
            other => Err(RatingError::Validation(format!(
                "unknown task type '{}', expected task1 or task2",
                other
            ))),
        }
    }
}

/// Which model backend should rate the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Remote chat-completion API, needs a credential
    #[serde(alias = "chatgpt", alias = "chatGPT")]
    Hosted,
    /// Locally served model (Ollama)
    #[serde(alias = "llama3.2")]
    Local,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Hosted => "hosted",
            ModelChoice::Local => "local",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelChoice {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "chatgpt" => Ok(ModelChoice::Hosted),
            "local" | "llama3.2" => Ok(ModelChoice::Local),
            other => Err(RatingError::Validation(format!(
                "unknown model '{}', expected hosted or local",
                other
            ))),
        }
    }
}

/// IELTS band score: 0 to 9 in 0.5 increments
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BandScore(f64);

impl BandScore {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 9.0;

    /// Round a raw score to the nearest half band.
    ///
    /// Returns `None` for values that are not finite or fall outside `[0, 9]`.
    pub fn new(raw: f64) -> Option<Self> {
        if !raw.is_finite() || !(Self::MIN..=Self::MAX).contains(&raw) {
            return None;
        }
        Some(Self((raw * 2.0).round() / 2.0))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for BandScore {
    type Error = String;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        BandScore::new(raw).ok_or_else(|| format!("band score {} is outside 0-9", raw))
    }
}

impl From<BandScore> for f64 {
    fn from(score: BandScore) -> Self {
        score.0
    }
}

impl fmt::Display for BandScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Feedback attached to a criterion the parser could not recover
pub const UNPARSED_FEEDBACK: &str = "could not parse model output for this criterion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub score: BandScore,
    pub feedback: String,
}

impl CriterionScore {
    pub fn new(score: BandScore, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    /// Sentinel used when a single criterion is missing from the model output
    pub fn unparsed() -> Self {
        Self::new(BandScore::zero(), UNPARSED_FEEDBACK)
    }

    pub fn is_unparsed(&self) -> bool {
        self.score == BandScore::zero() && self.feedback == UNPARSED_FEEDBACK
    }
}

/// Structured rating for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingResult {
    /// Task Achievement (task 1) or Task Response (task 2)
    #[serde(alias = "task_achievement", alias = "task_response")]
    pub task_criterion: CriterionScore,
    pub coherence_cohesion: CriterionScore,
    pub lexical_resource: CriterionScore,
    pub grammatical_range: CriterionScore,
    pub overall_score: BandScore,
    pub overall_feedback: String,
}

impl RatingResult {
    /// Criteria in rubric order
    pub fn criteria(&self) -> [(Criterion, &CriterionScore); 4] {
        [
            (Criterion::TaskCriterion, &self.task_criterion),
            (Criterion::CoherenceCohesion, &self.coherence_cohesion),
            (Criterion::LexicalResource, &self.lexical_resource),
            (Criterion::GrammaticalRange, &self.grammatical_range),
        ]
    }
}

/// The four scored criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    TaskCriterion,
    CoherenceCohesion,
    LexicalResource,
    GrammaticalRange,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::TaskCriterion,
        Criterion::CoherenceCohesion,
        Criterion::LexicalResource,
        Criterion::GrammaticalRange,
    ];

    /// Label used in the prompt and expected back in the reply
    pub fn label(&self, task_type: TaskType) -> &'static str {
        match self {
            Criterion::TaskCriterion => task_type.first_criterion_label(),
            Criterion::CoherenceCohesion => "Coherence and Cohesion",
            Criterion::LexicalResource => "Lexical Resource",
            Criterion::GrammaticalRange => "Grammatical Range and Accuracy",
        }
    }

    /// Short description of what the criterion assesses
    pub fn guidance(&self, task_type: TaskType) -> &'static str {
        match (self, task_type) {
            (Criterion::TaskCriterion, TaskType::Task1) => {
                "how fully the letter covers every bullet point with a clear purpose \
                 and an appropriate tone"
            }
            (Criterion::TaskCriterion, TaskType::Task2) => {
                "how fully the essay addresses all parts of the question with a clear, \
                 well-supported position"
            }
            (Criterion::CoherenceCohesion, _) => {
                "logical organization, paragraphing and use of linking words"
            }
            (Criterion::LexicalResource, _) => {
                "range, accuracy and appropriateness of vocabulary"
            }
            (Criterion::GrammaticalRange, _) => {
                "variety and correctness of sentence structures"
            }
        }
    }

    /// Accepted label spellings, longest first so prefixes never shadow a full match
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Criterion::TaskCriterion => &[
                "task achievement",
                "task response",
                "task_achievement",
                "task_response",
            ],
            Criterion::CoherenceCohesion => &[
                "coherence and cohesion",
                "coherence & cohesion",
                "coherence_cohesion",
                "coherence",
            ],
            Criterion::LexicalResource => &[
                "lexical resource",
                "lexical_resource",
                "lexical",
                "vocabulary",
            ],
            Criterion::GrammaticalRange => &[
                "grammatical range and accuracy",
                "grammatical range & accuracy",
                "grammatical_range",
                "grammatical range",
                "grammar",
            ],
        }
    }

    /// JSON keys accepted when the model answers with an object
    pub fn json_keys(&self) -> &'static [&'static str] {
        match self {
            Criterion::TaskCriterion => &["task_criterion", "task_achievement", "task_response"],
            Criterion::CoherenceCohesion => &["coherence_cohesion"],
            Criterion::LexicalResource => &["lexical_resource"],
            Criterion::GrammaticalRange => &["grammatical_range"],
        }
    }
}

/// Labels for the overall band line
pub const OVERALL_ALIASES: &[&str] = &[
    "overall band score",
    "overall score",
    "overall band",
    "overall_score",
    "overall",
];

/// Labels for a standalone overall feedback line
pub const OVERALL_FEEDBACK_ALIASES: &[&str] = &["overall feedback", "overall_feedback", "summary"];

/// A single writing submission to be rated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub task_type: TaskType,
    pub question: String,
    pub response: String,
    pub model: ModelChoice,
}

impl EvaluationRequest {
    pub fn new(
        task_type: TaskType,
        question: impl Into<String>,
        response: impl Into<String>,
        model: ModelChoice,
    ) -> Self {
        Self {
            task_type,
            question: question.into(),
            response: response.into(),
            model,
        }
    }

    /// Reject empty fields before any network call is made
    pub fn validate(&self) -> Result<(), RatingError> {
        if self.question.trim().is_empty() {
            return Err(RatingError::Validation("question must not be empty".to_string()));
        }
        if self.response.trim().is_empty() {
            return Err(RatingError::Validation("response must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn word_count(&self) -> usize {
        self.response.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_score_rounding() {
        assert_eq!(BandScore::new(6.5).unwrap().value(), 6.5);
        assert_eq!(BandScore::new(6.3).unwrap().value(), 6.5);
        assert_eq!(BandScore::new(6.2).unwrap().value(), 6.0);
        assert_eq!(BandScore::new(6.75).unwrap().value(), 7.0);
        assert_eq!(BandScore::new(8.9).unwrap().value(), 9.0);
        assert!(BandScore::new(9.5).is_none());
        assert!(BandScore::new(-1.0).is_none());
        assert!(BandScore::new(f64::NAN).is_none());
    }

    #[test]
    fn test_band_score_serde() {
        let score = BandScore::new(7.0).unwrap();
        assert_eq!(serde_json::to_string(&score).unwrap(), "7.0");
        let parsed: BandScore = serde_json::from_str("5.5").unwrap();
        assert_eq!(parsed.value(), 5.5);
        assert!(serde_json::from_str::<BandScore>("12").is_err());
    }

    #[test]
    fn test_first_criterion_differs_by_task() {
        assert_eq!(Criterion::TaskCriterion.label(TaskType::Task1), "Task Achievement");
        assert_eq!(Criterion::TaskCriterion.label(TaskType::Task2), "Task Response");
        for criterion in &Criterion::ALL[1..] {
            assert_eq!(criterion.label(TaskType::Task1), criterion.label(TaskType::Task2));
        }
    }

    #[test]
    fn test_model_choice_legacy_names() {
        let hosted: ModelChoice = serde_json::from_str("\"chatGPT\"").unwrap();
        let local: ModelChoice = serde_json::from_str("\"llama3.2\"").unwrap();
        assert_eq!(hosted, ModelChoice::Hosted);
        assert_eq!(local, ModelChoice::Local);
        assert_eq!("Hosted".parse::<ModelChoice>().unwrap(), ModelChoice::Hosted);
        assert!("gpt".parse::<ModelChoice>().is_err());
    }

    #[test]
    fn test_request_validation() {
        let ok = EvaluationRequest::new(TaskType::Task2, "Q", "Some answer", ModelChoice::Local);
        assert!(ok.validate().is_ok());

        let blank = EvaluationRequest::new(TaskType::Task2, "Q", "  \n", ModelChoice::Local);
        assert!(matches!(blank.validate(), Err(RatingError::Validation(_))));

        let no_question = EvaluationRequest::new(TaskType::Task1, "", "text", ModelChoice::Hosted);
        assert!(matches!(no_question.validate(), Err(RatingError::Validation(_))));
    }

    #[test]
    fn test_sentinel_roundtrip() {
        let sentinel = CriterionScore::unparsed();
        assert!(sentinel.is_unparsed());
        assert!(!CriterionScore::new(BandScore::zero(), "Blank page").is_unparsed());
    }

    #[test]
    fn test_legacy_task_achievement_key() {
        let json = r#"{
            "task_achievement": {"score": 6.0, "feedback": "a"},
            "coherence_cohesion": {"score": 6.5, "feedback": "b"},
            "lexical_resource": {"score": 7.0, "feedback": "c"},
            "grammatical_range": {"score": 6.0, "feedback": "d"},
            "overall_score": 6.5,
            "overall_feedback": "e"
        }"#;
        let rating: RatingResult = serde_json::from_str(json).unwrap();
        assert_eq!(rating.task_criterion.score.value(), 6.0);
    }

    proptest! {
        #[test]
        fn prop_band_scores_are_half_steps(raw in 0.0f64..=9.0) {
            let score = BandScore::new(raw).unwrap().value();
            prop_assert!((0.0..=9.0).contains(&score));
            prop_assert_eq!((score * 2.0).fract(), 0.0);
            prop_assert!((score - raw).abs() <= 0.25);
        }
    }
}
