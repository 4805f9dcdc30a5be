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

//! Model reply parsing.
//!
//! Replies are expected in the five-line `Label: score - feedback` format the
//! prompt asks for, but model output drifts, so parsing is tolerant:
//! labels match case-insensitively with markdown decoration stripped, a JSON
//! object in the original `{"overall_score": ...}` shape is accepted when no
//! overall line is found, and a criterion that cannot be recovered degrades to
//! [`CriterionScore::unparsed`] instead of failing the evaluation. Only a
//! missing or unusable overall score is a hard [`RatingError::Parse`].

use crate::error::RatingError;
use crate::rubric::{
    BandScore, Criterion, CriterionScore, RatingResult, OVERALL_ALIASES, OVERALL_FEEDBACK_ALIASES,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Score and feedback recovered from one labelled line
#[derive(Debug, Clone, PartialEq)]
struct ScoredLine {
    score: BandScore,
    feedback: String,
}

/// Text that follows a label: separators, an optional "band"/"score" word,
/// an optional parenthesised qualifier such as "(out of 9)", an optional
/// linking word ("is", "of"), the signed number, an optional "/9" or
/// "out of 9", then the feedback.
///
/// Separators are matched lazily so a minus sign stays attached to the number
/// and negative scores are rejected instead of read as positive.
fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^[\s*_:=()\[\]|–—-]*?",
            r"(?:(?:band\s*score|band|score)[\s*_:=\[\]|–—-]*?)?",
            r"(?:\([^)\d][^)]{0,24}\)[\s*_:=\[\]|–—-]*?)?",
            r"(?:(?:is|of|was|=)\s*)?",
            r"(-?\d+(?:\.\d+)?)",
            r"\s*(?:(?:/|out\s+of)\s*9(?:\.0)?)?[\s*_)\]]*(.*)$",
        ))
        .expect("score pattern is a valid regex")
    })
}

/// Parse a raw model reply into a [`RatingResult`].
///
/// Pure and deterministic: the same input always yields the same output.
pub fn parse_rating(raw: &str) -> Result<RatingResult, RatingError> {
    let lines: Vec<&str> = raw.lines().collect();

    let Some(overall) = find_scored(&lines, OVERALL_ALIASES) else {
        // Older prompts asked for a JSON object
        if let Some(rating) = parse_json_reply(raw) {
            return Ok(rating);
        }
        warn!("Model output has no recognizable overall score");
        return Err(RatingError::parse(
            "no overall band score found in model output",
            raw,
        ));
    };

    let [task_criterion, coherence_cohesion, lexical_resource, grammatical_range] =
        Criterion::ALL.map(|criterion| match find_scored(&lines, criterion.aliases()) {
            Some(line) => CriterionScore::new(line.score, line.feedback),
            None => {
                warn!(?criterion, "Could not parse criterion from model output");
                CriterionScore::unparsed()
            }
        });

    let overall_feedback = if overall.feedback.is_empty() {
        find_labelled_text(&lines, OVERALL_FEEDBACK_ALIASES).unwrap_or_default()
    } else {
        overall.feedback
    };

    Ok(RatingResult {
        task_criterion,
        coherence_cohesion,
        lexical_resource,
        grammatical_range,
        overall_score: overall.score,
        overall_feedback,
    })
}

/// First line carrying one of `aliases` followed by a valid band score
fn find_scored(lines: &[&str], aliases: &[&str]) -> Option<ScoredLine> {
    for (idx, line) in lines.iter().enumerate() {
        let Some(rest) = strip_label(line, aliases) else {
            continue;
        };
        let Some(caps) = score_pattern().captures(rest) else {
            continue;
        };
        let Some(score) = caps[1].parse::<f64>().ok().and_then(BandScore::new) else {
            continue;
        };

        let mut feedback = clean_feedback(caps.get(2).map_or("", |m| m.as_str()));
        if feedback.is_empty() {
            feedback = continuation(&lines[idx + 1..]).unwrap_or_default();
        }
        return Some(ScoredLine { score, feedback });
    }
    None
}

/// Text after a label that carries no score, e.g. `Overall Feedback: ...`
fn find_labelled_text(lines: &[&str], aliases: &[&str]) -> Option<String> {
    lines.iter().enumerate().find_map(|(idx, line)| {
        let rest = strip_label(line, aliases)?;
        let text = clean_feedback(rest);
        if text.is_empty() {
            continuation(&lines[idx + 1..])
        } else {
            Some(text)
        }
    })
}

/// Feedback written on the line below its label
fn continuation(lines: &[&str]) -> Option<String> {
    let next = lines.iter().find(|line| !line.trim().is_empty())?;
    if is_label_line(next) {
        return None;
    }
    let text = clean_feedback(strip_decoration(next));
    (!text.is_empty()).then_some(text)
}

fn is_label_line(line: &str) -> bool {
    Criterion::ALL
        .iter()
        .any(|criterion| strip_label(line, criterion.aliases()).is_some())
        || strip_label(line, OVERALL_ALIASES).is_some()
        || strip_label(line, OVERALL_FEEDBACK_ALIASES).is_some()
}

/// Leading markdown: headings, bullets, emphasis, list numbering
fn strip_decoration(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '#' | '*' | '-' | '>' | '_' | '•')
    });
    // "1. Task Response" / "2) Coherence"
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start_matches(|c: char| {
                    c.is_whitespace() || matches!(c, '*' | '_')
                });
            }
        }
    }
    line
}

/// Remainder of `line` after a case-insensitive label match at its start
fn strip_label<'a>(line: &'a str, aliases: &[&str]) -> Option<&'a str> {
    let line = strip_decoration(line);
    aliases.iter().find_map(|alias| {
        let head = line.get(..alias.len())?;
        if !head.eq_ignore_ascii_case(alias) {
            return None;
        }
        let rest = &line[alias.len()..];
        // Whole words only: "lexical" must not match "lexically"
        if rest.starts_with(|c: char| c.is_alphanumeric()) {
            return None;
        }
        Some(rest)
    })
}

fn clean_feedback(text: &str) -> String {
    text.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | '|' | '.' | ',' | ';' | '*' | '_')
    })
    .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '_'))
    .trim_matches('"')
    .trim()
    .to_string()
}

/// Accept the original JSON reply shape when the model answers with an object
fn parse_json_reply(raw: &str) -> Option<RatingResult> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;

    let overall_score = object.get("overall_score").and_then(json_band)?;

    let criterion = |criterion: Criterion| {
        criterion
            .json_keys()
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(json_criterion)
            .unwrap_or_else(|| {
                warn!(?criterion, "Could not parse criterion from JSON model output");
                CriterionScore::unparsed()
            })
    };

    Some(RatingResult {
        task_criterion: criterion(Criterion::TaskCriterion),
        coherence_cohesion: criterion(Criterion::CoherenceCohesion),
        lexical_resource: criterion(Criterion::LexicalResource),
        grammatical_range: criterion(Criterion::GrammaticalRange),
        overall_score,
        overall_feedback: object
            .get("overall_feedback")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string(),
    })
}

fn json_band(value: &serde_json::Value) -> Option<BandScore> {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    BandScore::new(raw)
}

fn json_criterion(value: &serde_json::Value) -> Option<CriterionScore> {
    match value {
        serde_json::Value::Object(fields) => {
            let score = fields.get("score").and_then(json_band)?;
            let feedback = fields
                .get("feedback")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim();
            Some(CriterionScore::new(score, feedback))
        }
        other => json_band(other).map(|score| CriterionScore::new(score, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WELL_FORMED: &str = "\
Task Response: 6.5 - Addresses both views but the conclusion is underdeveloped.
Coherence and Cohesion: 7 - Clear paragraphing with a good range of linkers.
Lexical Resource: 6.0 - Adequate vocabulary with some repetition.
Grammatical Range and Accuracy: 6.5 - Mix of complex structures with minor errors.
Overall Score: 6.5 - A competent essay that needs a stronger conclusion.";

    #[test]
    fn test_parse_well_formed_reply() {
        let rating = parse_rating(WELL_FORMED).unwrap();

        assert_eq!(rating.task_criterion.score.value(), 6.5);
        assert_eq!(
            rating.task_criterion.feedback,
            "Addresses both views but the conclusion is underdeveloped."
        );
        assert_eq!(rating.coherence_cohesion.score.value(), 7.0);
        assert_eq!(rating.lexical_resource.score.value(), 6.0);
        assert_eq!(rating.grammatical_range.score.value(), 6.5);
        assert_eq!(rating.overall_score.value(), 6.5);
        assert_eq!(
            rating.overall_feedback,
            "A competent essay that needs a stronger conclusion."
        );
        assert!(rating.criteria().iter().all(|(_, c)| !c.is_unparsed()));
    }

    #[test]
    fn test_missing_lexical_resource_degrades_to_sentinel() {
        let raw = WELL_FORMED
            .lines()
            .filter(|line| !line.starts_with("Lexical"))
            .collect::<Vec<_>>()
            .join("\n");

        let rating = parse_rating(&raw).unwrap();
        assert!(rating.lexical_resource.is_unparsed());
        assert_eq!(rating.lexical_resource.score.value(), 0.0);
        assert_eq!(rating.overall_score.value(), 6.5);
        assert!(!rating.task_criterion.is_unparsed());
    }

    #[test]
    fn test_unparsable_criterion_number_degrades_to_sentinel() {
        let raw = WELL_FORMED.replace("Lexical Resource: 6.0", "Lexical Resource: N/A");
        let rating = parse_rating(&raw).unwrap();
        assert!(rating.lexical_resource.is_unparsed());
    }

    #[test]
    fn test_missing_overall_is_parse_error_with_raw_text() {
        let raw = "The essay is quite good but I cannot give a score.";
        match parse_rating(raw) {
            Err(RatingError::Parse { raw: attached, .. }) => assert_eq!(attached, raw),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_overall_is_parse_error() {
        let raw = WELL_FORMED.replace("Overall Score: 6.5", "Overall Score: 65");
        assert!(matches!(parse_rating(&raw), Err(RatingError::Parse { .. })));
    }

    #[test]
    fn test_markdown_decorated_reply() {
        let raw = "\
## Evaluation

1. **Task Achievement**: 5.5/9 – The letter misses the second bullet point.
2. **Coherence & Cohesion**: Band 6 - Logical but repetitive linking.
- *Lexical Resource:* 6.3 | Some good collocations.
- **Grammatical Range & Accuracy** (6) Frequent article errors.

**Overall Band Score:** 6.0 out of 9 - Solid, but incomplete coverage of the task.";

        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.task_criterion.score.value(), 5.5);
        assert_eq!(
            rating.task_criterion.feedback,
            "The letter misses the second bullet point."
        );
        assert_eq!(rating.coherence_cohesion.score.value(), 6.0);
        assert_eq!(rating.lexical_resource.score.value(), 6.5);
        assert_eq!(rating.lexical_resource.feedback, "Some good collocations.");
        assert_eq!(rating.grammatical_range.score.value(), 6.0);
        assert_eq!(rating.grammatical_range.feedback, "Frequent article errors.");
        assert_eq!(rating.overall_score.value(), 6.0);
        assert_eq!(
            rating.overall_feedback,
            "Solid, but incomplete coverage of the task."
        );
    }

    #[test]
    fn test_feedback_on_following_line() {
        let raw = "\
Task Response: 7
Well argued with relevant examples.
Coherence and Cohesion: 7 - Good.
Lexical Resource: 7 - Good.
Grammatical Range and Accuracy: 7 - Good.
Overall Score: 7
Overall Feedback: Strong essay overall.";

        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.task_criterion.feedback, "Well argued with relevant examples.");
        assert_eq!(rating.overall_feedback, "Strong essay overall.");
    }

    #[test]
    fn test_label_line_is_not_taken_as_feedback() {
        let raw = "\
Task Response: 6
Coherence and Cohesion: 6 - Fine.
Overall Score: 6 - Fine.";

        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.task_criterion.feedback, "");
    }

    #[test]
    fn test_overall_feedback_label_not_mistaken_for_score() {
        let raw = "\
Overall feedback: reads well
Overall Score: 5.5 - Needs work on grammar.";

        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.overall_score.value(), 5.5);
        assert_eq!(rating.overall_feedback, "Needs work on grammar.");
    }

    #[test]
    fn test_json_reply_in_original_shape() {
        let raw = r#"Here is my assessment:
{
  "task_achievement": { "score": 6, "feedback": "Covers all points." },
  "coherence_cohesion": { "score": 6.5, "feedback": "Well organised." },
  "lexical_resource": { "score": "7", "feedback": "Varied vocabulary." },
  "grammatical_range": { "score": 6, "feedback": "Some errors." },
  "overall_score": 6.5,
  "overall_feedback": "A good letter."
}"#;

        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.task_criterion.score.value(), 6.0);
        assert_eq!(rating.task_criterion.feedback, "Covers all points.");
        assert_eq!(rating.lexical_resource.score.value(), 7.0);
        assert_eq!(rating.overall_score.value(), 6.5);
        assert_eq!(rating.overall_feedback, "A good letter.");
    }

    #[test]
    fn test_json_reply_with_missing_criterion() {
        let raw = r#"{"task_response": {"score": 5, "feedback": "Partial."}, "overall_score": 5}"#;
        let rating = parse_rating(raw).unwrap();
        assert_eq!(rating.task_criterion.score.value(), 5.0);
        assert!(rating.coherence_cohesion.is_unparsed());
        assert!(rating.grammatical_range.is_unparsed());
        assert_eq!(rating.overall_feedback, "");
    }

    #[test]
    fn test_json_without_overall_falls_back_to_lines() {
        let raw = format!("{}\n{{\"note\": \"extra\"}}", WELL_FORMED);
        let rating = parse_rating(&raw).unwrap();
        assert_eq!(rating.overall_score.value(), 6.5);
    }

    #[test]
    fn test_line_format_wins_over_trailing_json() {
        let raw = format!("{}\nExample: {{\"overall_score\": 9}}", WELL_FORMED);
        let rating = parse_rating(&raw).unwrap();

        assert_eq!(rating.overall_score.value(), 6.5);
        assert_eq!(rating.task_criterion.score.value(), 6.5);
        assert!(rating.criteria().iter().all(|(_, c)| !c.is_unparsed()));
    }

    #[test]
    fn test_negative_overall_is_parse_error() {
        assert!(matches!(
            parse_rating("Overall Score: -2 - bad"),
            Err(RatingError::Parse { .. })
        ));
    }

    #[test]
    fn test_negative_criterion_degrades_to_sentinel() {
        let raw = WELL_FORMED.replace("Lexical Resource: 6.0", "Lexical Resource: -6.0");
        let rating = parse_rating(&raw).unwrap();
        assert!(rating.lexical_resource.is_unparsed());
    }

    #[test]
    fn test_hyphen_separator_is_not_a_sign() {
        let rating = parse_rating("Overall Score - 7 - Clear and fluent.").unwrap();
        assert_eq!(rating.overall_score.value(), 7.0);
        assert_eq!(rating.overall_feedback, "Clear and fluent.");
    }

    #[test]
    fn test_linking_word_before_score() {
        let rating = parse_rating("Overall band score is 6.5.").unwrap();
        assert_eq!(rating.overall_score.value(), 6.5);

        let rating = parse_rating("Overall score of 7 - Well developed.").unwrap();
        assert_eq!(rating.overall_score.value(), 7.0);
        assert_eq!(rating.overall_feedback, "Well developed.");
    }

    #[test]
    fn test_parenthesised_qualifier_before_score() {
        let rating = parse_rating("Overall Score (out of 9): 6.5 - ok").unwrap();
        assert_eq!(rating.overall_score.value(), 6.5);
        assert_eq!(rating.overall_feedback, "ok");
    }

    #[test]
    fn test_word_boundary_on_labels() {
        assert!(strip_label("Lexically speaking: 7", &["lexical"]).is_none());
        assert_eq!(strip_label("LEXICAL RESOURCE: 7", &["lexical resource"]), Some(": 7"));
    }

    #[test]
    fn test_strip_decoration() {
        assert_eq!(strip_decoration("### 3. **Lexical"), "Lexical");
        assert_eq!(strip_decoration("> - Overall"), "Overall");
        assert_eq!(strip_decoration("2019 was a year"), "2019 was a year");
    }

    #[test]
    fn test_parsing_is_idempotent() {
        assert_eq!(parse_rating(WELL_FORMED).unwrap(), parse_rating(WELL_FORMED).unwrap());
    }

    proptest! {
        #[test]
        fn prop_parse_is_idempotent(raw in "(?s).{0,300}") {
            let first = parse_rating(&raw);
            let second = parse_rating(&raw);
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                (
                    Err(RatingError::Parse { raw: a, .. }),
                    Err(RatingError::Parse { raw: b, .. }),
                ) => prop_assert_eq!(a, b),
                (a, b) => prop_assert!(false, "diverging results: {:?} / {:?}", a, b),
            }
        }

        #[test]
        fn prop_parsed_scores_are_bands(
            scores in proptest::collection::vec(0.0f64..=9.0, 5),
            feedback in "[a-zA-Z ,]{0,40}",
        ) {
            let raw = format!(
                concat!(
                    "Task Achievement: {:.2} - {f}\n",
                    "Coherence and Cohesion: {:.2} - {f}\n",
                    "Lexical Resource: {:.2} - {f}\n",
                    "Grammatical Range and Accuracy: {:.2} - {f}\n",
                    "Overall Score: {:.2} - {f}",
                ),
                scores[0], scores[1], scores[2], scores[3], scores[4], f = feedback,
            );
            let rating = parse_rating(&raw).unwrap();
            let all = [
                rating.task_criterion.score,
                rating.coherence_cohesion.score,
                rating.lexical_resource.score,
                rating.grammatical_range.score,
                rating.overall_score,
            ];
            for score in all {
                prop_assert!((0.0..=9.0).contains(&score.value()));
                prop_assert_eq!((score.value() * 2.0).fract(), 0.0);
            }
        }
    }
}
