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

//! Terminal input form: gathers the fields of a submission, prompting for
//! whatever was not supplied on the command line.

use anyhow::{Context, Result};
use bandscore_evals::{EvaluationRequest, ModelChoice, TaskType};
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

/// Fields supplied on the command line; `None` means "ask"
#[derive(Debug, Default, Clone)]
pub struct FormInput {
    pub model: Option<ModelChoice>,
    pub task_type: Option<TaskType>,
    pub question: Option<String>,
    pub response: Option<String>,
}

/// Read text from a file, or from stdin when the path is `-`
pub fn read_text_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
    }
}

/// Complete the submission, prompting on `output` and reading from `input`
pub fn fill_submission<R: BufRead, W: Write>(
    form: FormInput,
    input: &mut R,
    output: &mut W,
) -> Result<EvaluationRequest> {
    let model = match form.model {
        Some(model) => model,
        None => prompt_choice(
            input,
            output,
            "Select AI model [hosted/local]",
            ModelChoice::Hosted,
        )?,
    };
    let task_type = match form.task_type {
        Some(task_type) => task_type,
        None => prompt_choice(
            input,
            output,
            "Select writing task type [task1/task2]",
            TaskType::Task1,
        )?,
    };
    let question = match form.question {
        Some(question) => question,
        None => prompt_multiline(input, output, "Enter task question")?,
    };
    let response = match form.response {
        Some(response) => response,
        None => prompt_multiline(input, output, "Enter your response")?,
    };

    Ok(EvaluationRequest::new(
        task_type,
        question.trim(),
        response.trim(),
        model,
    ))
}

/// Ask for a single value; an empty answer picks `default`
fn prompt_choice<T, R, W>(input: &mut R, output: &mut W, label: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "{} (default {}): ", label, default)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse() {
            Ok(value) => return Ok(value),
            Err(e) => writeln!(output, "  {}", e)?,
        }
    }
}

/// Ask for multi-line text, terminated by an empty line or end of input
fn prompt_multiline<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
) -> Result<String> {
    writeln!(output, "{} (finish with an empty line):", label)?;
    output.flush()?;

    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        if line.trim().is_empty() {
            // Leading blank lines do not end the input
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompts_only_for_missing_fields() {
        let form = FormInput {
            model: Some(ModelChoice::Local),
            task_type: Some(TaskType::Task2),
            question: Some("Discuss both views.".to_string()),
            response: None,
        };
        let mut input = Cursor::new("First paragraph.\nSecond paragraph.\n\nignored\n");
        let mut output = Vec::new();

        let request = fill_submission(form, &mut input, &mut output).unwrap();
        assert_eq!(request.response, "First paragraph.\nSecond paragraph.");
        assert_eq!(request.model, ModelChoice::Local);

        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.contains("Enter your response"));
        assert!(!prompts.contains("Select AI model"));
    }

    #[test]
    fn test_full_interactive_form() {
        let mut input = Cursor::new("local\ntask2\nWhy travel?\n\nBecause it is fun.\n");
        let mut output = Vec::new();

        let request = fill_submission(FormInput::default(), &mut input, &mut output).unwrap();
        assert_eq!(request.model, ModelChoice::Local);
        assert_eq!(request.task_type, TaskType::Task2);
        assert_eq!(request.question, "Why travel?");
        assert_eq!(request.response, "Because it is fun.");
    }

    #[test]
    fn test_invalid_choice_reprompts() {
        let mut input = Cursor::new("gpt5\nhosted\n\nQ\n\nR\n");
        let mut output = Vec::new();

        let request = fill_submission(FormInput::default(), &mut input, &mut output).unwrap();
        assert_eq!(request.model, ModelChoice::Hosted);
        assert_eq!(request.task_type, TaskType::Task1);

        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.contains("unknown model 'gpt5'"));
    }

    #[test]
    fn test_empty_input_yields_empty_fields() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();

        let request = fill_submission(FormInput::default(), &mut input, &mut output).unwrap();
        assert!(request.response.is_empty());
        assert!(request.validate().is_err());
    }
}
