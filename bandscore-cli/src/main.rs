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

//! Bandscore CLI
//!
//! Terminal form for rating IELTS writing submissions, either in-process or
//! against a running `bandscore-server`.

mod client;
mod display;
mod form;

use anyhow::{Context, Result};
use bandscore_evals::{
    BackendConfig, Diagnostics, ModelChoice, RatingError, RatingResult, RatingService, TaskType,
};
use clap::{Parser, Subcommand};
use client::RatingClient;
use form::{fill_submission, read_text_source, FormInput};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "bandscore")]
#[command(about = "Bandscore - IELTS writing evaluator", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate a writing submission; missing fields are asked for interactively
    Rate {
        /// Model backend: hosted or local
        #[arg(short, long)]
        model: Option<ModelChoice>,

        /// Writing task type: task1 or task2
        #[arg(short, long)]
        task: Option<TaskType>,

        /// Task question text
        #[arg(short, long, conflicts_with = "question_file")]
        question: Option<String>,

        /// Read the task question from a file ("-" for stdin)
        #[arg(long)]
        question_file: Option<PathBuf>,

        /// Read the response from a file ("-" for stdin)
        #[arg(short, long)]
        response_file: Option<PathBuf>,

        /// Rating server URL; rates in-process when omitted
        #[arg(long, env = "BANDSCORE_SERVER_URL")]
        server: Option<String>,

        /// Show backend diagnostics and the raw model output
        #[arg(long)]
        debug: bool,

        /// Timeout for the whole request in seconds
        #[arg(long, default_value = "180")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rate {
            model,
            task,
            question,
            question_file,
            response_file,
            server,
            debug,
            timeout,
        } => {
            if question_file.as_deref().is_some_and(|p| p.as_os_str() == "-")
                && response_file.as_deref().is_some_and(|p| p.as_os_str() == "-")
            {
                anyhow::bail!("question and response cannot both be read from stdin");
            }

            let question = match (question, question_file) {
                (Some(text), _) => Some(text),
                (None, Some(path)) => Some(read_text_source(&path)?),
                (None, None) => None,
            };
            let response = response_file
                .map(|path| read_text_source(&path))
                .transpose()?;

            let form = FormInput {
                model,
                task_type: task,
                question,
                response,
            };
            let stdin = std::io::stdin();
            let submission = fill_submission(form, &mut stdin.lock(), &mut std::io::stderr())
                .context("Failed to read submission")?;

            // Input errors are reported before any request is made
            if let Err(e) = submission.validate() {
                eprintln!("{}", display::render_error(&e));
                return Ok(ExitCode::FAILURE);
            }

            let timeout = Duration::from_secs(timeout);
            let result = match server {
                Some(url) => {
                    info!(%url, "Rating via server");
                    match RatingClient::new(&url, timeout) {
                        Ok(client) => client
                            .rate(&submission, debug)
                            .await
                            .map(|remote| (remote.rating, remote.debug_info)),
                        Err(e) => Err(e),
                    }
                }
                None => rate_in_process(&submission, timeout).await,
            };

            match result {
                Ok((rating, diagnostics)) => {
                    print_rating(
                        &rating,
                        diagnostics.as_ref(),
                        submission.task_type,
                        cli.json,
                        debug,
                    )?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{}", display::render_error(&e));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn rate_in_process(
    submission: &bandscore_evals::EvaluationRequest,
    timeout: Duration,
) -> Result<(RatingResult, Option<Diagnostics>), RatingError> {
    let service = RatingService::from_config(&BackendConfig::from_env())?;
    let outcome = tokio::time::timeout(timeout, service.rate_with_diagnostics(submission))
        .await
        .map_err(|_| {
            RatingError::Upstream(format!("evaluation timed out after {}s", timeout.as_secs()))
        })??;
    Ok((outcome.rating, Some(outcome.diagnostics)))
}

fn print_rating(
    rating: &RatingResult,
    diagnostics: Option<&Diagnostics>,
    task_type: TaskType,
    json: bool,
    debug: bool,
) -> Result<()> {
    if json {
        let mut value = serde_json::json!({ "rating": rating });
        if let (true, Some(diagnostics)) = (debug, diagnostics) {
            value["debug_info"] = serde_json::to_value(diagnostics)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print!("{}", display::render_rating(rating, task_type));
    if let (true, Some(diagnostics)) = (debug, diagnostics) {
        println!("\n--- Diagnostics ---");
        print!("{}", display::render_diagnostics(diagnostics));
    }
    Ok(())
}
