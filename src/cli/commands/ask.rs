//! Ask command implementation.

use crate::agent::WikiAgent;
use crate::cli::output::content_preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the agent once on `question` and print the answer.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    show_steps: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(model) = model {
        settings.llm.model = model;
    }

    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Add the key to your environment or a .env file.");
        return Err(e.into());
    }

    let agent = WikiAgent::from_settings(&settings)?;
    let spinner = Output::spinner("Agent working...");

    let mut printed = 0;
    let result = agent
        .run_with_steps(question, |state| {
            if show_steps {
                spinner.suspend(|| {
                    for message in &state.messages[printed..] {
                        Output::message(message);
                    }
                });
                printed = state.messages.len();
            }
        })
        .await;

    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            if !show_steps {
                println!("\n{}\n", response.answer);
            }

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::kv(&call.to_string(), &content_preview(&call.result, 60));
                }
                println!();
            }

            Output::info(&format!("Completed in {} step(s)", response.steps));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Agent failed: {}", e));
            Err(e.into())
        }
    }
}
