use std::sync::Arc;

use serde::Serialize;
use slotpilot_agent::conversation::{Conversation, TurnOutcome};
use slotpilot_agent::llm::LlmClient;
use slotpilot_agent::runtime::DialogueController;
use slotpilot_core::config::{AppConfig, LoadOptions};

use crate::commands::{controller_from_config, controller_with_client, CommandResult};

#[derive(Debug, Serialize)]
struct AskReport<'a> {
    command: &'static str,
    status: &'static str,
    outcome: &'a TurnOutcome,
}

/// Single-shot question. `conversation` is a JSON snapshot from an earlier `awaiting_user`
/// outcome; the question is then treated as the user's reply.
pub fn run(question: &str, conversation: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2)
        }
    };

    match controller_from_config(&config) {
        Ok(controller) => execute(&controller, question, conversation),
        Err(error) => CommandResult::failure("ask", "bootstrap", format!("{error:#}"), 3),
    }
}

pub fn run_with_client(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
    question: &str,
    conversation: Option<&str>,
) -> CommandResult {
    match controller_with_client(config, llm) {
        Ok(controller) => execute(&controller, question, conversation),
        Err(error) => CommandResult::failure("ask", "bootstrap", format!("{error:#}"), 3),
    }
}

fn execute(
    controller: &DialogueController,
    question: &str,
    conversation: Option<&str>,
) -> CommandResult {
    let question = question.trim();
    if question.is_empty() {
        return CommandResult::failure("ask", "invalid_input", "No question provided", 2);
    }

    let snapshot = match conversation.map(serde_json::from_str::<Conversation>).transpose() {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return CommandResult::failure("ask", "invalid_conversation", error.to_string(), 2)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    let result = runtime.block_on(async {
        match snapshot {
            None => Ok(controller.handle(question).await),
            Some(snapshot) => controller.resume(snapshot, question).await,
        }
    });

    match result {
        Ok(outcome) => {
            let exit_code = if matches!(outcome, TurnOutcome::Failed { .. }) { 1 } else { 0 };
            CommandResult::json(
                exit_code,
                &AskReport { command: "ask", status: outcome.status(), outcome: &outcome },
            )
        }
        Err(error) => CommandResult::failure("ask", "invalid_conversation", error.to_string(), 2),
    }
}
