pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod scenes;

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use slotpilot_agent::llm::{ChatCompletionsClient, LlmClient};
use slotpilot_agent::runtime::DialogueController;
use slotpilot_core::config::AppConfig;
use slotpilot_core::registry::SceneRegistry;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    pub fn json(exit_code: u8, payload: &impl Serialize) -> Self {
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Builds a controller over the configured scene directory and the given gateway.
pub fn controller_with_client(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> anyhow::Result<DialogueController> {
    let load = SceneRegistry::load_dir(&config.scenes.dir);
    DialogueController::new(Arc::new(load.registry), llm, &config.dialogue)
        .context("failed to compile prompt templates")
}

pub fn controller_from_config(config: &AppConfig) -> anyhow::Result<DialogueController> {
    let llm = ChatCompletionsClient::new(&config.llm).context("failed to build llm gateway")?;
    controller_with_client(config, Arc::new(llm))
}

fn serialize_payload(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
