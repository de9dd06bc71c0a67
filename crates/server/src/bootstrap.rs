use std::sync::Arc;

use slotpilot_agent::llm::{ChatCompletionsClient, LlmClient};
use slotpilot_agent::runtime::DialogueController;
use slotpilot_core::config::AppConfig;
use slotpilot_core::errors::{PromptError, TransportError};
use slotpilot_core::registry::SceneRegistry;
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub controller: Arc<DialogueController>,
    pub scene_count: usize,
    pub skipped_sources: usize,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("llm gateway could not be initialised: {0}")]
    Gateway(#[source] TransportError),
    #[error("prompt templates failed to compile: {0}")]
    Prompt(#[source] PromptError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let llm = ChatCompletionsClient::new(&config.llm).map_err(BootstrapError::Gateway)?;
    info!(
        event_name = "system.bootstrap.gateway_ready",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        endpoint = %llm.endpoint(),
        model = %config.llm.model,
        "llm gateway initialised"
    );
    bootstrap_with_client(config, Arc::new(llm))
}

pub fn bootstrap_with_client(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    let load = SceneRegistry::load_dir(&config.scenes.dir);
    let scene_count = load.registry.len();
    let skipped_sources = load.skipped.len();

    if scene_count == 0 {
        warn!(
            event_name = "system.bootstrap.no_scenes",
            correlation_id = "bootstrap",
            scenes_dir = %config.scenes.dir.display(),
            "no scenes loaded; every question will go unmatched"
        );
    }
    info!(
        event_name = "system.bootstrap.scenes_loaded",
        correlation_id = "bootstrap",
        scenes_dir = %config.scenes.dir.display(),
        scene_count,
        skipped_sources,
        "scene registry ready"
    );

    let controller = DialogueController::new(Arc::new(load.registry), llm, &config.dialogue)
        .map_err(BootstrapError::Prompt)?;

    Ok(Application { config, controller: Arc::new(controller), scene_count, skipped_sources })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use slotpilot_agent::llm::ScriptedLlmClient;
    use slotpilot_core::config::AppConfig;
    use tempfile::TempDir;

    use crate::bootstrap::{bootstrap_with_client, bootstrap_with_config};

    #[test]
    fn bootstrap_with_default_config_builds_http_gateway() {
        let mut config = AppConfig::default();
        config.scenes.dir = "/definitely/not/here".into();

        let app = bootstrap_with_config(config).expect("bootstrap succeeds");
        assert_eq!(app.scene_count, 0);
        assert_eq!(app.config.server.port, 5000);
    }

    #[test]
    fn bootstrap_loads_scene_directory_and_reports_skips() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join("flight.json"),
            r#"{ "flight_change": { "parameters": [{ "name": "date", "desc": "date" }] } }"#,
        )
        .expect("write scenes");
        fs::write(dir.path().join("broken.json"), "{ nope").expect("write broken");

        let mut config = AppConfig::default();
        config.scenes.dir = dir.path().to_path_buf();

        let app = bootstrap_with_client(config, Arc::new(ScriptedLlmClient::default()))
            .expect("bootstrap succeeds");

        assert_eq!(app.scene_count, 1);
        assert_eq!(app.skipped_sources, 1);
        assert_eq!(app.controller.registry().len(), 1);
    }

    #[test]
    fn missing_scene_directory_still_boots() {
        let mut config = AppConfig::default();
        config.scenes.dir = "/definitely/not/here".into();

        let app = bootstrap_with_client(config, Arc::new(ScriptedLlmClient::default()))
            .expect("bootstrap succeeds");
        assert_eq!(app.scene_count, 0);
    }
}
