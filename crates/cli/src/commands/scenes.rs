use serde::Serialize;
use slotpilot_core::config::{AppConfig, LoadOptions};
use slotpilot_core::domain::scene::{AnswerStrategy, Scene, SlotDefinition};
use slotpilot_core::registry::SceneRegistry;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SceneSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    answer: &'static str,
    parameters: &'a [SlotDefinition],
}

#[derive(Debug, Serialize)]
struct ScenesReport<'a> {
    command: &'static str,
    status: &'static str,
    scenes_dir: String,
    scene_count: usize,
    scenes: Vec<SceneSummary<'a>>,
    skipped: Vec<String>,
}

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => run_with_config(&config),
        Err(error) => CommandResult::failure("scenes", "config_validation", error.to_string(), 2),
    }
}

pub fn run_with_config(config: &AppConfig) -> CommandResult {
    let load = SceneRegistry::load_dir(&config.scenes.dir);
    let report = ScenesReport {
        command: "scenes",
        status: if load.registry.is_empty() { "empty" } else { "ok" },
        scenes_dir: config.scenes.dir.display().to_string(),
        scene_count: load.registry.len(),
        scenes: load.registry.scenes().iter().map(summary).collect(),
        skipped: load.skipped.iter().map(ToString::to_string).collect(),
    };

    let exit_code = if load.registry.is_empty() { 1 } else { 0 };
    CommandResult::json(exit_code, &report)
}

fn summary(scene: &Scene) -> SceneSummary<'_> {
    SceneSummary {
        id: scene.id.as_str(),
        name: &scene.name,
        description: &scene.description,
        answer: match scene.answer {
            AnswerStrategy::Template(_) => "template",
            AnswerStrategy::Prompt(_) => "prompt",
            AnswerStrategy::Summary => "summary",
        },
        parameters: &scene.parameters,
    }
}
