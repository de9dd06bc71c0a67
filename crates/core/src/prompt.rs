use serde::Serialize;
use tera::{Context, Tera};

use crate::domain::scene::Scene;
use crate::domain::slot::SlotSet;
use crate::errors::PromptError;
use crate::registry::SceneRegistry;

const EXTRACTION_TEMPLATE: &str = "extraction.txt";
const CLASSIFICATION_TEMPLATE: &str = "classification.txt";

pub const DEFAULT_INSTRUCTIONS: &str = "You are a parameter extraction assistant. Read the user \
input and fill in the parameters listed below. Only use information the user actually gave and \
leave every other value empty. Keep values that are already filled unless the user changes them.";

/// Used when a scene ships no example of its own.
pub const FALLBACK_EXAMPLE: &str = r#"Answer: {"name":"xx","value":"xx"}"#;

// The reply format requested here is what `interpreter` parses.
const EXTRACTION_BODY: &str = r#"{{ instructions }}

Scene: {{ scene_name }}
Parameters (JSON; an empty value means not provided yet):
{{ slots_json }}

Reply with one JSON object per parameter you can fill, shaped like the example below.
Example:
{{ example }}

User input: {{ user_input }}"#;

const CLASSIFICATION_BODY: &str = r#"Decide which of the following scenes the user's question belongs to. A question may belong to more than one scene.

Scenes:
{% for scene in scenes -%}
- {{ scene.id }}: {{ scene.name }}{% if scene.description %} - {{ scene.description }}{% endif %}
{% endfor %}
Answer only with JSON, for example: {"scenes": ["scene_id"]}. Answer {"scenes": []} if no scene applies.

Question: {{ question }}"#;

#[derive(Serialize)]
struct SceneSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (EXTRACTION_TEMPLATE, EXTRACTION_BODY),
            (CLASSIFICATION_TEMPLATE, CLASSIFICATION_BODY),
        ])
        .map_err(|error| template_error("builtin", error))?;
        Ok(Self { tera })
    }

    /// Extraction prompt for `scene` given the current slot state and the latest user input.
    pub fn build(
        &self,
        scene: &Scene,
        slots: &SlotSet,
        user_input: &str,
    ) -> Result<String, PromptError> {
        let slots_json = serde_json::to_string(slots.slots())
            .map_err(|error| template_error(EXTRACTION_TEMPLATE, error))?;

        let mut context = Context::new();
        context.insert("instructions", scene.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS));
        context.insert("scene_name", &scene.name);
        context.insert("slots_json", &slots_json);
        context.insert("example", scene.example.as_deref().unwrap_or(FALLBACK_EXAMPLE));
        context.insert("user_input", user_input);

        self.tera
            .render(EXTRACTION_TEMPLATE, &context)
            .map_err(|error| template_error(EXTRACTION_TEMPLATE, error))
    }

    pub fn build_classification(
        &self,
        registry: &SceneRegistry,
        question: &str,
    ) -> Result<String, PromptError> {
        let scenes = registry
            .scenes()
            .iter()
            .map(|scene| SceneSummary {
                id: scene.id.as_str(),
                name: &scene.name,
                description: &scene.description,
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("scenes", &scenes);
        context.insert("question", question);

        self.tera
            .render(CLASSIFICATION_TEMPLATE, &context)
            .map_err(|error| template_error(CLASSIFICATION_TEMPLATE, error))
    }

    /// Renders a scene-supplied answer template against the filled slots.
    ///
    /// Available variables: `scene_id`, `scene_name`, `slots` (list of name/desc/value) and
    /// `values` (map of name to value).
    pub fn render_answer(
        &self,
        scene: &Scene,
        slots: &SlotSet,
        template: &str,
    ) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("scene_id", scene.id.as_str());
        context.insert("scene_name", &scene.name);
        context.insert("slots", &slots.update_view());
        context.insert("values", &slots.values());

        Tera::one_off(template, &context, false)
            .map_err(|error| template_error(scene.id.as_str(), error))
    }
}

fn template_error(template: &str, error: impl std::fmt::Display) -> PromptError {
    PromptError::Template { template: template.to_string(), message: error.to_string() }
}
