use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SceneDefinitionError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Schema-only view of a parameter, as declared in a scene document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(rename = "type", default = "default_slot_type")]
    pub kind: String,
}

fn default_slot_type() -> String {
    "string".to_string()
}

/// How a scene turns a fully filled slot set into the final answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerStrategy {
    /// Render a tera template locally.
    Template(String),
    /// Render a tera template and send the result to the LLM.
    Prompt(String),
    /// List the collected values.
    Summary,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    pub description: String,
    pub parameters: Vec<SlotDefinition>,
    pub example: Option<String>,
    pub instructions: Option<String>,
    pub answer: AnswerStrategy,
}

/// Raw shape of one entry in a scene configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneDefinition {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<SlotDefinition>,
    pub example: Option<Value>,
    pub prompt: Option<String>,
    pub answer_template: Option<String>,
    pub answer_prompt: Option<String>,
}

impl Scene {
    pub fn from_definition(
        id: SceneId,
        definition: SceneDefinition,
    ) -> Result<Self, SceneDefinitionError> {
        let mut seen = BTreeSet::new();
        for parameter in &definition.parameters {
            if parameter.name.trim().is_empty() {
                return Err(SceneDefinitionError::EmptyParameterName);
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(SceneDefinitionError::DuplicateParameter(parameter.name.clone()));
            }
        }

        let example = match definition.example {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text),
            Some(structured) => Some(structured.to_string()),
        };

        let answer = match (definition.answer_template, definition.answer_prompt) {
            (Some(template), _) => AnswerStrategy::Template(template),
            (None, Some(prompt)) => AnswerStrategy::Prompt(prompt),
            (None, None) => AnswerStrategy::Summary,
        };

        let name = definition
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.0.clone());

        Ok(Self {
            id,
            name,
            description: definition.description.unwrap_or_default(),
            parameters: definition.parameters,
            example,
            instructions: definition.prompt.filter(|prompt| !prompt.trim().is_empty()),
            answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AnswerStrategy, Scene, SceneDefinition, SceneId};
    use crate::errors::SceneDefinitionError;

    fn definition(value: serde_json::Value) -> SceneDefinition {
        serde_json::from_value(value).expect("definition should deserialize")
    }

    #[test]
    fn defaults_name_type_and_answer_strategy() {
        let scene = Scene::from_definition(
            SceneId::from("flight_change"),
            definition(json!({ "parameters": [{ "name": "date", "desc": "new date" }] })),
        )
        .expect("valid scene");

        assert_eq!(scene.name, "flight_change");
        assert_eq!(scene.parameters[0].kind, "string");
        assert_eq!(scene.answer, AnswerStrategy::Summary);
        assert!(scene.example.is_none());
    }

    #[test]
    fn structured_example_is_rendered_as_compact_json() {
        let scene = Scene::from_definition(
            SceneId::from("weather"),
            definition(json!({
                "parameters": [{ "name": "city", "desc": "city", "type": "string" }],
                "example": { "name": "city", "value": "Paris" }
            })),
        )
        .expect("valid scene");

        assert_eq!(scene.example.as_deref(), Some(r#"{"name":"city","value":"Paris"}"#));
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let error = Scene::from_definition(
            SceneId::from("broken"),
            definition(json!({
                "parameters": [
                    { "name": "date", "desc": "a" },
                    { "name": "date", "desc": "b" }
                ]
            })),
        )
        .expect_err("duplicate names must be rejected");

        assert_eq!(error, SceneDefinitionError::DuplicateParameter("date".to_string()));
    }

    #[test]
    fn blank_parameter_name_is_rejected() {
        let error = Scene::from_definition(
            SceneId::from("broken"),
            definition(json!({ "parameters": [{ "name": "  ", "desc": "nameless" }] })),
        )
        .expect_err("blank names must be rejected");

        assert_eq!(error, SceneDefinitionError::EmptyParameterName);
    }

    #[test]
    fn answer_template_wins_over_answer_prompt() {
        let scene = Scene::from_definition(
            SceneId::from("ticket"),
            definition(json!({
                "parameters": [],
                "answer_template": "done",
                "answer_prompt": "ask"
            })),
        )
        .expect("valid scene");

        assert_eq!(scene.answer, AnswerStrategy::Template("done".to_string()));
    }
}
