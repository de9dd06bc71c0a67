pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod interpreter;
pub mod prompt;
pub mod registry;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use domain::{
    format_name_value, AnswerStrategy, ExtractedRecord, Scene, SceneDefinition, SceneId, Slot,
    SlotDefinition, SlotSet, SlotView,
};
pub use errors::{
    DialogueError, InterfaceError, PromptError, SceneDefinitionError, SceneLoadError,
    TransportError,
};
pub use flows::{
    DialogueAction, DialogueContext, DialogueEngine, DialogueEvent, DialogueState,
    DialogueTransitionError, TransitionOutcome,
};
pub use interpreter::{extract_json_objects, extract_records};
pub use prompt::PromptBuilder;
pub use registry::{RegistryLoad, SceneRegistry, SceneSource};
