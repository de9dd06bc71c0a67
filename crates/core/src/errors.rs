use std::path::PathBuf;

use thiserror::Error;

use crate::domain::scene::SceneId;
use crate::flows::DialogueTransitionError;

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("could not read scene file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse scene document `{origin}`: {source}")]
    ParseJson { origin: String, source: serde_json::Error },
    #[error("scene document `{origin}` must be a JSON object keyed by scene id")]
    NotAnObject { origin: String },
    #[error("scene `{scene_id}` in `{origin}` is invalid: {source}")]
    InvalidDefinition { origin: String, scene_id: String, source: SceneDefinitionError },
    #[error("could not walk scene directory `{path}`: {message}")]
    Discovery { path: PathBuf, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SceneDefinitionError {
    #[error("definition does not match the scene schema: {0}")]
    Malformed(String),
    #[error("parameter with empty name")]
    EmptyParameterName,
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("llm client could not be built: {0}")]
    Client(String),
    #[error("llm request failed: {0}")]
    Request(String),
    #[error("llm endpoint returned status {status}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response contained no message content")]
    EmptyReply,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("prompt template `{template}` failed: {message}")]
    Template { template: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    FlowTransition(#[from] DialogueTransitionError),
    #[error("scene `{0}` is not registered")]
    UnknownScene(SceneId),
    #[error("conversation snapshot is invalid: {0}")]
    InvalidSnapshot(String),
}

impl DialogueError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => {
                "Sorry, I could not process your request right now. Please try again later."
            }
            Self::Prompt(_)
            | Self::FlowTransition(_)
            | Self::UnknownScene(_)
            | Self::InvalidSnapshot(_) => "Sorry, something went wrong while handling your request.",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::UnknownScene(_) | Self::InvalidSnapshot(_) => {
                InterfaceError::BadRequest { message: self.to_string(), correlation_id }
            }
            Self::Transport(error) => {
                InterfaceError::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            Self::Prompt(_) | Self::FlowTransition(_) => {
                InterfaceError::Internal { message: self.to_string(), correlation_id }
            }
        }
    }
}

/// Errors surfaced to HTTP and CLI callers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::scene::SceneId;
    use crate::errors::{DialogueError, InterfaceError, TransportError};
    use crate::flows::{DialogueEvent, DialogueState, DialogueTransitionError};

    #[test]
    fn transport_failure_has_retry_later_message() {
        let error = DialogueError::from(TransportError::Status { status: 502, body: String::new() });
        assert!(error.user_message().contains("try again later"));
        assert_eq!(error.to_string(), "llm endpoint returned status 502");
    }

    #[test]
    fn internal_failures_share_a_generic_message() {
        let unknown = DialogueError::UnknownScene(SceneId::from("gone"));
        let transition = DialogueError::from(DialogueTransitionError::InvalidTransition {
            state: DialogueState::Complete,
            event: DialogueEvent::UserReplied,
        });

        assert_eq!(unknown.user_message(), transition.user_message());
        assert!(unknown.to_string().contains("gone"));
    }

    #[test]
    fn snapshot_problems_map_to_bad_request() {
        let mapped = DialogueError::UnknownScene(SceneId::from("gone")).into_interface("req-1");
        assert!(matches!(mapped, InterfaceError::BadRequest { .. }));
        assert_eq!(mapped.correlation_id(), "req-1");

        let transport = DialogueError::from(TransportError::EmptyReply).into_interface("req-2");
        assert!(matches!(transport, InterfaceError::ServiceUnavailable { .. }));
        assert!(transport.user_message().contains("retry"));
    }
}
