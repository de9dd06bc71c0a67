use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueState {
    SceneSelection,
    Extracting,
    AwaitingUser,
    Complete,
    Failed,
}

impl DialogueState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    ScenesMatched,
    NoSceneMatched,
    SlotsFilled,
    SlotsIncomplete,
    UserReplied,
    TransportFailed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DialogueContext {
    pub missing_slots: Vec<String>,
    /// Matched scenes after the focused one that still need extraction.
    pub pending_scenes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueAction {
    InitializeSlots,
    ExtractSlots,
    AdvanceScene,
    PromptForMissingSlots,
    ComposeAnswer,
    RespondNoScene,
    RespondFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogueState,
    pub to: DialogueState,
    pub event: DialogueEvent,
    pub actions: Vec<DialogueAction>,
}
