use thiserror::Error;
use tracing::debug;

use crate::flows::states::{
    DialogueAction, DialogueContext, DialogueEvent, DialogueState, TransitionOutcome,
};

#[derive(Clone, Debug, Default)]
pub struct DialogueEngine;

impl DialogueEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> DialogueState {
        DialogueState::SceneSelection
    }

    pub fn apply(
        &self,
        current: &DialogueState,
        event: &DialogueEvent,
        context: &DialogueContext,
    ) -> Result<TransitionOutcome, DialogueTransitionError> {
        let result = transition(current, event, context);
        match &result {
            Ok(outcome) => debug!(
                event_name = "dialogue.transition_applied",
                from = ?outcome.from,
                to = ?outcome.to,
                event = ?outcome.event,
                "dialogue transition applied"
            ),
            Err(error) => debug!(
                event_name = "dialogue.transition_rejected",
                error = %error,
                "dialogue transition rejected"
            ),
        }
        result
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueTransitionError {
    #[error("slots still missing before completing from {state:?}: {missing_slots:?}")]
    MissingSlots { state: DialogueState, missing_slots: Vec<String> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: DialogueState, event: DialogueEvent },
}

fn transition(
    current: &DialogueState,
    event: &DialogueEvent,
    context: &DialogueContext,
) -> Result<TransitionOutcome, DialogueTransitionError> {
    use DialogueAction::{
        AdvanceScene, ComposeAnswer, ExtractSlots, InitializeSlots, PromptForMissingSlots,
        RespondFailure, RespondNoScene,
    };
    use DialogueEvent::{
        NoSceneMatched, ScenesMatched, SlotsFilled, SlotsIncomplete, TransportFailed, UserReplied,
    };
    use DialogueState::{AwaitingUser, Complete, Extracting, Failed, SceneSelection};

    let (to, actions) = match (current, event) {
        (SceneSelection, ScenesMatched) => (Extracting, vec![InitializeSlots, ExtractSlots]),
        (SceneSelection, NoSceneMatched) => (Complete, vec![RespondNoScene]),
        (Extracting, SlotsFilled) => {
            if !context.missing_slots.is_empty() {
                return Err(DialogueTransitionError::MissingSlots {
                    state: current.clone(),
                    missing_slots: context.missing_slots.clone(),
                });
            }
            if context.pending_scenes > 0 {
                (Extracting, vec![AdvanceScene, ExtractSlots])
            } else {
                (Complete, vec![ComposeAnswer])
            }
        }
        (Extracting, SlotsIncomplete) => (AwaitingUser, vec![PromptForMissingSlots]),
        (AwaitingUser, UserReplied) => (Extracting, vec![ExtractSlots]),
        (Complete, _) | (Failed, _) => {
            return Err(DialogueTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
        (_, TransportFailed) => (Failed, vec![RespondFailure]),
        _ => {
            return Err(DialogueTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{DialogueEngine, DialogueTransitionError};
    use crate::flows::states::{DialogueAction, DialogueContext, DialogueEvent, DialogueState};

    #[test]
    fn single_scene_happy_path_completes() {
        let engine = DialogueEngine::new();
        let context = DialogueContext::default();

        let extracting = engine
            .apply(&engine.initial_state(), &DialogueEvent::ScenesMatched, &context)
            .expect("selection -> extracting");
        assert_eq!(extracting.to, DialogueState::Extracting);
        assert_eq!(
            extracting.actions,
            vec![DialogueAction::InitializeSlots, DialogueAction::ExtractSlots]
        );

        let complete = engine
            .apply(&extracting.to, &DialogueEvent::SlotsFilled, &context)
            .expect("extracting -> complete");
        assert_eq!(complete.to, DialogueState::Complete);
        assert_eq!(complete.actions, vec![DialogueAction::ComposeAnswer]);
        assert!(complete.to.is_terminal());
    }

    #[test]
    fn incomplete_slots_wait_for_user_then_resume_extraction() {
        let engine = DialogueEngine::default();
        let context = DialogueContext { missing_slots: vec!["seat".to_owned()], pending_scenes: 0 };

        let waiting = engine
            .apply(&DialogueState::Extracting, &DialogueEvent::SlotsIncomplete, &context)
            .expect("extracting -> awaiting user");
        assert_eq!(waiting.to, DialogueState::AwaitingUser);
        assert_eq!(waiting.actions, vec![DialogueAction::PromptForMissingSlots]);
        assert!(!waiting.to.is_terminal());

        let resumed = engine
            .apply(&waiting.to, &DialogueEvent::UserReplied, &context)
            .expect("awaiting user -> extracting");
        assert_eq!(resumed.to, DialogueState::Extracting);
    }

    #[test]
    fn filled_scene_with_pending_scenes_advances_focus() {
        let engine = DialogueEngine::default();
        let outcome = engine
            .apply(
                &DialogueState::Extracting,
                &DialogueEvent::SlotsFilled,
                &DialogueContext { missing_slots: Vec::new(), pending_scenes: 1 },
            )
            .expect("advance to next scene");

        assert_eq!(outcome.to, DialogueState::Extracting);
        assert_eq!(outcome.actions, vec![DialogueAction::AdvanceScene, DialogueAction::ExtractSlots]);
    }

    #[test]
    fn completing_with_missing_slots_is_rejected() {
        let engine = DialogueEngine::default();
        let error = engine
            .apply(
                &DialogueState::Extracting,
                &DialogueEvent::SlotsFilled,
                &DialogueContext { missing_slots: vec!["date".to_owned()], pending_scenes: 0 },
            )
            .expect_err("must reject missing slots");

        assert!(matches!(error, DialogueTransitionError::MissingSlots { .. }));
    }

    #[test]
    fn transport_failure_fails_any_live_state() {
        let engine = DialogueEngine::default();
        for state in
            [DialogueState::SceneSelection, DialogueState::Extracting, DialogueState::AwaitingUser]
        {
            let outcome = engine
                .apply(&state, &DialogueEvent::TransportFailed, &DialogueContext::default())
                .expect("live state -> failed");
            assert_eq!(outcome.to, DialogueState::Failed);
            assert_eq!(outcome.actions, vec![DialogueAction::RespondFailure]);
        }
    }

    #[test]
    fn terminal_states_reject_further_events() {
        let engine = DialogueEngine::default();
        for state in [DialogueState::Complete, DialogueState::Failed] {
            let error = engine
                .apply(&state, &DialogueEvent::UserReplied, &DialogueContext::default())
                .expect_err("terminal states are final");
            assert!(matches!(error, DialogueTransitionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn no_match_completes_without_extraction() {
        let engine = DialogueEngine::default();
        let outcome = engine
            .apply(
                &DialogueState::SceneSelection,
                &DialogueEvent::NoSceneMatched,
                &DialogueContext::default(),
            )
            .expect("selection -> complete");
        assert_eq!(outcome.to, DialogueState::Complete);
        assert_eq!(outcome.actions, vec![DialogueAction::RespondNoScene]);
    }

    #[test]
    fn user_reply_outside_awaiting_state_is_invalid() {
        let engine = DialogueEngine::default();
        let error = engine
            .apply(
                &DialogueState::SceneSelection,
                &DialogueEvent::UserReplied,
                &DialogueContext::default(),
            )
            .expect_err("no reply expected during selection");

        assert!(matches!(
            error,
            DialogueTransitionError::InvalidTransition {
                state: DialogueState::SceneSelection,
                event: DialogueEvent::UserReplied
            }
        ));
    }
}
