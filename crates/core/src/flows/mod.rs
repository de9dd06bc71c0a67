pub mod engine;
pub mod states;

pub use engine::{DialogueEngine, DialogueTransitionError};
pub use states::{
    DialogueAction, DialogueContext, DialogueEvent, DialogueState, TransitionOutcome,
};
