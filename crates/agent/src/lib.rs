//! Dialogue runtime - LLM-backed scene selection and slot filling
//!
//! This crate turns a free-form question into either a final answer or a follow-up
//! question listing the parameters that are still missing:
//! - Picks the matching scenes (`runtime`, classification prompt)
//! - Extracts parameter values from LLM replies and merges them into slot sets
//! - Asks the user for whatever is still missing and resumes from a snapshot
//!
//! # Architecture
//!
//! Each question follows a constrained loop:
//! 1. **Scene Selection** - classify the question against the scene registry
//! 2. **Extraction** (`llm`) - prompt, send, parse JSON records, merge
//! 3. **Check** - every slot filled means answer, otherwise ask the user
//!
//! # Key Types
//!
//! - `DialogueController` - Main orchestrator (see `runtime` module)
//! - `LlmClient` - Pluggable gateway trait; `ChatCompletionsClient` speaks the
//!   OpenAI-compatible protocol used by OpenAI and Ollama
//! - `Conversation` - Resumable snapshot carried by the caller between turns
//!
//! # Safety Principle
//!
//! The LLM only proposes values. Which slots exist, when a scene is complete and
//! what gets answered are decided by the deterministic core.

pub mod conversation;
pub mod llm;
pub mod runtime;

pub use conversation::{
    Conversation, FollowUp, MissingSlotQuery, NoFollowUp, SceneProgress, ScriptedFollowUp,
    TurnOutcome,
};
pub use llm::{ChatCompletionsClient, LlmClient, ScriptedLlmClient};
pub use runtime::DialogueController;
