pub mod scene;
pub mod slot;

pub use scene::{AnswerStrategy, Scene, SceneDefinition, SceneId, SlotDefinition};
pub use slot::{format_name_value, ExtractedRecord, Slot, SlotSet, SlotView};
