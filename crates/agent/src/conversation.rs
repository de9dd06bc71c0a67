use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotpilot_core::domain::scene::{Scene, SceneId};
use slotpilot_core::domain::slot::{SlotSet, SlotView};

/// Slot state for one matched scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneProgress {
    pub scene_id: SceneId,
    pub slots: SlotSet,
}

impl SceneProgress {
    pub fn fresh(scene: &Scene) -> Self {
        Self { scene_id: scene.id.clone(), slots: SlotSet::from_definitions(&scene.parameters) }
    }
}

/// Resumable snapshot of a conversation waiting on the user.
///
/// The controller keeps no sessions; callers hand this back with the next user message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub question: String,
    pub scenes: Vec<SceneProgress>,
    /// Index of the first scene that is not fully filled.
    #[serde(default)]
    pub focus: usize,
    /// User replies consumed so far, across calls.
    #[serde(default)]
    pub user_turns: u32,
}

impl Conversation {
    pub fn new(question: impl Into<String>, scenes: Vec<SceneProgress>) -> Self {
        Self { question: question.into(), scenes, focus: 0, user_turns: 0 }
    }

    pub fn focused(&self) -> Option<&SceneProgress> {
        self.scenes.get(self.focus)
    }

    pub fn focused_mut(&mut self) -> Option<&mut SceneProgress> {
        self.scenes.get_mut(self.focus)
    }

    /// Scenes queued behind the focused one.
    pub fn pending_scenes(&self) -> usize {
        self.scenes.len().saturating_sub(self.focus + 1)
    }

    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.scenes.iter().map(|progress| progress.scene_id.clone()).collect()
    }
}

/// What the user still has to provide for the focused scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSlotQuery {
    pub scene_id: SceneId,
    pub scene_name: String,
    pub missing: Vec<SlotView>,
}

impl MissingSlotQuery {
    pub fn for_scene(scene: &Scene, slots: &SlotSet) -> Self {
        Self {
            scene_id: scene.id.clone(),
            scene_name: scene.name.clone(),
            missing: slots.missing_view(),
        }
    }

    pub fn prompt_text(&self) -> String {
        let mut text = format!("To continue with {}, please provide:", self.scene_name);
        for slot in &self.missing {
            if slot.desc.is_empty() {
                text.push_str(&format!("\n- {}", slot.name));
            } else {
                text.push_str(&format!("\n- {}: {}", slot.name, slot.desc));
            }
        }
        text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Complete { answer: String, scenes: Vec<SceneId> },
    AwaitingUser { answer: String, query: MissingSlotQuery, conversation: Conversation },
    Failed { answer: String },
}

impl TurnOutcome {
    pub fn answer(&self) -> &str {
        match self {
            Self::Complete { answer, .. }
            | Self::AwaitingUser { answer, .. }
            | Self::Failed { answer } => answer,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Complete { .. } => "complete",
            Self::AwaitingUser { .. } => "awaiting_user",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingUser { .. })
    }
}

/// Source of further user replies while a single call is still running.
#[async_trait]
pub trait FollowUp: Send + Sync {
    /// `None` ends the call with the missing-slot query.
    async fn next_reply(&self, query: &MissingSlotQuery) -> Option<String>;
}

/// Never supplies a reply; every incomplete scene ends the call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFollowUp;

#[async_trait]
impl FollowUp for NoFollowUp {
    async fn next_reply(&self, _query: &MissingSlotQuery) -> Option<String> {
        None
    }
}

/// Replays canned user replies and records the queries it was asked.
#[derive(Debug, Default)]
pub struct ScriptedFollowUp {
    replies: Mutex<VecDeque<String>>,
    queries: Mutex<Vec<MissingSlotQuery>>,
}

impl ScriptedFollowUp {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<MissingSlotQuery> {
        self.queries.lock().map(|queries| queries.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FollowUp for ScriptedFollowUp {
    async fn next_reply(&self, query: &MissingSlotQuery) -> Option<String> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        self.replies.lock().ok().and_then(|mut replies| replies.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use slotpilot_core::domain::scene::{Scene, SceneDefinition, SceneId};
    use slotpilot_core::domain::slot::ExtractedRecord;

    use super::{Conversation, MissingSlotQuery, SceneProgress, TurnOutcome};

    fn flight_change() -> Scene {
        let definition: SceneDefinition = serde_json::from_value(json!({
            "name": "Flight change",
            "parameters": [
                { "name": "date", "desc": "new departure date", "type": "date" },
                { "name": "seat", "desc": "preferred seat" },
                { "name": "note" }
            ]
        }))
        .expect("definition");
        Scene::from_definition(SceneId::from("flight_change"), definition).expect("scene")
    }

    #[test]
    fn missing_query_lists_unfilled_slots_in_schema_order() {
        let scene = flight_change();
        let mut progress = SceneProgress::fresh(&scene);
        progress.slots.merge(&[ExtractedRecord::new("seat", "12A")]);

        let query = MissingSlotQuery::for_scene(&scene, &progress.slots);
        let names = query.missing.iter().map(|slot| slot.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["date", "note"]);
        assert_eq!(
            query.prompt_text(),
            "To continue with Flight change, please provide:\n- date: new departure date\n- note"
        );
    }

    #[test]
    fn snapshot_survives_json_round_trip() {
        let scene = flight_change();
        let mut progress = SceneProgress::fresh(&scene);
        progress.slots.merge(&[ExtractedRecord::new("date", "2024-05-01")]);
        let conversation = Conversation::new("change my flight", vec![progress]);

        let encoded = serde_json::to_value(&conversation).expect("encode");
        assert_eq!(encoded["scenes"][0]["scene_id"], "flight_change");
        assert_eq!(encoded["scenes"][0]["slots"][0]["value"], "2024-05-01");

        let decoded: Conversation = serde_json::from_value(encoded).expect("decode");
        assert_eq!(decoded, conversation);
        assert_eq!(decoded.pending_scenes(), 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = TurnOutcome::Failed { answer: "nope".to_string() };
        let encoded = serde_json::to_value(&outcome).expect("encode");
        assert_eq!(encoded, json!({ "status": "failed", "answer": "nope" }));
        assert_eq!(outcome.status(), "failed");
        assert!(outcome.is_terminal());
    }
}
