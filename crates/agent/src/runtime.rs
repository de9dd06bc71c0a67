use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use slotpilot_core::config::DialogueConfig;
use slotpilot_core::domain::scene::{AnswerStrategy, Scene};
use slotpilot_core::domain::slot::{format_name_value, ExtractedRecord, SlotSet};
use slotpilot_core::errors::{DialogueError, PromptError};
use slotpilot_core::flows::{DialogueContext, DialogueEngine, DialogueEvent, DialogueState};
use slotpilot_core::interpreter::{extract_json_objects, extract_records};
use slotpilot_core::prompt::PromptBuilder;
use slotpilot_core::registry::SceneRegistry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversation::{
    Conversation, FollowUp, MissingSlotQuery, NoFollowUp, SceneProgress, TurnOutcome,
};
use crate::llm::LlmClient;

/// Drives one question through scene selection and slot extraction.
///
/// Every path ends in a [`TurnOutcome`]; gateway and internal failures become
/// [`TurnOutcome::Failed`] with a user-safe answer.
pub struct DialogueController {
    registry: Arc<SceneRegistry>,
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
    engine: DialogueEngine,
    max_user_turns: u32,
}

impl DialogueController {
    pub fn new(
        registry: Arc<SceneRegistry>,
        llm: Arc<dyn LlmClient>,
        dialogue: &DialogueConfig,
    ) -> Result<Self, PromptError> {
        Ok(Self {
            registry,
            llm,
            prompts: PromptBuilder::new()?,
            engine: DialogueEngine::new(),
            max_user_turns: dialogue.max_user_turns,
        })
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub async fn handle(&self, question: &str) -> TurnOutcome {
        self.handle_with(question, &NoFollowUp).await
    }

    /// Like [`handle`](Self::handle), but asks `follow_up` for more input while a scene is
    /// incomplete, up to the configured user-turn budget.
    pub async fn handle_with(&self, question: &str, follow_up: &dyn FollowUp) -> TurnOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "dialogue.question_received",
            correlation_id = %correlation_id,
            question_len = question.len(),
            "dialogue question received"
        );

        let mut state = self.engine.initial_state();
        match self.start(question, follow_up, &correlation_id, &mut state).await {
            Ok(outcome) => outcome,
            Err(error) => self.fail(&state, error, &correlation_id),
        }
    }

    pub async fn resume(
        &self,
        conversation: Conversation,
        reply: &str,
    ) -> Result<TurnOutcome, DialogueError> {
        self.resume_with(conversation, reply, &NoFollowUp).await
    }

    /// Continues a conversation snapshot returned with an earlier `AwaitingUser` outcome.
    ///
    /// Only an unusable snapshot is an error. Slot values are re-validated against the current
    /// scene schema before extraction continues.
    pub async fn resume_with(
        &self,
        conversation: Conversation,
        reply: &str,
        follow_up: &dyn FollowUp,
    ) -> Result<TurnOutcome, DialogueError> {
        let correlation_id = Uuid::new_v4().to_string();
        let mut conversation = self.restore(conversation)?;
        conversation.user_turns = conversation.user_turns.saturating_add(1);

        info!(
            event_name = "dialogue.conversation_resumed",
            correlation_id = %correlation_id,
            scene_count = conversation.scenes.len(),
            user_turns = conversation.user_turns,
            "resuming conversation snapshot"
        );

        let mut state = DialogueState::AwaitingUser;
        let outcome = match self
            .continue_reply(conversation, reply, follow_up, &correlation_id, &mut state)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => self.fail(&state, error, &correlation_id),
        };
        Ok(outcome)
    }

    async fn start(
        &self,
        question: &str,
        follow_up: &dyn FollowUp,
        correlation_id: &str,
        state: &mut DialogueState,
    ) -> Result<TurnOutcome, DialogueError> {
        let selected = self.select_scenes(question, correlation_id).await?;

        if selected.is_empty() {
            self.step(state, DialogueEvent::NoSceneMatched, &DialogueContext::default())?;
            info!(
                event_name = "dialogue.no_scene_matched",
                correlation_id = %correlation_id,
                "no scene matched the question"
            );
            return Ok(TurnOutcome::Complete { answer: self.no_scene_answer(), scenes: Vec::new() });
        }

        let context =
            DialogueContext { missing_slots: Vec::new(), pending_scenes: selected.len() - 1 };
        self.step(state, DialogueEvent::ScenesMatched, &context)?;

        info!(
            event_name = "dialogue.scenes_selected",
            correlation_id = %correlation_id,
            scenes = ?selected.iter().map(|scene| scene.id.as_str()).collect::<Vec<_>>(),
            "scenes selected"
        );

        let conversation =
            Conversation::new(question, selected.into_iter().map(SceneProgress::fresh).collect());
        self.drive(conversation, question.to_string(), follow_up, correlation_id, state).await
    }

    async fn continue_reply(
        &self,
        conversation: Conversation,
        reply: &str,
        follow_up: &dyn FollowUp,
        correlation_id: &str,
        state: &mut DialogueState,
    ) -> Result<TurnOutcome, DialogueError> {
        self.step(state, DialogueEvent::UserReplied, &DialogueContext::default())?;
        self.drive(conversation, reply.to_string(), follow_up, correlation_id, state).await
    }

    /// Extract, merge and check until every scene is filled or the user has to answer.
    async fn drive(
        &self,
        mut conversation: Conversation,
        mut input: String,
        follow_up: &dyn FollowUp,
        correlation_id: &str,
        state: &mut DialogueState,
    ) -> Result<TurnOutcome, DialogueError> {
        let mut replies_used = 0_u32;

        loop {
            let scene = self.focused_scene(&conversation)?;
            if let Some(progress) = conversation.focused_mut() {
                if !progress.slots.is_fully_filled() {
                    self.extract(scene, &mut progress.slots, &input, correlation_id).await?;
                }
            }

            let pending_scenes = conversation.pending_scenes();
            let slots = match conversation.focused() {
                Some(progress) => &progress.slots,
                None => return Err(no_focus()),
            };

            if slots.is_fully_filled() {
                let context = DialogueContext { missing_slots: Vec::new(), pending_scenes };
                if pending_scenes == 0 {
                    let answer = self.compose_answer(&conversation, correlation_id).await?;
                    self.step(state, DialogueEvent::SlotsFilled, &context)?;
                    info!(
                        event_name = "dialogue.completed",
                        correlation_id = %correlation_id,
                        scene_count = conversation.scenes.len(),
                        user_turns = conversation.user_turns,
                        "all scenes filled"
                    );
                    return Ok(TurnOutcome::Complete {
                        answer,
                        scenes: conversation.scene_ids(),
                    });
                }

                self.step(state, DialogueEvent::SlotsFilled, &context)?;
                conversation.focus += 1;
                input = conversation.question.clone();
                continue;
            }

            let query = MissingSlotQuery::for_scene(scene, slots);
            let context = DialogueContext { missing_slots: slots.missing_names(), pending_scenes };
            self.step(state, DialogueEvent::SlotsIncomplete, &context)?;

            if replies_used < self.max_user_turns {
                if let Some(reply) = follow_up.next_reply(&query).await {
                    replies_used += 1;
                    conversation.user_turns = conversation.user_turns.saturating_add(1);
                    self.step(state, DialogueEvent::UserReplied, &DialogueContext::default())?;
                    input = reply;
                    continue;
                }
            }

            info!(
                event_name = "dialogue.awaiting_user",
                correlation_id = %correlation_id,
                scene_id = %query.scene_id,
                missing = ?context.missing_slots,
                "scene incomplete, asking the user"
            );
            return Ok(TurnOutcome::AwaitingUser {
                answer: query.prompt_text(),
                query,
                conversation,
            });
        }
    }

    async fn extract(
        &self,
        scene: &Scene,
        slots: &mut SlotSet,
        input: &str,
        correlation_id: &str,
    ) -> Result<(), DialogueError> {
        let prompt = self.prompts.build(scene, slots, input)?;
        let reply = self.llm.complete(&prompt).await?;
        let records = extract_records(&reply);
        let changed = slots.merge(&records);

        debug!(
            event_name = "dialogue.records_extracted",
            correlation_id = %correlation_id,
            scene_id = %scene.id,
            records = %format_name_value(
                records.iter().map(|record| (record.name.as_str(), record.value.as_str()))
            ),
            "records extracted from llm reply"
        );
        info!(
            event_name = "dialogue.slots_merged",
            correlation_id = %correlation_id,
            scene_id = %scene.id,
            record_count = records.len(),
            changed,
            filled = slots.filled_count(),
            total = slots.len(),
            "slots merged"
        );
        Ok(())
    }

    async fn select_scenes(
        &self,
        question: &str,
        correlation_id: &str,
    ) -> Result<Vec<&Scene>, DialogueError> {
        match self.registry.scenes() {
            [] => return Ok(Vec::new()),
            [only] => return Ok(vec![only]),
            _ => {}
        }

        let prompt = self.prompts.build_classification(&self.registry, question)?;
        let reply = self.llm.complete(&prompt).await?;
        let selected = match_scene_ids(&self.registry, &reply);

        debug!(
            event_name = "dialogue.classification_parsed",
            correlation_id = %correlation_id,
            reply = %reply,
            matched = selected.len(),
            "classification reply parsed"
        );
        Ok(selected)
    }

    async fn compose_answer(
        &self,
        conversation: &Conversation,
        correlation_id: &str,
    ) -> Result<String, DialogueError> {
        let mut answers = Vec::with_capacity(conversation.scenes.len());
        for progress in &conversation.scenes {
            let scene = self
                .registry
                .get(&progress.scene_id)
                .ok_or_else(|| DialogueError::UnknownScene(progress.scene_id.clone()))?;
            answers.push(self.scene_answer(scene, &progress.slots, correlation_id).await?);
        }
        Ok(answers.join("\n\n"))
    }

    async fn scene_answer(
        &self,
        scene: &Scene,
        slots: &SlotSet,
        correlation_id: &str,
    ) -> Result<String, DialogueError> {
        let template = match &scene.answer {
            AnswerStrategy::Summary => return Ok(summary_answer(scene, slots)),
            AnswerStrategy::Template(template) | AnswerStrategy::Prompt(template) => template,
        };

        let rendered = match self.prompts.render_answer(scene, slots, template) {
            Ok(rendered) => rendered,
            Err(error) => {
                warn!(
                    event_name = "dialogue.answer_template_failed",
                    correlation_id = %correlation_id,
                    scene_id = %scene.id,
                    error = %error,
                    "answer template failed, falling back to summary"
                );
                return Ok(summary_answer(scene, slots));
            }
        };

        match scene.answer {
            AnswerStrategy::Prompt(_) => {
                let reply = self.llm.complete(&rendered).await?;
                Ok(reply.trim().to_string())
            }
            _ => Ok(rendered),
        }
    }

    /// Rebuilds slot sets from the registered schema and carries over snapshot values.
    fn restore(&self, snapshot: Conversation) -> Result<Conversation, DialogueError> {
        if snapshot.scenes.is_empty() {
            return Err(DialogueError::InvalidSnapshot("conversation has no scenes".to_string()));
        }

        let mut seen = BTreeSet::new();
        let mut scenes = Vec::with_capacity(snapshot.scenes.len());
        for progress in snapshot.scenes {
            let scene = self
                .registry
                .get(&progress.scene_id)
                .ok_or_else(|| DialogueError::UnknownScene(progress.scene_id.clone()))?;
            if !seen.insert(scene.id.clone()) {
                return Err(DialogueError::InvalidSnapshot(format!(
                    "scene `{}` appears more than once",
                    scene.id
                )));
            }

            let carried = progress
                .slots
                .slots()
                .iter()
                .map(|slot| ExtractedRecord::new(slot.name.clone(), slot.value.clone()))
                .collect::<Vec<_>>();
            let mut fresh = SceneProgress::fresh(scene);
            fresh.slots.merge(&carried);
            scenes.push(fresh);
        }

        let focus = scenes
            .iter()
            .position(|progress| !progress.slots.is_fully_filled())
            .unwrap_or(scenes.len() - 1);

        Ok(Conversation {
            question: snapshot.question,
            scenes,
            focus,
            user_turns: snapshot.user_turns,
        })
    }

    fn focused_scene(&self, conversation: &Conversation) -> Result<&Scene, DialogueError> {
        let progress = conversation.focused().ok_or_else(no_focus)?;
        self.registry
            .get(&progress.scene_id)
            .ok_or_else(|| DialogueError::UnknownScene(progress.scene_id.clone()))
    }

    fn step(
        &self,
        state: &mut DialogueState,
        event: DialogueEvent,
        context: &DialogueContext,
    ) -> Result<(), DialogueError> {
        let outcome = self.engine.apply(state, &event, context)?;
        *state = outcome.to;
        Ok(())
    }

    fn fail(&self, state: &DialogueState, error: DialogueError, correlation_id: &str) -> TurnOutcome {
        if let Err(rejected) =
            self.engine.apply(state, &DialogueEvent::TransportFailed, &DialogueContext::default())
        {
            debug!(
                event_name = "dialogue.failure_transition_rejected",
                correlation_id = %correlation_id,
                error = %rejected,
                "failure raised outside a live state"
            );
        }

        warn!(
            event_name = "dialogue.turn_failed",
            correlation_id = %correlation_id,
            state = ?state,
            error = %error,
            "dialogue turn failed"
        );
        TurnOutcome::Failed { answer: error.user_message().to_string() }
    }

    fn no_scene_answer(&self) -> String {
        if self.registry.is_empty() {
            return "Sorry, no tasks are configured yet.".to_string();
        }
        let available = self
            .registry
            .scenes()
            .iter()
            .map(|scene| scene.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Sorry, I could not match your question to a supported task. I can help with: {available}.")
    }
}

fn no_focus() -> DialogueError {
    DialogueError::InvalidSnapshot("no scene in focus".to_string())
}

fn summary_answer(scene: &Scene, slots: &SlotSet) -> String {
    if slots.is_empty() {
        return scene.name.clone();
    }
    let lines =
        format_name_value(slots.slots().iter().map(|slot| (slot.name.as_str(), slot.value.as_str())));
    format!("{}\n{}", scene.name, lines)
}

/// Scene ids named by a classification reply, in registry order.
///
/// Reads `scenes` arrays, then `scene` or `name` strings. Only a reply without any of those
/// keys is scanned for registered ids.
fn match_scene_ids<'a>(registry: &'a SceneRegistry, reply: &str) -> Vec<&'a Scene> {
    let mut named = BTreeSet::new();
    let mut answered = false;
    for object in extract_json_objects(reply) {
        if let Some(Value::Array(items)) = object.get("scenes") {
            answered = true;
            named.extend(items.iter().filter_map(Value::as_str).map(|id| id.trim().to_string()));
        } else if let Some(Value::String(id)) = object.get("scene").or_else(|| object.get("name")) {
            answered = true;
            named.insert(id.trim().to_string());
        }
    }

    if answered {
        return registry
            .scenes()
            .iter()
            .filter(|scene| named.contains(scene.id.as_str()))
            .collect();
    }

    registry.scenes().iter().filter(|scene| reply.contains(scene.id.as_str())).collect()
}
