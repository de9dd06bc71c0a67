//! Question-answering routes.
//!
//! - `GET  /`               — demo page
//! - `POST /multi_question` — ask a question, or answer a pending missing-slot query

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use slotpilot_agent::conversation::{Conversation, TurnOutcome};
use slotpilot_agent::runtime::DialogueController;
use slotpilot_core::domain::slot::SlotView;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tracing::{info, warn};
use uuid::Uuid;

const EMBEDDED_DEMO_PAGE: &str = include_str!("../../../demo/user_input.html");

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<DialogueController>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    /// Snapshot from a previous `awaiting_user` response.
    #[serde(default)]
    pub conversation: Option<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub answer: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<SlotView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<Conversation>,
}

impl From<TurnOutcome> for QuestionResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let status = outcome.status();
        match outcome {
            TurnOutcome::Complete { answer, .. } | TurnOutcome::Failed { answer } => {
                Self { answer, status, missing: None, conversation: None }
            }
            TurnOutcome::AwaitingUser { answer, query, conversation } => Self {
                answer,
                status,
                missing: Some(query.missing),
                conversation: Some(conversation),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn router(state: AppState, demo_page: &Path) -> Router {
    let api = Router::new().route("/multi_question", post(multi_question)).with_state(state);

    let router = if demo_page.is_file() {
        api.route_service("/", ServeFile::new(demo_page))
    } else {
        api.route("/", get(embedded_demo_page))
    };

    // Browser clients on other origins may call the API.
    router.layer(CorsLayer::permissive())
}

async fn embedded_demo_page() -> Html<&'static str> {
    Html(EMBEDDED_DEMO_PAGE)
}

pub async fn multi_question(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QuestionResponse>, (StatusCode, Json<ApiError>)> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "http.multi_question.rejected",
                error = %rejection,
                "request body could not be read as a question"
            );
            QuestionRequest::default()
        }
    };

    let question = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|question| !question.is_empty())
        .ok_or_else(|| bad_request("No question provided"))?;

    let outcome = match request.conversation {
        None => state.controller.handle(question).await,
        Some(conversation) => {
            state.controller.resume(conversation, question).await.map_err(|error| {
                let interface = error.into_interface(Uuid::new_v4().to_string());
                warn!(
                    event_name = "http.multi_question.invalid_conversation",
                    correlation_id = %interface.correlation_id(),
                    error = %interface,
                    "conversation snapshot rejected"
                );
                bad_request(interface.user_message())
            })?
        }
    };

    info!(
        event_name = "http.multi_question.answered",
        status = outcome.status(),
        "question answered"
    );
    Ok(Json(QuestionResponse::from(outcome)))
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.to_string() }))
}
