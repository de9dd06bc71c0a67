use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slotpilot_core::config::LlmConfig;
use slotpilot_core::errors::TransportError;
use tracing::{debug, warn};

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one prompt and returns the raw reply text. No retries.
    async fn complete(&self, prompt: &str) -> Result<String, TransportError>;
}

/// OpenAI-compatible `chat/completions` gateway. Works against OpenAI and Ollama.
#[derive(Clone, Debug)]
pub struct ChatCompletionsClient {
    http: Client,
    endpoint: String,
    model: String,
    system_prompt: String,
    api_key: Option<SecretString>,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;

        Ok(Self {
            http,
            endpoint: completions_endpoint(&config.base_url),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn completions_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &self.system_prompt },
                ChatMessage { role: "user", content: prompt },
            ],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        debug!(
            event_name = "llm.request_sent",
            endpoint = %self.endpoint,
            model = %self.model,
            prompt = %prompt,
            "sending prompt to llm"
        );

        let response =
            request.send().await.map_err(|error| TransportError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "llm.request_rejected",
                endpoint = %self.endpoint,
                status = %status,
                "llm endpoint returned non-success status"
            );
            return Err(TransportError::Status { status: status.as_u16(), body });
        }

        let payload: ChatResponse =
            response.json().await.map_err(|error| TransportError::Decode(error.to_string()))?;
        let reply = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(TransportError::EmptyReply)?;

        debug!(event_name = "llm.reply_received", reply = %reply, "llm reply received");
        Ok(reply)
    }
}

/// In-memory client that replays queued replies and records every prompt it was sent.
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(reply.into()));
        }
    }

    pub fn push_failure(&self, error: TransportError) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|replies| replies.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, TransportError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| TransportError::Client("scripted reply queue is poisoned".to_string()))?;
        replies
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted reply left".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use slotpilot_core::config::AppConfig;
    use slotpilot_core::errors::TransportError;

    use super::{completions_endpoint, ChatCompletionsClient, LlmClient, ScriptedLlmClient};

    #[test]
    fn endpoint_appends_chat_completions_once() {
        assert_eq!(
            completions_endpoint("http://localhost:11434/v1"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("https://proxy.local/v1/chat/completions"),
            "https://proxy.local/v1/chat/completions"
        );
    }

    #[test]
    fn client_builds_from_default_config() {
        let config = AppConfig::default();
        let client = ChatCompletionsClient::new(&config.llm).expect("client builds");
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_failure() {
        let mut config = AppConfig::default().llm;
        config.base_url = "http://127.0.0.1:1/v1".to_string();
        config.timeout_secs = 2;
        let client = ChatCompletionsClient::new(&config).expect("client builds");

        let error = client.complete("hello").await.expect_err("nothing listens on port 1");
        assert!(matches!(error, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_and_records_prompts() {
        let client = ScriptedLlmClient::new(["first", "second"]);
        client.push_failure(TransportError::EmptyReply);

        assert_eq!(client.complete("p1").await.as_deref(), Ok("first"));
        assert_eq!(client.complete("p2").await.as_deref(), Ok("second"));
        assert_eq!(client.complete("p3").await, Err(TransportError::EmptyReply));
        assert!(matches!(client.complete("p4").await, Err(TransportError::Request(_))));
        assert_eq!(client.prompts(), vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(client.remaining(), 0);
    }
}
