use std::sync::Mutex;

use async_trait::async_trait;
use slotpilot_agent::conversation::{Conversation, FollowUp, MissingSlotQuery, TurnOutcome};
use slotpilot_agent::runtime::DialogueController;
use slotpilot_core::config::{AppConfig, LoadOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::commands::{controller_from_config, CommandResult};

/// Line-oriented terminal session. Also answers missing-slot queries from the same input.
pub struct ChatIo<R> {
    lines: tokio::sync::Mutex<Lines<R>>,
    transcript: Mutex<Vec<String>>,
    echo: bool,
}

impl<R> ChatIo<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, echo: bool) -> Self {
        Self {
            lines: tokio::sync::Mutex::new(reader.lines()),
            transcript: Mutex::new(Vec::new()),
            echo,
        }
    }

    /// Next trimmed input line; `None` at end of input.
    pub async fn read_line(&self) -> Option<String> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(line) => line.map(|line| line.trim().to_string()),
            Err(_) => None,
        }
    }

    pub fn say(&self, text: &str) {
        if self.echo {
            println!("{text}");
        }
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(text.to_string());
        }
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().map(|transcript| transcript.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl<R> FollowUp for ChatIo<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_reply(&self, query: &MissingSlotQuery) -> Option<String> {
        self.say(&query.prompt_text());
        loop {
            let line = self.read_line().await?;
            if !line.is_empty() {
                return Some(line);
            }
        }
    }
}

/// Answers questions until the input ends. Returns the number of questions handled.
///
/// A conversation still waiting on details is resumed with the next line.
pub async fn converse<R>(controller: &DialogueController, io: &ChatIo<R>) -> usize
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut handled = 0;
    let mut pending: Option<Conversation> = None;
    while let Some(line) = io.read_line().await {
        if line.is_empty() {
            continue;
        }
        handled += 1;

        let outcome = match pending.take() {
            None => controller.handle_with(&line, io).await,
            Some(conversation) => match controller.resume_with(conversation, &line, io).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    io.say(error.user_message());
                    continue;
                }
            },
        };

        io.say(outcome.answer());
        if let TurnOutcome::AwaitingUser { conversation, .. } = outcome {
            io.say("(reply with the missing details to continue)");
            pending = Some(conversation);
        }
    }
    handled
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2)
        }
    };

    let controller = match controller_from_config(&config) {
        Ok(controller) => controller,
        Err(error) => return CommandResult::failure("chat", "bootstrap", format!("{error:#}"), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    println!(
        "slotpilot chat: {} scenes loaded. Type a question, end input to quit.",
        controller.registry().len()
    );
    let io = ChatIo::new(BufReader::new(tokio::io::stdin()), true);
    let handled = runtime.block_on(converse(&controller, &io));

    CommandResult::success("chat", format!("chat ended after {handled} questions"))
}
