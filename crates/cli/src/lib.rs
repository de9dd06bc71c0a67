pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "slotpilot",
    about = "slotpilot operator CLI",
    long_about = "Inspect configuration and scenes, check readiness, and talk to the slot-filling dialogue runtime.",
    after_help = "Examples:\n  slotpilot doctor --json\n  slotpilot scenes\n  slotpilot ask \"I want to change my flight\"\n  slotpilot chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM gateway settings, and the scene directory")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List loaded scenes and their parameters")]
    Scenes,
    #[command(about = "Ask one question and print the structured outcome")]
    Ask {
        question: String,
        #[arg(long, help = "Conversation snapshot JSON from an earlier awaiting_user outcome")]
        conversation: Option<String>,
    },
    #[command(about = "Interactive session on stdin/stdout")]
    Chat,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Scenes => commands::scenes::run(),
        Command::Ask { question, conversation } => {
            commands::ask::run(&question, conversation.as_deref())
        }
        Command::Chat => commands::chat::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
