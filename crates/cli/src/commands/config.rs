use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use slotpilot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let llm_api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let fields: [(&str, String, &[&str]); 13] = [
        ("llm.provider", format!("{:?}", config.llm.provider), &["SLOTPILOT_LLM_PROVIDER"]),
        ("llm.api_key", llm_api_key, &["SLOTPILOT_LLM_API_KEY"]),
        ("llm.base_url", config.llm.base_url.clone(), &["SLOTPILOT_LLM_BASE_URL"]),
        ("llm.model", config.llm.model.clone(), &["SLOTPILOT_LLM_MODEL"]),
        (
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["SLOTPILOT_LLM_TIMEOUT_SECS"],
        ),
        (
            "llm.system_prompt",
            summarize(&config.llm.system_prompt),
            &["SLOTPILOT_LLM_SYSTEM_PROMPT"],
        ),
        ("scenes.dir", config.scenes.dir.display().to_string(), &["SLOTPILOT_SCENES_DIR"]),
        (
            "dialogue.max_user_turns",
            config.dialogue.max_user_turns.to_string(),
            &["SLOTPILOT_DIALOGUE_MAX_USER_TURNS"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SLOTPILOT_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["SLOTPILOT_SERVER_PORT"]),
        (
            "server.demo_page",
            config.server.demo_page.display().to_string(),
            &["SLOTPILOT_SERVER_DEMO_PAGE"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SLOTPILOT_LOGGING_LEVEL", "SLOTPILOT_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SLOTPILOT_LOGGING_FORMAT", "SLOTPILOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("slotpilot.toml"), PathBuf::from("config/slotpilot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn summarize(text: &str) -> String {
    const LIMIT: usize = 48;
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= LIMIT {
        return single_line;
    }
    let prefix = single_line.chars().take(LIMIT).collect::<String>();
    format!("{prefix}...")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
