use std::env;
use std::fs;
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;
use slotpilot_agent::llm::ScriptedLlmClient;
use slotpilot_cli::commands::{ask, config, doctor, scenes};
use slotpilot_core::config::AppConfig;
use tempfile::TempDir;

const FLIGHT_CHANGE: &str = r#"{
    "flight_change": {
        "name": "Flight change",
        "description": "change the date or seat of a booked flight",
        "parameters": [
            { "name": "date", "desc": "new departure date", "type": "date" },
            { "name": "seat", "desc": "preferred seat" }
        ]
    }
}"#;

#[test]
fn doctor_passes_with_scene_directory() {
    let dir = scene_dir();
    let scenes_dir = dir.path().display().to_string();

    with_env(&[("SLOTPILOT_SCENES_DIR", &scenes_dir)], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "pass");

        let checks = payload["checks"].as_array().expect("checks array");
        let names = checks.iter().filter_map(|check| check["name"].as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["config_validation", "llm_gateway", "scene_directory"]);
        assert!(checks[2]["details"]
            .as_str()
            .is_some_and(|details| details.starts_with("1 scenes loaded")));
    });
}

#[test]
fn doctor_fails_without_scenes() {
    with_env(&[("SLOTPILOT_SCENES_DIR", "/definitely/not/here")], || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] scene_directory"));
    });
}

#[test]
fn doctor_skips_dependent_checks_on_invalid_config() {
    with_env(&[("SLOTPILOT_LLM_PROVIDER", "openai")], || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn config_reports_sources_and_redacts_api_key() {
    with_env(
        &[
            ("SLOTPILOT_LLM_PROVIDER", "openai"),
            ("SLOTPILOT_LLM_API_KEY", "sk-live-secret"),
            ("SLOTPILOT_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();

            assert!(output.contains("- llm.provider = OpenAi (source: env (SLOTPILOT_LLM_PROVIDER))"));
            assert!(output.contains("- llm.api_key = sk-*** (source: env (SLOTPILOT_LLM_API_KEY))"));
            assert!(output.contains("- logging.level = debug (source: env (SLOTPILOT_LOG_LEVEL))"));
            assert!(output.contains("- server.port = 5000 (source: default)"));
            assert!(!output.contains("sk-live-secret"));
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("SLOTPILOT_SERVER_PORT", "not-a-port")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed"));
    });
}

#[test]
fn scenes_lists_loaded_scenes() {
    let dir = scene_dir();
    fs::write(dir.path().join("broken.json"), "{ nope").expect("write broken");
    let scenes_dir = dir.path().display().to_string();

    with_env(&[("SLOTPILOT_SCENES_DIR", &scenes_dir)], || {
        let result = scenes::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "scenes");
        assert_eq!(payload["scene_count"], 1);
        assert_eq!(payload["scenes"][0]["id"], "flight_change");
        assert_eq!(payload["scenes"][0]["answer"], "summary");
        assert_eq!(payload["scenes"][0]["parameters"][0]["type"], "date");
        assert_eq!(payload["skipped"].as_array().map(Vec::len), Some(1));
    });
}

#[test]
fn ask_returns_config_failure_without_api_key() {
    with_env(&[("SLOTPILOT_LLM_PROVIDER", "openai")], || {
        let result = ask::run("change my flight", None);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn ask_resumes_from_conversation_snapshot() {
    let dir = scene_dir();
    let mut config = AppConfig::default();
    config.scenes.dir = dir.path().to_path_buf();

    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"name": "date", "value": "2024-05-01"}"#,
        r#"{"name": "seat", "value": "12A"}"#,
    ]));

    let first = ask::run_with_client(&config, llm.clone(), "Move my flight to 2024-05-01", None);
    assert_eq!(first.exit_code, 0);
    let first = parse_payload(&first.output);
    assert_eq!(first["status"], "awaiting_user");
    assert_eq!(first["outcome"]["query"]["missing"][0]["name"], "seat");

    let snapshot = first["outcome"]["conversation"].to_string();
    let second = ask::run_with_client(&config, llm, "Seat 12A", Some(&snapshot));
    assert_eq!(second.exit_code, 0);
    let second = parse_payload(&second.output);
    assert_eq!(second["status"], "complete");
    assert_eq!(
        second["outcome"]["answer"],
        "Flight change\nname: date, Value: 2024-05-01\nname: seat, Value: 12A"
    );
}

#[test]
fn ask_rejects_malformed_snapshot_and_blank_question() {
    let config = AppConfig::default();
    let llm = Arc::new(ScriptedLlmClient::default());

    let blank = ask::run_with_client(&config, llm.clone(), "   ", None);
    assert_eq!(blank.exit_code, 2);
    assert_eq!(parse_payload(&blank.output)["error_class"], "invalid_input");

    let malformed = ask::run_with_client(&config, llm.clone(), "hi", Some("{ nope"));
    assert_eq!(malformed.exit_code, 2);
    assert_eq!(parse_payload(&malformed.output)["error_class"], "invalid_conversation");
    assert!(llm.prompts().is_empty());
}

#[test]
fn ask_reports_gateway_failure_with_nonzero_exit() {
    let dir = scene_dir();
    let mut config = AppConfig::default();
    config.scenes.dir = dir.path().to_path_buf();

    let result =
        ask::run_with_client(&config, Arc::new(ScriptedLlmClient::default()), "hello", None);

    assert_eq!(result.exit_code, 1);
    assert_eq!(parse_payload(&result.output)["status"], "failed");
}

fn scene_dir() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("flight_change.json"), FLIGHT_CHANGE).expect("write scenes");
    dir
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SLOTPILOT_LLM_PROVIDER",
        "SLOTPILOT_LLM_API_KEY",
        "SLOTPILOT_LLM_BASE_URL",
        "SLOTPILOT_LLM_MODEL",
        "SLOTPILOT_LLM_SYSTEM_PROMPT",
        "SLOTPILOT_LLM_TIMEOUT_SECS",
        "SLOTPILOT_SCENES_DIR",
        "SLOTPILOT_DIALOGUE_MAX_USER_TURNS",
        "SLOTPILOT_SERVER_BIND_ADDRESS",
        "SLOTPILOT_SERVER_PORT",
        "SLOTPILOT_SERVER_DEMO_PAGE",
        "SLOTPILOT_LOGGING_LEVEL",
        "SLOTPILOT_LOGGING_FORMAT",
        "SLOTPILOT_LOG_LEVEL",
        "SLOTPILOT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
