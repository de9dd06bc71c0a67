use serde::Serialize;
use slotpilot_agent::llm::ChatCompletionsClient;
use slotpilot_core::config::{AppConfig, LoadOptions};
use slotpilot_core::registry::SceneRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_gateway(&config));
            checks.push(check_scene_directory(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "llm_gateway",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "scene_directory",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_gateway(config: &AppConfig) -> DoctorCheck {
    match ChatCompletionsClient::new(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "llm_gateway",
            status: CheckStatus::Pass,
            details: format!(
                "{:?} gateway for model `{}` at {}",
                config.llm.provider,
                config.llm.model,
                client.endpoint()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "llm_gateway", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_scene_directory(config: &AppConfig) -> DoctorCheck {
    let load = SceneRegistry::load_dir(&config.scenes.dir);
    let dir = config.scenes.dir.display();

    if load.registry.is_empty() {
        let reason = load
            .skipped
            .first()
            .map(|error| format!(": {error}"))
            .unwrap_or_default();
        return DoctorCheck {
            name: "scene_directory",
            status: CheckStatus::Fail,
            details: format!("no scenes loaded from `{dir}`{reason}"),
        };
    }

    let mut details = format!("{} scenes loaded from `{dir}`", load.registry.len());
    if !load.skipped.is_empty() {
        details.push_str(&format!(", {} sources skipped", load.skipped.len()));
    }
    DoctorCheck { name: "scene_directory", status: CheckStatus::Pass, details }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
