//! Recovers JSON objects from free-form LLM replies.
//!
//! Every non-greedy `{...}` span is a candidate. A candidate that fails strict parsing gets one
//! repair attempt, swapping single quotes for double quotes. This is a narrow heuristic: nested
//! objects, apostrophes inside values and trailing commas are not recovered.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::slot::ExtractedRecord;

fn object_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*?\}").ok()).as_ref()
}

/// All parseable JSON objects in `reply`, in order of appearance.
pub fn extract_json_objects(reply: &str) -> Vec<Map<String, Value>> {
    let Some(pattern) = object_pattern() else {
        return Vec::new();
    };

    pattern
        .find_iter(reply)
        .filter_map(|candidate| parse_candidate(candidate.as_str()))
        .collect()
}

/// Name/value records found in `reply`. An empty result means nothing was extracted.
pub fn extract_records(reply: &str) -> Vec<ExtractedRecord> {
    extract_json_objects(reply)
        .into_iter()
        .filter_map(|object| ExtractedRecord::from_json(&Value::Object(object)))
        .collect()
}

fn parse_candidate(candidate: &str) -> Option<Map<String, Value>> {
    let parsed = serde_json::from_str::<Value>(candidate)
        .or_else(|_| serde_json::from_str::<Value>(&repair_quotes(candidate)));

    match parsed {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => None,
        Err(error) => {
            debug!(
                event_name = "interpreter.candidate_discarded",
                error = %error,
                candidate_len = candidate.len(),
                "discarding unparseable json candidate"
            );
            None
        }
    }
}

fn repair_quotes(candidate: &str) -> String {
    candidate.replace('\'', "\"")
}
