use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::scene::SlotDefinition;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub desc: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Empty string means "not provided yet".
    pub value: String,
}

impl Slot {
    pub fn is_filled(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Projection of a slot without its type tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub name: String,
    pub desc: String,
    pub value: String,
}

impl From<&Slot> for SlotView {
    fn from(slot: &Slot) -> Self {
        Self { name: slot.name.clone(), desc: slot.desc.clone(), value: slot.value.clone() }
    }
}

/// A name/value pair recovered from an LLM reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub name: String,
    pub value: String,
}

impl ExtractedRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Objects without a string `name` are not records.
    pub fn from_json(object: &Value) -> Option<Self> {
        let name = object.get("name")?.as_str()?.to_string();
        let value = match object.get("value") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        Some(Self { name, value })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotSet {
    slots: Vec<Slot>,
}

impl SlotSet {
    pub fn from_definitions(definitions: &[SlotDefinition]) -> Self {
        let slots = definitions
            .iter()
            .map(|definition| Slot {
                name: definition.name.clone(),
                desc: definition.desc.clone(),
                kind: definition.kind.clone(),
                value: String::new(),
            })
            .collect();
        Self { slots }
    }

    /// Applies non-empty records to slots with the same name and returns how many slots changed.
    ///
    /// Records with an empty value or an unknown name are dropped. A filled slot is never
    /// cleared.
    pub fn merge(&mut self, records: &[ExtractedRecord]) -> usize {
        let mut changed = 0;
        for record in records {
            if record.value.is_empty() {
                continue;
            }
            if let Some(slot) = self.slots.iter_mut().find(|slot| slot.name == record.name) {
                if slot.value != record.value {
                    slot.value = record.value.clone();
                    changed += 1;
                }
            }
        }
        changed
    }

    /// True when every slot has a value. An empty set is trivially complete.
    pub fn is_fully_filled(&self) -> bool {
        self.slots.iter().all(Slot::is_filled)
    }

    pub fn update_view(&self) -> Vec<SlotView> {
        self.slots.iter().map(SlotView::from).collect()
    }

    pub fn missing_view(&self) -> Vec<SlotView> {
        self.slots.iter().filter(|slot| !slot.is_filled()).map(SlotView::from).collect()
    }

    pub fn missing_names(&self) -> Vec<String> {
        self.slots.iter().filter(|slot| !slot.is_filled()).map(|slot| slot.name.clone()).collect()
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_filled()).count()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.slots.iter().find(|slot| slot.name == name).map(|slot| slot.value.as_str())
    }

    pub fn values(&self) -> BTreeMap<String, String> {
        self.slots.iter().map(|slot| (slot.name.clone(), slot.value.clone())).collect()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One `name: <name>, Value: <value>` line per pair.
pub fn format_name_value<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("name: {name}, Value: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
