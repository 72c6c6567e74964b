//! Map new event context values to the old top-level fields so that legacy
//! parsers can read the event.

use serde_json::{Map, Value};

use super::{ProcessOutcome, Processor};
use crate::error::Result;
use crate::models::event::{DATA, PAYLOAD};
use crate::models::Event;
use crate::shim::EVENT_TYPE;

/// Context fields that legacy consumers read from the top level
pub const CONTEXT_FIELDS_TO_INCLUDE: [&str; 7] = [
    "username",
    "session",
    "ip",
    "agent",
    "host",
    "referer",
    "accept_language",
];

/// Only used by the web analytics integration
const CLIENT_ID: &str = "client_id";

/// Ensures every field legacy parsers require is present
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyFieldMappingProcessor;

impl Processor for LegacyFieldMappingProcessor {
    fn name(&self) -> &'static str {
        "legacy_field_mapping"
    }

    fn process(&self, event: &mut Event) -> Result<ProcessOutcome> {
        for field in CONTEXT_FIELDS_TO_INCLUDE {
            move_from_context(event, field, Value::from(""));
        }
        remove_shim_context(event);

        normalize_payload(event);
        normalize_time(event);

        let default_event_type = Value::from(event.name().unwrap_or_default());
        move_from_context(event, EVENT_TYPE, default_event_type);
        move_from_context(event, "event_source", Value::from("server"));
        move_from_context(event, "page", Value::Null);

        Ok(ProcessOutcome::Modified)
    }
}

/// Move `field` from the context to the top level, or set it to `default`
fn move_from_context(event: &mut Event, field: &str, default: Value) {
    let value = event.take_from_context(field).unwrap_or(default);
    event.insert(field, value);
}

/// Drop context fields that are either duplicated at the top level or of no
/// interest downstream
fn remove_shim_context(event: &mut Event) {
    if let Some(context) = event.context_mut() {
        for field in CONTEXT_FIELDS_TO_INCLUDE.iter().chain([&CLIENT_ID]) {
            context.shift_remove(*field);
        }
    }
}

/// Collapse `data`/`event` into a single `event` field
fn normalize_payload(event: &mut Event) {
    let from_browser = event.context_str("event_source") == Some("browser");

    if let Some(data) = event.remove(DATA) {
        let payload = if from_browser && data.is_object() {
            Value::String(data.to_string())
        } else {
            data
        };
        event.insert(PAYLOAD, payload);
    } else if !event.contains_key(PAYLOAD) {
        event.insert(PAYLOAD, Value::Object(Map::new()));
    }
}

/// Prefer the context timestamp over the top-level one
fn normalize_time(event: &mut Event) {
    if let Some(timestamp) = event.take_from_context("timestamp") {
        event.insert("time", timestamp);
    } else if let Some(timestamp) = event.get("timestamp").cloned() {
        event.insert("time", timestamp);
    }
    event.remove("timestamp");
}
