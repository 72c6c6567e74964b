//! Event data model for trackforge
//!
//! An analytics event is an ordered JSON object whose shape varies by
//! producer. `Event` wraps that object and exposes the handful of
//! conventional fields the processors work with, while leaving every other
//! key untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::TryFrom;

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};

/// Key holding the event name
pub const NAME: &str = "name";
/// Key holding auxiliary metadata
pub const CONTEXT: &str = "context";
/// Key holding the canonical payload
pub const PAYLOAD: &str = "event";
/// Key some producers use for the payload instead of `event`
pub const DATA: &str = "data";

/// One analytics occurrence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Create an event carrying only a name
    pub fn new(name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(NAME.to_string(), Value::String(name.into()));
        Self(fields)
    }

    /// Event name, if present and a string
    pub fn name(&self) -> Option<&str> {
        self.0.get(NAME).and_then(Value::as_str)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.insert(NAME, Value::String(name.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a top-level field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a top-level field, keeping the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// The `context` mapping, when present and an object
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.0.get(CONTEXT).and_then(Value::as_object)
    }

    pub fn context_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut(CONTEXT).and_then(Value::as_object_mut)
    }

    /// Look up a string inside `context`
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context()
            .and_then(|context| context.get(key))
            .and_then(Value::as_str)
    }

    /// Remove a field from `context`, if there is one
    pub fn take_from_context(&mut self, key: &str) -> Option<Value> {
        self.context_mut().and_then(|context| context.shift_remove(key))
    }

    /// Raw payload stored under `event`
    pub fn payload(&self) -> Option<&Value> {
        self.0.get(PAYLOAD)
    }

    /// Decode the payload into an owned JSON object.
    ///
    /// Returns `Ok(None)` when there is no payload. A payload that is a
    /// string is parsed as serialized JSON; any other shape is an error.
    pub fn decode_payload(&self) -> ValidationResult<Option<Map<String, Value>>> {
        match self.payload() {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                _ => Err(ValidationError::wrong_type(
                    PAYLOAD,
                    "a JSON object or a string holding one",
                )),
            },
            Some(_) => Err(ValidationError::wrong_type(
                PAYLOAD,
                "a JSON object or a string holding one",
            )),
        }
    }

    /// Edit the payload as a JSON object, preserving its encoding.
    ///
    /// Structured payloads are edited in place; serialized payloads are
    /// decoded, edited and serialized again. Returns `Ok(None)` without
    /// calling `edit` when the event has no payload.
    pub fn edit_payload<T, F>(&mut self, edit: F) -> ValidationResult<Option<T>>
    where
        F: FnOnce(&mut Map<String, Value>) -> ValidationResult<T>,
    {
        let serialized = match self.0.get(PAYLOAD) {
            None => return Ok(None),
            Some(Value::Object(_)) => false,
            Some(Value::String(_)) => true,
            Some(_) => {
                return Err(ValidationError::wrong_type(
                    PAYLOAD,
                    "a JSON object or a string holding one",
                ))
            },
        };

        if !serialized {
            return match self.0.get_mut(PAYLOAD).and_then(Value::as_object_mut) {
                Some(map) => edit(map).map(Some),
                None => Ok(None),
            };
        }

        let mut map = self.decode_payload()?.unwrap_or_default();
        let result = edit(&mut map)?;
        let encoded = serde_json::to_string(&map).map_err(|e| {
            ValidationError::with_context(
                ValidationErrorKind::Custom("unserializable payload".into()),
                PAYLOAD,
                e.to_string(),
            )
        })?;
        self.insert(PAYLOAD, Value::String(encoded));
        Ok(Some(result))
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Only JSON objects are events
impl TryFrom<Value> for Event {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(ValidationError::wrong_type("event", "a JSON object")),
        }
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        event.into_value()
    }
}
