use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use lockstream_core::{DomainError, DomainResult};

/// Open, string-keyed event payload.
///
/// Required keys depend on the event type; extraction helpers turn a missing,
/// empty or mistyped field into `DomainError::Validation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, JsonValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A required, non-empty string.
    pub fn require_str(&self, key: &str) -> DomainResult<&str> {
        match self.0.get(key) {
            Some(JsonValue::String(s)) if !s.is_empty() => Ok(s.as_str()),
            Some(JsonValue::String(_)) => Err(DomainError::validation(format!(
                "payload[{key:?}] must be a non-empty string"
            ))),
            None | Some(JsonValue::Null) => Err(DomainError::validation(format!(
                "payload[{key:?}] is required"
            ))),
            Some(other) => Err(DomainError::validation(format!(
                "payload[{key:?}] must be a non-empty string, got {}",
                kind(other)
            ))),
        }
    }

    /// A required whole number. Booleans and fractional numbers are rejected.
    pub fn require_int(&self, key: &str) -> DomainResult<i64> {
        match self.0.get(key) {
            Some(JsonValue::Number(n)) => n.as_i64().ok_or_else(|| {
                DomainError::validation(format!("payload[{key:?}] must be a whole number, got {n}"))
            }),
            None | Some(JsonValue::Null) => Err(DomainError::validation(format!(
                "payload[{key:?}] is required"
            ))),
            Some(other) => Err(DomainError::validation(format!(
                "payload[{key:?}] must be a whole number, got {}",
                kind(other)
            ))),
        }
    }

    /// An optional string; absent and `null` both read as `None`.
    pub fn optional_str(&self, key: &str) -> DomainResult<Option<&str>> {
        match self.0.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(DomainError::validation(format!(
                "payload[{key:?}] must be a string when present, got {}",
                kind(other)
            ))),
        }
    }
}

impl From<Map<String, JsonValue>> for Payload {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl TryFrom<JsonValue> for Payload {
    type Error = DomainError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            JsonValue::Null => Ok(Self::default()),
            other => Err(DomainError::validation(format!(
                "payload must be an object, got {}",
                kind(&other)
            ))),
        }
    }
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
