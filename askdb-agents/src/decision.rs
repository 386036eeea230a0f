//! Parsing of the model's JSON decisions.
//!
//! The model replies with one of two shapes:
//!
//! ```json
//! {"type": "sql", "sql": "SELECT ...", "thought": "..."}
//! {"type": "answer", "content": "...", "thought": "..."}
//! ```
//!
//! Anything else is a protocol violation reported as [`DecisionError`].

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Sql {
        sql: String,
        thought: Option<String>,
    },
    Answer {
        content: String,
        thought: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// Text is not a JSON object
    #[error("invalid JSON response: {raw}")]
    InvalidJson { raw: String },

    /// JSON object whose `type` is missing or not one of `sql` / `answer`.
    /// The thought is kept so it can still be surfaced.
    #[error("unknown response type: {}", kind.as_deref().unwrap_or("missing"))]
    UnknownType {
        kind: Option<String>,
        thought: Option<String>,
    },
}

impl DecisionError {
    pub fn thought(&self) -> Option<&str> {
        match self {
            DecisionError::UnknownType { thought, .. } => thought.as_deref(),
            DecisionError::InvalidJson { .. } => None,
        }
    }
}

impl Decision {
    pub fn parse(text: &str) -> Result<Self, DecisionError> {
        let object = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => object,
            _ => {
                return Err(DecisionError::InvalidJson {
                    raw: text.to_string(),
                })
            }
        };

        let thought = object
            .get("thought")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        match object.get("type").and_then(Value::as_str) {
            Some("sql") => Ok(Decision::Sql {
                sql: text_field(&object, "sql"),
                thought,
            }),
            Some("answer") => Ok(Decision::Answer {
                content: text_field(&object, "content"),
                thought,
            }),
            _ => Err(DecisionError::UnknownType {
                kind: object
                    .get("type")
                    .filter(|v| !v.is_null())
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
                thought,
            }),
        }
    }

    pub fn thought(&self) -> Option<&str> {
        match self {
            Decision::Sql { thought, .. } | Decision::Answer { thought, .. } => thought.as_deref(),
        }
    }
}

// Missing or null fields read as empty; other non-strings keep their JSON text.
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
