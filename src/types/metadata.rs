//! Stream metadata pushed alongside media

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// Metadata object carried by `0x08` frames
///
/// The server sends one before each media fragment. Consumers read the
/// observer counts (who else is watching or recording this source) and the
/// capture timestamp.
///
/// Any JSON object decodes. Typed fields are read leniently: `null` or a
/// missing field gives the default, a scalar `id` or `name` is kept as its
/// JSON text, and an `at` or `observers` of another shape stays in `extra`
/// under its own key. Fields this type doesn't know about are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct StreamMetadata {
    /// Source identifier
    pub id: String,

    /// Human readable source name
    pub name: String,

    /// Capture time of the following fragment (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,

    /// Active observers keyed by observer kind
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub observers: BTreeMap<String, i64>,

    /// Unrecognized fields, and known fields whose shape didn't match
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamMetadata {
    /// Decode a metadata payload (the frame without its tag byte)
    ///
    /// Fails only when the payload is not a JSON object.
    pub fn from_json_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Total observer count across kinds
    pub fn observer_total(&self) -> i64 {
        self.observers.values().sum()
    }
}

impl From<Map<String, Value>> for StreamMetadata {
    fn from(mut extra: Map<String, Value>) -> Self {
        let id = take_text(&mut extra, "id");
        let name = take_text(&mut extra, "name");

        let at = match extra.remove("at") {
            Some(Value::String(at)) => Some(at),
            Some(Value::Null) | None => None,
            Some(other) => {
                extra.insert("at".to_string(), other);
                None
            }
        };

        let observers = match extra.remove("observers") {
            Some(Value::Object(counts)) => counts
                .into_iter()
                .filter_map(|(kind, count)| count.as_i64().map(|count| (kind, count)))
                .collect(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(other) => {
                extra.insert("observers".to_string(), other);
                BTreeMap::new()
            }
        };

        Self { id, name, at, observers, extra }
    }
}

/// Remove `key` as text; compound values stay in `extra`
fn take_text(extra: &mut Map<String, Value>, key: &str) -> String {
    match extra.remove(key) {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => String::new(),
        Some(value @ (Value::Bool(_) | Value::Number(_))) => value.to_string(),
        Some(compound) => {
            extra.insert(key.to_string(), compound);
            String::new()
        }
    }
}
