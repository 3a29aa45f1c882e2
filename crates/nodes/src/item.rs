//! The canonical item model and the raw value a script hands back.
//!
//! An [`Item`] is what flows between nodes: a required `json` mapping plus
//! optional `binary`, `pairedItem` and `error` metadata.  An
//! [`ExecutionResult`] is whatever user code returned, classified once into a
//! tagged variant so every later rule can `match` on it instead of probing
//! the value again.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON object type used for `json` and `binary` payloads.
pub type JsonMap = Map<String, Value>;

/// An ordered batch of items, as consumed and produced by a node.
pub type ItemSequence = Vec<Item>;

/// Top-level keys an item may carry.  Anything else is a contract violation.
pub const RECOGNIZED_ITEM_KEYS: [&str; 4] = ["json", "binary", "pairedItem", "error"];

/// Returns `true` if `key` is one of [`RECOGNIZED_ITEM_KEYS`].
pub fn is_recognized_key(key: &str) -> bool {
    RECOGNIZED_ITEM_KEYS.contains(&key)
}

/// An object is item-shaped once it carries at least one recognized key.
pub fn is_item_shaped(object: &JsonMap) -> bool {
    object.keys().any(|key| is_recognized_key(key))
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// The atomic unit exchanged between workflow nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub json: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Item {
    pub fn new(json: JsonMap) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    /// Build an item from a JSON object value.  Returns `None` for anything
    /// that is not an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(json) => Some(Self::new(json)),
            _ => None,
        }
    }

    pub fn with_binary(mut self, binary: JsonMap) -> Self {
        self.binary = Some(binary);
        self
    }

    /// Link this item to the input item at `index`.
    pub fn with_paired_item(mut self, index: usize) -> Self {
        self.paired_item = Some(json!({ "item": index }));
        self
    }

    /// The output item substituted for a failure when the node continues on
    /// failure.  `index` is the input slot it replaces, if any.
    pub fn failure(message: impl Into<String>, index: Option<usize>) -> Self {
        let mut json = JsonMap::new();
        json.insert("error".into(), Value::String(message.into()));
        let item = Self::new(json);
        match index {
            Some(index) => item.with_paired_item(index),
            None => item,
        }
    }

    /// Attach a hint on how to fix the failure next to its message.
    pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
        self.json
            .insert("description".into(), Value::String(description.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// The raw value returned by one run of user code, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// An array: a candidate batch of items.
    Array(Vec<Value>),
    /// A non-array object: a candidate single item.
    Mapping(JsonMap),
    /// A string, number, boolean or `null`.
    Primitive(Value),
    /// Nothing was returned.
    Undefined,
}

impl ExecutionResult {
    /// Short name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            Self::Mapping(_) => "object",
            Self::Primitive(value) => value_kind(value),
            Self::Undefined => "undefined",
        }
    }
}

impl From<Value> for ExecutionResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Self::Array(values),
            Value::Object(object) => Self::Mapping(object),
            other => Self::Primitive(other),
        }
    }
}

impl From<Option<Value>> for ExecutionResult {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Undefined, Self::from)
    }
}

/// Render a returned primitive the way a script author would recognise it
/// in a diagnostic.  `None` stands for nothing returned.
pub fn describe_returned(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
    }
}

/// Type name of a JSON value as it appears in diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
