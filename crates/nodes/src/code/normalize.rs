//! Result normalization: turn returned values into candidate items.
//!
//! Normalization only decides *where* each value goes.  An object that
//! already carries a recognized item key is passed through as-is; anything
//! else is wrapped under `json`.  The decision is made for the whole batch:
//! once one element is item-shaped, no element is wrapped, so stray keys
//! reach the validator instead of being hidden inside `json`.

use serde_json::Value;

use crate::item::{is_item_shaped, JsonMap};

/// One candidate item: a top-level object not yet checked for shape.
pub type Candidate = JsonMap;

/// Ordered candidates plus the batch-wide item-shape decision.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    /// At least one returned element carried a recognized item key.
    pub item_shaped: bool,
    pub candidates: Vec<Candidate>,
}

impl NormalizedBatch {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Normalize the elements of a returned batch.
pub fn normalize(values: Vec<Value>) -> NormalizedBatch {
    let item_shaped = values
        .iter()
        .any(|value| value.as_object().is_some_and(is_item_shaped));

    let candidates = values
        .into_iter()
        .map(|value| match value {
            Value::Object(object) if item_shaped => object,
            other => wrap_under_json(other),
        })
        .collect();

    NormalizedBatch {
        item_shaped,
        candidates,
    }
}

/// Normalize a single returned object (each-item mode).
pub fn normalize_single(object: JsonMap) -> Candidate {
    if is_item_shaped(&object) {
        object
    } else {
        wrap_under_json(Value::Object(object))
    }
}

fn wrap_under_json(value: Value) -> Candidate {
    let mut candidate = Candidate::new();
    candidate.insert("json".into(), value);
    candidate
}
