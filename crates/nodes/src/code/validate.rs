//! Shape validation of returned values and normalized candidates.
//!
//! Two gates look at the raw [`ExecutionResult`] before normalization:
//! [`expect_batch`] for all-items mode and [`expect_single`] for each-item
//! mode.  After normalization, [`validate_batch`] and [`validate_single`]
//! apply the per-item rules in order:
//!
//! 1. Top-level keys must all be recognized item keys (batch-wide once any
//!    element is item-shaped).
//! 2. `json` must be present and be an object.
//! 3. `binary`, when present, must be an object.

use serde_json::Value;

use crate::code::normalize::{Candidate, NormalizedBatch};
use crate::code::text_keys::TextKeys;
use crate::error::ShapeViolation;
use crate::item::{describe_returned, is_recognized_key, value_kind, ExecutionResult, Item, JsonMap};

const ALL_ITEMS_MESSAGE: &str = "Code doesn't return items properly";
const TOP_LEVEL_KEY_HINT: &str = "Access the properties of an item under `.json`, e.g. `item.json`";
const SWITCH_MODE_HINT: &str =
    "If you need to output multiple items, please use the 'Run Once for All Items' mode instead.";

// ---------------------------------------------------------------------------
// Gates on the raw returned value
// ---------------------------------------------------------------------------

/// All-items gate: the result must be an array or a single object.
///
/// An empty array is accepted and yields zero items.  A non-empty array must
/// start with an object; later elements are left to the per-item rules.
pub fn expect_batch(result: ExecutionResult, keys: &TextKeys) -> Result<Vec<Value>, ShapeViolation> {
    let request = format!(
        "Please return an array of {}, one for each item you would like to output.",
        keys.plural_noun()
    );

    match result {
        ExecutionResult::Array(values) => {
            if let Some(first) = values.first() {
                if !first.is_object() {
                    return Err(ShapeViolation::batch(
                        ALL_ITEMS_MESSAGE,
                        format!("An array of {}s was returned. {request}", value_kind(first)),
                    ));
                }
            }
            Ok(values)
        }
        ExecutionResult::Mapping(object) => Ok(vec![Value::Object(object)]),
        ExecutionResult::Primitive(value) => Err(not_items(&request, Some(&value))),
        ExecutionResult::Undefined => Err(not_items(&request, None)),
    }
}

/// Each-item gate: the result for input `index` must be a single object.
pub fn expect_single(
    result: ExecutionResult,
    index: usize,
    keys: &TextKeys,
) -> Result<JsonMap, ShapeViolation> {
    match result {
        ExecutionResult::Mapping(object) => Ok(object),
        ExecutionResult::Array(values) => {
            let first_sentence = match values.first() {
                Some(first) => format!(
                    "An array of {}s was returned ({} found).",
                    value_kind(first),
                    count_items(values.len())
                ),
                None => "An empty array was returned.".to_string(),
            };
            Err(ShapeViolation::at(
                index,
                format!("Code doesn't return a single {}", keys.noun()),
                format!("{first_sentence} {SWITCH_MODE_HINT}"),
            ))
        }
        ExecutionResult::Primitive(value) => Err(not_an_item(index, Some(&value), keys)),
        ExecutionResult::Undefined => Err(not_an_item(index, None, keys)),
    }
}

fn not_items(request: &str, returned: Option<&Value>) -> ShapeViolation {
    ShapeViolation::batch(
        ALL_ITEMS_MESSAGE,
        format!("{request} ('{}' was returned instead.)", describe_returned(returned)),
    )
}

fn not_an_item(index: usize, returned: Option<&Value>, keys: &TextKeys) -> ShapeViolation {
    let noun = keys.noun_with_article();
    ShapeViolation::at(
        index,
        format!("Code doesn't return {noun}"),
        format!(
            "Please return {noun} representing the output item. ('{}' was returned instead.)",
            describe_returned(returned)
        ),
    )
}

fn count_items(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

// ---------------------------------------------------------------------------
// Per-item rules
// ---------------------------------------------------------------------------

/// Validate a normalized all-items batch.
pub fn validate_batch(batch: NormalizedBatch, keys: &TextKeys) -> Result<Vec<Item>, ShapeViolation> {
    let NormalizedBatch {
        item_shaped,
        candidates,
    } = batch;

    if item_shaped {
        for (index, candidate) in candidates.iter().enumerate() {
            check_top_level_keys(candidate, index)?;
        }
    }

    candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| validate_item(candidate, index, keys))
        .collect()
}

/// Validate the single candidate produced for input `index`.
pub fn validate_single(candidate: Candidate, index: usize, keys: &TextKeys) -> Result<Item, ShapeViolation> {
    check_top_level_keys(&candidate, index)?;
    validate_item(candidate, index, keys)
}

/// Reject the first key outside the recognized item keys.
pub fn check_top_level_keys(candidate: &Candidate, index: usize) -> Result<(), ShapeViolation> {
    match candidate.keys().find(|key| !is_recognized_key(key)) {
        Some(key) => Err(ShapeViolation::at(
            index,
            format!("Unknown top-level item key: {key}"),
            TOP_LEVEL_KEY_HINT,
        )),
        None => Ok(()),
    }
}

/// Check `json` and `binary` and build the typed item.
fn validate_item(mut candidate: Candidate, index: usize, keys: &TextKeys) -> Result<Item, ShapeViolation> {
    let json = match candidate.remove("json") {
        Some(Value::Object(json)) => json,
        _ => return Err(not_an_object("json", index, keys)),
    };

    let binary = match candidate.remove("binary") {
        None => None,
        Some(Value::Object(binary)) => Some(binary),
        Some(_) => return Err(not_an_object("binary", index, keys)),
    };

    let paired_item = candidate.remove("pairedItem");
    let error = candidate.remove("error");

    // Anything left over was never checked against the key policy.
    check_top_level_keys(&candidate, index)?;

    Ok(Item {
        json,
        binary,
        paired_item,
        error,
    })
}

fn not_an_object(property: &str, index: usize, keys: &TextKeys) -> ShapeViolation {
    let noun = keys.noun_with_article();
    ShapeViolation::at(
        index,
        format!("A '{property}' property isn't {noun}"),
        format!("In the returned data, every key named '{property}' must point to {noun}."),
    )
}
