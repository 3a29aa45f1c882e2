//! The Code node: run user code and turn its return value into items.
//!
//! Pipeline per engine call: gate the raw result ([`validate`]), normalize
//! it into candidates ([`normalize`]), validate each candidate and emit
//! typed items.  [`CodeController`] drives the pipeline in either run mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod controller;
pub mod normalize;
pub mod text_keys;
pub mod validate;

pub use controller::CodeController;
pub use normalize::{normalize, normalize_single, NormalizedBatch};
pub use text_keys::{NounForms, TextKey, TextKeyOptions, TextKeys};

/// How often the user code runs for one node invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    /// Once for the whole input batch; must return a collection.
    #[default]
    #[serde(rename = "runOnceForAllItems")]
    AllItems,
    /// Once per input item; must return at most one item.
    #[serde(rename = "runOnceForEachItem")]
    EachItem,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllItems => write!(f, "all-items"),
            Self::EachItem => write!(f, "each-item"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-items" | "runOnceForAllItems" => Ok(Self::AllItems),
            "each-item" | "runOnceForEachItem" => Ok(Self::EachItem),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}
