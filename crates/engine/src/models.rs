//! Domain models for running a Code node.
//!
//! A [`CodeNodeDefinition`] is the persisted configuration of one Code node;
//! a [`NodeRun`] is the report produced by executing it once.

use chrono::{DateTime, Utc};
use nodes::{Item, JsonMap, RunMode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CodeNodeDefinition
// ---------------------------------------------------------------------------

/// Configuration of a single Code node in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeNodeDefinition {
    /// Display name, unique within the workflow.
    pub name: String,
    /// How often the user code runs.
    #[serde(default)]
    pub mode: RunMode,
    /// Turn failures into error items instead of failing the node.
    #[serde(default)]
    pub continue_on_fail: bool,
    /// Parameters exposed to the script.
    #[serde(default)]
    pub parameters: JsonMap,
}

impl CodeNodeDefinition {
    pub fn new(name: impl Into<String>, mode: RunMode) -> Self {
        Self {
            name: name.into(),
            mode,
            continue_on_fail: false,
            parameters: JsonMap::new(),
        }
    }

    pub fn continuing_on_fail(mut self) -> Self {
        self.continue_on_fail = true;
        self
    }

    pub fn with_parameters(mut self, parameters: JsonMap) -> Self {
        self.parameters = parameters;
        self
    }
}

// ---------------------------------------------------------------------------
// NodeRun
// ---------------------------------------------------------------------------

/// The result of executing a Code node once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRun {
    pub execution_id: Uuid,
    pub node: String,
    pub mode: RunMode,
    /// Output items in input order.
    pub output: Vec<Item>,
    /// How many output items stand in for a failure.
    pub errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
