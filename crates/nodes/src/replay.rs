//! `ReplayEngine` — answers engine calls from recorded return values.
//!
//! Lets a recorded script run be pushed back through the controller, e.g.
//! to re-check output after changing the vocabulary, or from the command
//! line where no interpreter is linked in.

use async_trait::async_trait;
use serde_json::Value;

use crate::code::RunMode;
use crate::context::CodeContext;
use crate::item::{ExecutionResult, Item};
use crate::traits::CodeEngine;

/// Recorded return values for one node run.
#[derive(Debug, Clone, PartialEq)]
pub enum Recording {
    /// The value returned by the single all-items call.
    AllItems(ExecutionResult),
    /// The value returned for each input index.  Missing indexes returned
    /// nothing.
    EachItem(Vec<ExecutionResult>),
}

impl Recording {
    /// Read a recording from a JSON document.
    ///
    /// In each-item mode the document must be an array holding one returned
    /// value per input item.
    pub fn from_value(mode: RunMode, value: Value) -> anyhow::Result<Self> {
        match mode {
            RunMode::AllItems => Ok(Self::AllItems(ExecutionResult::from(value))),
            RunMode::EachItem => match value {
                Value::Array(values) => Ok(Self::EachItem(
                    values.into_iter().map(ExecutionResult::from).collect(),
                )),
                other => anyhow::bail!(
                    "each-item recordings must be an array of returned values, got {}",
                    crate::item::value_kind(&other)
                ),
            },
        }
    }
}

/// Engine that replays a [`Recording`].
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    recording: Recording,
    continue_on_fail: bool,
}

impl ReplayEngine {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            continue_on_fail: false,
        }
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }
}

#[async_trait]
impl CodeEngine for ReplayEngine {
    async fn invoke_all_items(&self, _batch: &[Item], _ctx: &CodeContext<'_>) -> anyhow::Result<ExecutionResult> {
        match &self.recording {
            Recording::AllItems(result) => Ok(result.clone()),
            Recording::EachItem(_) => anyhow::bail!("recording holds per-item results, not an all-items result"),
        }
    }

    async fn invoke_each_item(
        &self,
        _item: &Item,
        index: usize,
        _ctx: &CodeContext<'_>,
    ) -> anyhow::Result<ExecutionResult> {
        match &self.recording {
            Recording::EachItem(results) => Ok(results.get(index).cloned().unwrap_or(ExecutionResult::Undefined)),
            Recording::AllItems(_) => anyhow::bail!("recording holds an all-items result, not per-item results"),
        }
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }
}
