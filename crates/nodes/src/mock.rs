//! `MockEngine` — a test double for `CodeEngine`.
//!
//! Useful in unit and integration tests where no script interpreter is
//! available or the script itself is irrelevant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::CodeContext;
use crate::item::{ExecutionResult, Item};
use crate::traits::CodeEngine;

type ItemFn = dyn Fn(&Item, usize) -> ExecutionResult + Send + Sync;
type LatencyFn = dyn Fn(usize) -> Duration + Send + Sync;

/// Behaviour injected into `MockEngine` at construction time.
pub enum MockBehaviour {
    /// Return the same value from every call.
    Return(ExecutionResult),
    /// Compute each-item results from the input item and its index.  The
    /// all-items call receives the first input item (or an empty one) and
    /// index 0.
    PerItem(Box<ItemFn>),
    /// Fail every call with an engine fault.
    Fail(String),
    /// Fail the each-item call for one index; other calls return the value.
    FailAt {
        index: usize,
        message: String,
        otherwise: ExecutionResult,
    },
}

/// A mock engine that records every call and returns a programmer-specified
/// result.
pub struct MockEngine {
    /// What the engine does when invoked.
    pub behaviour: MockBehaviour,
    /// Item index of every call in call order (`None` for all-items calls).
    pub calls: Arc<Mutex<Vec<Option<usize>>>>,
    latency: Option<Box<LatencyFn>>,
    continue_on_fail: bool,
}

impl MockEngine {
    fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
            latency: None,
            continue_on_fail: false,
        }
    }

    /// Always return `value`.
    pub fn returning(value: Value) -> Self {
        Self::with_behaviour(MockBehaviour::Return(ExecutionResult::from(value)))
    }

    /// Always return nothing.
    pub fn returning_undefined() -> Self {
        Self::with_behaviour(MockBehaviour::Return(ExecutionResult::Undefined))
    }

    /// Build each result from the input item and index.
    pub fn per_item(f: impl Fn(&Item, usize) -> Value + Send + Sync + 'static) -> Self {
        Self::with_behaviour(MockBehaviour::PerItem(Box::new(move |item: &Item, index: usize| {
            ExecutionResult::from(f(item, index))
        })))
    }

    /// Always fail with an engine fault.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::Fail(message.into()))
    }

    /// Fail only the each-item call for `index`.
    pub fn failing_at(index: usize, message: impl Into<String>, otherwise: Value) -> Self {
        Self::with_behaviour(MockBehaviour::FailAt {
            index,
            message: message.into(),
            otherwise: ExecutionResult::from(otherwise),
        })
    }

    /// Sleep before answering the call for each index.
    pub fn with_latency(mut self, latency: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Some(Box::new(latency));
        self
    }

    /// Report the continue-on-fail flag as set.
    pub fn continuing_on_fail(mut self) -> Self {
        self.continue_on_fail = true;
        self
    }

    /// Number of times the engine has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Indexes of each-item calls, in the order they started.
    pub fn called_indexes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().filter_map(|call| *call).collect()
    }

    async fn answer(&self, item: &Item, index: Option<usize>) -> anyhow::Result<ExecutionResult> {
        self.calls.lock().unwrap().push(index);

        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(index.unwrap_or(0))).await;
        }

        match &self.behaviour {
            MockBehaviour::Return(result) => Ok(result.clone()),
            MockBehaviour::PerItem(f) => Ok(f(item, index.unwrap_or(0))),
            MockBehaviour::Fail(message) => Err(anyhow::anyhow!(message.clone())),
            MockBehaviour::FailAt {
                index: failing,
                message,
                otherwise,
            } => {
                if index == Some(*failing) {
                    Err(anyhow::anyhow!(message.clone()))
                } else {
                    Ok(otherwise.clone())
                }
            }
        }
    }
}

#[async_trait]
impl CodeEngine for MockEngine {
    async fn invoke_all_items(&self, batch: &[Item], _ctx: &CodeContext<'_>) -> anyhow::Result<ExecutionResult> {
        let first = batch.first().cloned().unwrap_or_default();
        self.answer(&first, None).await
    }

    async fn invoke_each_item(
        &self,
        item: &Item,
        index: usize,
        _ctx: &CodeContext<'_>,
    ) -> anyhow::Result<ExecutionResult> {
        self.answer(item, Some(index)).await
    }

    fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }
}
