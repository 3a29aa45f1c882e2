//! Code execution controller.
//!
//! `CodeController` runs user code through a [`CodeEngine`] and turns the
//! result into validated items:
//!
//! - **All items**: one engine call for the whole batch, then
//!   gate → normalize → validate the batch.  Any failure fails the node with
//!   a single diagnostic.
//! - **Each item**: one engine call per input item, in input order.  Each
//!   result is gated, normalized and validated on its own and any failure is
//!   reported against that item's index.
//!
//! The controller never retries and never swallows an error: shape
//! violations, engine faults and cancellation all reach the caller.  Whether
//! an item failure aborts the node is the caller's decision
//! ([`CodeController::run_each_item`] vs [`CodeController::collect_each_item`]).

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::code::normalize::{normalize, normalize_single};
use crate::code::text_keys::TextKeys;
use crate::code::validate;
use crate::context::{CodeContext, RunScope};
use crate::error::{CodeError, ShapeViolation};
use crate::item::{ExecutionResult, Item, ItemSequence};
use crate::traits::CodeEngine;

/// Drives one Code node's engine calls and result validation.
///
/// Holds no per-run state: the same controller can serve any number of
/// invocations, each described by its own [`RunScope`].
pub struct CodeController {
    engine: Arc<dyn CodeEngine>,
    text_keys: TextKeys,
    item_concurrency: usize,
}

impl CodeController {
    /// Create a controller that runs items strictly one at a time.
    pub fn new(engine: Arc<dyn CodeEngine>, text_keys: TextKeys) -> Self {
        Self {
            engine,
            text_keys,
            item_concurrency: 1,
        }
    }

    /// Allow up to `item_concurrency` each-item calls in flight.  Output
    /// order always follows input order.
    pub fn with_item_concurrency(mut self, item_concurrency: usize) -> Self {
        self.item_concurrency = item_concurrency.max(1);
        self
    }

    pub fn text_keys(&self) -> &TextKeys {
        &self.text_keys
    }

    pub fn item_concurrency(&self) -> usize {
        self.item_concurrency
    }

    /// Run the code once for the whole batch.
    ///
    /// # Errors
    /// - [`CodeError::Shape`] if the returned value breaks the item contract.
    /// - [`CodeError::Engine`] if the engine call fails.
    /// - [`CodeError::Cancelled`] if the run was cancelled.
    #[instrument(skip_all, fields(node = %scope.node_name, items = batch.len()))]
    pub async fn run_all_items(&self, batch: &[Item], scope: &RunScope) -> Result<ItemSequence, CodeError> {
        let ctx = CodeContext::all_items(scope, batch);

        debug!("invoking code engine for all items");
        let result = self
            .invoke(scope, self.engine.invoke_all_items(batch, &ctx))
            .await?;

        let items = self.shape_batch(result).map_err(|violation| {
            warn!(%violation, description = %violation.description, "returned items are malformed");
            CodeError::from(violation)
        })?;

        info!(emitted = items.len(), "code returned items");
        Ok(items)
    }

    /// Run the code once per item, stopping at the first failure.
    ///
    /// Items already collected are dropped when a later item fails or the
    /// run is cancelled.
    #[instrument(
        skip_all,
        fields(node = %scope.node_name, items = batch.len(), concurrency = self.item_concurrency)
    )]
    pub async fn run_each_item(&self, batch: &[Item], scope: &RunScope) -> Result<ItemSequence, CodeError> {
        let items: ItemSequence = stream::iter(0..batch.len())
            .map(|index| self.run_item(batch, index, scope))
            .buffered(self.item_concurrency)
            .try_collect()
            .await?;

        info!(emitted = items.len(), "code returned items");
        Ok(items)
    }

    /// Run the code once per item and return every item's outcome, in input
    /// order.  Failures are returned, not handled.
    #[instrument(
        skip_all,
        fields(node = %scope.node_name, items = batch.len(), concurrency = self.item_concurrency)
    )]
    pub async fn collect_each_item(&self, batch: &[Item], scope: &RunScope) -> Vec<Result<Item, CodeError>> {
        stream::iter(0..batch.len())
            .map(|index| self.run_item(batch, index, scope))
            .buffered(self.item_concurrency)
            .collect()
            .await
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    async fn run_item(&self, batch: &[Item], index: usize, scope: &RunScope) -> Result<Item, CodeError> {
        let ctx = CodeContext::each_item(scope, batch, index);

        debug!(index, "invoking code engine for item");
        let result = self
            .invoke(scope, self.engine.invoke_each_item(&batch[index], index, &ctx))
            .await?;

        let item = self.shape_item(result, index).map_err(|violation| {
            warn!(index, %violation, description = %violation.description, "returned item is malformed");
            CodeError::from(violation)
        })?;

        Ok(match item.paired_item {
            Some(_) => item,
            None => item.with_paired_item(index),
        })
    }

    /// Await one engine call unless the run is cancelled first.
    async fn invoke<F>(&self, scope: &RunScope, call: F) -> Result<ExecutionResult, CodeError>
    where
        F: Future<Output = anyhow::Result<ExecutionResult>>,
    {
        // Cancellation is polled first, so a cancelled run never starts a call.
        tokio::select! {
            biased;
            _ = scope.cancel.cancelled() => Err(CodeError::Cancelled),
            result = call => result.map_err(CodeError::Engine),
        }
    }

    fn shape_batch(&self, result: ExecutionResult) -> Result<ItemSequence, ShapeViolation> {
        let values = validate::expect_batch(result, &self.text_keys)?;
        validate::validate_batch(normalize(values), &self.text_keys)
    }

    fn shape_item(&self, result: ExecutionResult, index: usize) -> Result<Item, ShapeViolation> {
        let object = validate::expect_single(result, index, &self.text_keys)?;
        validate::validate_single(normalize_single(object), index, &self.text_keys)
    }
}
