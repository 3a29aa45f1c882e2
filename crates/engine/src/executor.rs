//! Code node execution.
//!
//! `CodeNodeExecutor` is the workflow-side owner of a Code node run:
//! 1. Builds a [`RunScope`] for the invocation (identity, parameters,
//!    cancellation).
//! 2. Runs the controller in the node's [`RunMode`].
//! 3. Applies the continue-on-fail policy: failures either fail the node or
//!    become error items in the output.
//! 4. Reports timing and item counts in a [`NodeRun`].
//!
//! Cancellation always fails the node as a whole; no partial output is
//! returned.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use nodes::{CodeController, CodeEngine, CodeError, Item, RunMode, RunScope};

use crate::{CodeNodeDefinition, EngineError, ExecutorConfig, NodeRun};

/// Runs Code nodes against a single code engine.
///
/// Construct one executor per engine and call [`CodeNodeExecutor::run`] for
/// every node invocation.
pub struct CodeNodeExecutor {
    engine: Arc<dyn CodeEngine>,
    controller: CodeController,
}

impl CodeNodeExecutor {
    /// Create a new executor.
    pub fn new(engine: Arc<dyn CodeEngine>, config: ExecutorConfig) -> Self {
        let controller = CodeController::new(engine.clone(), config.text_keys)
            .with_item_concurrency(config.item_concurrency);
        Self { engine, controller }
    }

    /// Run `node` once over `input`.
    ///
    /// # Errors
    /// - [`EngineError::NodeFailed`] when the node fails and continue-on-fail
    ///   is off.
    /// - [`EngineError::Cancelled`] when `cancel` fires before the node
    ///   finishes, regardless of continue-on-fail.
    #[instrument(skip_all, fields(node = %node.name, mode = %node.mode, items = input.len()))]
    pub async fn run(
        &self,
        node: &CodeNodeDefinition,
        input: Vec<Item>,
        cancel: CancellationToken,
    ) -> Result<NodeRun, EngineError> {
        let started_at = Utc::now();
        let execution_id = Uuid::new_v4();
        let scope = RunScope::new(node.name.clone())
            .with_execution_id(execution_id)
            .with_parameters(node.parameters.clone())
            .with_cancellation(cancel);

        let continue_on_fail = node.continue_on_fail || self.engine.continue_on_fail();

        let (output, errors) = match (node.mode, continue_on_fail) {
            (RunMode::AllItems, false) => {
                let output = self.controller.run_all_items(&input, &scope).await;
                (self.fail_node(node, output)?, 0)
            }
            (RunMode::AllItems, true) => match self.controller.run_all_items(&input, &scope).await {
                Ok(output) => (output, 0),
                Err(err) => {
                    let err = self.keep_cancellation(node, err)?;
                    warn!("node '{}' failed, continuing with an error item: {}", node.name, err);
                    (vec![error_item(&err, None)], 1)
                }
            },
            (RunMode::EachItem, false) => {
                let output = self.controller.run_each_item(&input, &scope).await;
                (self.fail_node(node, output)?, 0)
            }
            (RunMode::EachItem, true) => {
                let outcomes = self.controller.collect_each_item(&input, &scope).await;
                self.continue_each_item(node, outcomes)?
            }
        };

        let finished_at = Utc::now();
        info!(
            "node '{}' execution {} produced {} items ({} errors)",
            node.name,
            execution_id,
            output.len(),
            errors
        );

        Ok(NodeRun {
            execution_id,
            node: node.name.clone(),
            mode: node.mode,
            output,
            errors,
            started_at,
            finished_at,
        })
    }

    // -----------------------------------------------------------------------
    // Internal: failure policy.
    // -----------------------------------------------------------------------

    fn fail_node(
        &self,
        node: &CodeNodeDefinition,
        output: Result<Vec<Item>, CodeError>,
    ) -> Result<Vec<Item>, EngineError> {
        output.map_err(|err| {
            if err.is_cancelled() {
                return EngineError::Cancelled {
                    node: node.name.clone(),
                };
            }
            EngineError::NodeFailed {
                node: node.name.clone(),
                source: err,
            }
        })
    }

    /// Cancellation is never turned into an error item.
    fn keep_cancellation(&self, node: &CodeNodeDefinition, err: CodeError) -> Result<CodeError, EngineError> {
        if err.is_cancelled() {
            return Err(EngineError::Cancelled {
                node: node.name.clone(),
            });
        }
        Ok(err)
    }

    fn continue_each_item(
        &self,
        node: &CodeNodeDefinition,
        outcomes: Vec<Result<Item, CodeError>>,
    ) -> Result<(Vec<Item>, usize), EngineError> {
        let mut output = Vec::with_capacity(outcomes.len());
        let mut errors = 0;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(item) => output.push(item),
                Err(err) => {
                    let err = self.keep_cancellation(node, err)?;
                    warn!(
                        "node '{}' item {} failed, continuing with an error item: {}",
                        node.name, index, err
                    );
                    output.push(error_item(&err, Some(index)));
                    errors += 1;
                }
            }
        }

        Ok((output, errors))
    }
}

/// The item that stands in for a failure; shape violations keep their fix-up
/// hint under `description`.
fn error_item(err: &CodeError, index: Option<usize>) -> Item {
    let item = Item::failure(err.to_string(), index);
    match err.as_shape_violation() {
        Some(violation) => item.with_error_description(violation.description.clone()),
        None => item,
    }
}
