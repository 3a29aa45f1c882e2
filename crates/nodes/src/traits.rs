//! The `CodeEngine` trait — the contract every script engine must fulfil.

use async_trait::async_trait;

use crate::context::CodeContext;
use crate::item::{ExecutionResult, Item};

/// Runs user code and hands back whatever it returned.
///
/// Implementations own parsing, evaluation and isolation of the script.
/// Any failure of their own (syntax error, runtime exception, timeout) is
/// returned as an `anyhow::Error` and reaches the caller unchanged; the
/// shape of a *successful* return is checked by the controller.
#[async_trait]
pub trait CodeEngine: Send + Sync {
    /// Run the script once against the whole input batch.
    async fn invoke_all_items(
        &self,
        batch: &[Item],
        ctx: &CodeContext<'_>,
    ) -> anyhow::Result<ExecutionResult>;

    /// Run the script once for the input item at `index`.
    async fn invoke_each_item(
        &self,
        item: &Item,
        index: usize,
        ctx: &CodeContext<'_>,
    ) -> anyhow::Result<ExecutionResult>;

    /// Whether a failing item should become an error item instead of
    /// failing the node.  Read by the execution layer, never by the
    /// controller.
    fn continue_on_fail(&self) -> bool {
        false
    }
}
