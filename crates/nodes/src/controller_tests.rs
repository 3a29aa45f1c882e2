//! Tests for `CodeController` driven by `MockEngine`.
//!
//! These cover the controller's orchestration: call counts, ordering,
//! cancellation and how engine faults and shape violations surface.  The
//! shape rules themselves are tested next to the validator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::code::{CodeController, TextKeys};
use crate::context::{CodeContext, RunScope};
use crate::error::CodeError;
use crate::item::{ExecutionResult, Item};
use crate::mock::MockEngine;
use crate::traits::CodeEngine;

fn batch(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::from_json(json!({ "n": i })).unwrap())
        .collect()
}

fn controller(engine: Arc<MockEngine>) -> CodeController {
    CodeController::new(engine, TextKeys::default())
}

fn json_of(item: &Item) -> Value {
    Value::Object(item.json.clone())
}

// ============================================================
// All-items mode
// ============================================================

#[tokio::test]
async fn all_items_invokes_engine_once() {
    let engine = Arc::new(MockEngine::returning(json!([{ "json": { "a": 1 } }, { "json": { "a": 2 } }])));
    let items = controller(engine.clone())
        .run_all_items(&batch(5), &RunScope::new("Code"))
        .await
        .expect("valid items");

    assert_eq!(engine.call_count(), 1);
    assert_eq!(items.len(), 2);
    assert_eq!(json_of(&items[1]), json!({ "a": 2 }));
}

#[tokio::test]
async fn all_items_does_not_add_paired_items() {
    let engine = Arc::new(MockEngine::returning(json!([{ "a": 1 }])));
    let items = controller(engine)
        .run_all_items(&batch(1), &RunScope::new("Code"))
        .await
        .unwrap();
    assert_eq!(items[0].paired_item, None);
}

#[tokio::test]
async fn all_items_engine_fault_passes_through() {
    let engine = Arc::new(MockEngine::failing("SyntaxError: Unexpected token"));
    let err = controller(engine)
        .run_all_items(&batch(2), &RunScope::new("Code"))
        .await
        .unwrap_err();

    assert!(matches!(err, CodeError::Engine(_)));
    assert_eq!(err.to_string(), "SyntaxError: Unexpected token");
}

#[tokio::test]
async fn all_items_shape_violation_has_no_index() {
    let engine = Arc::new(MockEngine::returning_undefined());
    let err = controller(engine)
        .run_all_items(&batch(2), &RunScope::new("Code"))
        .await
        .unwrap_err();

    let violation = err.as_shape_violation().expect("shape violation");
    assert_eq!(violation.item_index, None);
    assert!(violation.description.contains("'undefined' was returned instead"));
}

// ============================================================
// Each-item mode
// ============================================================

#[tokio::test]
async fn each_item_runs_in_input_order_and_links_items() {
    let engine = Arc::new(MockEngine::per_item(|item, i| json!({ "json": { "x": i, "seen": item.json["n"] } })));
    let items = controller(engine.clone())
        .run_each_item(&batch(3), &RunScope::new("Code"))
        .await
        .unwrap();

    assert_eq!(engine.called_indexes(), vec![0, 1, 2]);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.json["x"], json!(i));
        assert_eq!(item.json["seen"], json!(i));
        assert_eq!(item.paired_item, Some(json!({ "item": i })));
    }
}

#[tokio::test]
async fn each_item_keeps_script_paired_item() {
    let engine = Arc::new(MockEngine::returning(json!({ "json": {}, "pairedItem": { "item": 9 } })));
    let items = controller(engine)
        .run_each_item(&batch(1), &RunScope::new("Code"))
        .await
        .unwrap();
    assert_eq!(items[0].paired_item, Some(json!({ "item": 9 })));
}

#[tokio::test]
async fn each_item_stops_at_first_failure() {
    let engine = Arc::new(MockEngine::failing_at(1, "ReferenceError: x is not defined", json!({ "ok": true })));
    let err = controller(engine.clone())
        .run_each_item(&batch(4), &RunScope::new("Code"))
        .await
        .unwrap_err();

    assert!(matches!(err, CodeError::Engine(_)));
    // Item 2 and 3 were never started.
    assert_eq!(engine.called_indexes(), vec![0, 1]);
}

#[tokio::test]
async fn each_item_violation_is_scoped_to_its_index() {
    let engine = Arc::new(MockEngine::per_item(|_, i| if i == 2 { json!("oops") } else { json!({ "i": i }) }));
    let err = controller(engine)
        .run_each_item(&batch(3), &RunScope::new("Code"))
        .await
        .unwrap_err();

    assert_eq!(err.item_index(), Some(2));
    assert_eq!(err.to_string(), "Code doesn't return an object");
}

#[tokio::test]
async fn collect_each_item_returns_every_outcome() {
    let engine = Arc::new(MockEngine::per_item(|_, i| if i == 1 { json!([]) } else { json!({ "i": i }) }));
    let outcomes = controller(engine.clone())
        .collect_each_item(&batch(3), &RunScope::new("Code"))
        .await;

    assert_eq!(engine.call_count(), 3);
    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[1].as_ref().unwrap_err().item_index(), Some(1));
    assert_eq!(outcomes[2].as_ref().unwrap().json["i"], json!(2));
}

#[tokio::test]
async fn empty_batch_never_invokes_engine_in_each_item_mode() {
    let engine = Arc::new(MockEngine::returning(json!({})));
    let items = controller(engine.clone())
        .run_each_item(&[], &RunScope::new("Code"))
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(engine.call_count(), 0);
}

// ============================================================
// Concurrency
// ============================================================

#[tokio::test(start_paused = true)]
async fn concurrent_items_are_emitted_in_input_order() {
    // Later items finish first.
    let engine = Arc::new(
        MockEngine::per_item(|_, i| json!({ "i": i })).with_latency(|i| Duration::from_millis(100 - 20 * i as u64)),
    );
    let items = controller(engine.clone())
        .with_item_concurrency(4)
        .run_each_item(&batch(4), &RunScope::new("Code"))
        .await
        .unwrap();

    let order: Vec<Value> = items.iter().map(|item| item.json["i"].clone()).collect();
    assert_eq!(order, vec![json!(0), json!(1), json!(2), json!(3)]);
    assert_eq!(engine.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn concurrent_failure_starts_no_further_items() {
    // Item 1 fails while item 0 is still running.
    let engine = Arc::new(
        MockEngine::per_item(|_, i| if i == 1 { json!("bad") } else { json!({ "i": i }) })
            .with_latency(|i| Duration::from_millis(if i == 0 { 100 } else { 0 })),
    );
    let err = controller(engine.clone())
        .with_item_concurrency(2)
        .run_each_item(&batch(4), &RunScope::new("Code"))
        .await
        .unwrap_err();

    assert_eq!(err.item_index(), Some(1));
    assert_eq!(engine.called_indexes(), vec![0, 1]);
}

#[test]
fn concurrency_is_at_least_one() {
    let engine = Arc::new(MockEngine::returning(json!({})));
    assert_eq!(controller(engine).with_item_concurrency(0).item_concurrency(), 1);
}

// ============================================================
// Cancellation
// ============================================================

/// Cancels the run while answering the call for `cancel_at`.
struct CancellingEngine {
    cancel: CancellationToken,
    cancel_at: usize,
    inner: MockEngine,
}

#[async_trait]
impl CodeEngine for CancellingEngine {
    async fn invoke_all_items(&self, batch: &[Item], ctx: &CodeContext<'_>) -> anyhow::Result<ExecutionResult> {
        self.inner.invoke_all_items(batch, ctx).await
    }

    async fn invoke_each_item(
        &self,
        item: &Item,
        index: usize,
        ctx: &CodeContext<'_>,
    ) -> anyhow::Result<ExecutionResult> {
        if index == self.cancel_at {
            self.cancel.cancel();
        }
        self.inner.invoke_each_item(item, index, ctx).await
    }
}

#[tokio::test]
async fn cancellation_stops_further_invocations() {
    let cancel = CancellationToken::new();
    let engine = Arc::new(CancellingEngine {
        cancel: cancel.clone(),
        cancel_at: 1,
        inner: MockEngine::per_item(|_, i| json!({ "i": i })),
    });
    let scope = RunScope::new("Code").with_cancellation(cancel);

    let err = CodeController::new(engine.clone(), TextKeys::default())
        .run_each_item(&batch(4), &scope)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(engine.inner.called_indexes(), vec![0, 1]);
}

#[tokio::test]
async fn cancelled_scope_never_calls_engine() {
    let engine = Arc::new(MockEngine::returning(json!([])));
    let scope = RunScope::new("Code");
    scope.cancel.cancel();

    let err = controller(engine.clone()).run_all_items(&batch(1), &scope).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(engine.call_count(), 0);
}
