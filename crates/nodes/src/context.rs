//! Per-invocation context handed to the code engine.
//!
//! A [`RunScope`] describes one node invocation (identity, parameters,
//! cancellation).  A [`CodeContext`] is built fresh from it for every engine
//! call and exposes the helpers a script sees: the input items, the current
//! item's `json`/`binary`, node parameters and simple `$`-path lookups.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::code::RunMode;
use crate::item::{Item, JsonMap};

/// Immutable description of one Code node invocation.
#[derive(Debug, Clone)]
pub struct RunScope {
    /// ID of the current execution run.
    pub execution_id: Uuid,
    /// Name of the node being executed (used in logs).
    pub node_name: String,
    /// Node parameters, readable by the script.
    pub parameters: Arc<JsonMap>,
    /// Fires when the host run is cancelled.
    pub cancel: CancellationToken,
}

impl RunScope {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            node_name: node_name.into(),
            parameters: Arc::new(JsonMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_execution_id(mut self, execution_id: Uuid) -> Self {
        self.execution_id = execution_id;
        self
    }

    pub fn with_parameters(mut self, parameters: JsonMap) -> Self {
        self.parameters = Arc::new(parameters);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Helpers available to user code during a single engine call.
#[derive(Debug, Clone, Copy)]
pub struct CodeContext<'a> {
    scope: &'a RunScope,
    items: &'a [Item],
    mode: RunMode,
    index: Option<usize>,
}

impl<'a> CodeContext<'a> {
    /// Context for the single all-items invocation.
    pub fn all_items(scope: &'a RunScope, items: &'a [Item]) -> Self {
        Self {
            scope,
            items,
            mode: RunMode::AllItems,
            index: None,
        }
    }

    /// Context for the invocation on input item `index`.
    pub fn each_item(scope: &'a RunScope, items: &'a [Item], index: usize) -> Self {
        Self {
            scope,
            items,
            mode: RunMode::EachItem,
            index: Some(index),
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.scope.execution_id
    }

    pub fn node_name(&self) -> &str {
        &self.scope.node_name
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn item_index(&self) -> Option<usize> {
        self.index
    }

    /// `$input.all()`
    pub fn input_items(&self) -> &'a [Item] {
        self.items
    }

    /// `$input.first()`
    pub fn first_item(&self) -> Option<&'a Item> {
        self.items.first()
    }

    /// `$input.last()`
    pub fn last_item(&self) -> Option<&'a Item> {
        self.items.last()
    }

    /// `$input.item`: only defined in each-item mode.
    pub fn current_item(&self) -> Option<&'a Item> {
        self.index.and_then(|index| self.items.get(index))
    }

    /// `$json`: the current item in each-item mode, the first in all-items.
    pub fn json(&self) -> Option<&'a JsonMap> {
        self.focus().map(|item| &item.json)
    }

    /// `$binary`
    pub fn binary(&self) -> Option<&'a JsonMap> {
        self.focus().and_then(|item| item.binary.as_ref())
    }

    /// `$getNodeParameter(name)`
    pub fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.scope.parameters.get(name)
    }

    /// Resolve a `$`-prefixed dotted path such as `$json.user.name`,
    /// `$binary.file.mimeType` or `$parameter.limit`.  Numeric segments
    /// index into arrays.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let root = match segments.next()? {
            "$json" => self.json()?,
            "$binary" => self.binary()?,
            "$parameter" => &*self.scope.parameters,
            _ => return None,
        };

        let first = segments.next()?;
        let mut current = root.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(object) => object.get(segment)?,
                Value::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn focus(&self) -> Option<&'a Item> {
        match self.mode {
            RunMode::EachItem => self.current_item(),
            RunMode::AllItems => self.first_item(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<Item> {
        vec![
            Item::from_json(json!({ "user": { "name": "ada", "tags": ["x", "y"] } })).unwrap(),
            Item::from_json(json!({ "user": { "name": "bob" } }))
                .unwrap()
                .with_binary(json!({ "file": { "mimeType": "text/plain" } }).as_object().cloned().unwrap()),
        ]
    }

    fn scope() -> RunScope {
        RunScope::new("Code").with_parameters(json!({ "limit": 5 }).as_object().cloned().unwrap())
    }

    #[test]
    fn each_item_context_focuses_current_item() {
        let scope = scope();
        let items = items();
        let ctx = CodeContext::each_item(&scope, &items, 1);
        assert_eq!(ctx.mode(), RunMode::EachItem);
        assert_eq!(ctx.item_index(), Some(1));
        assert_eq!(ctx.lookup("$json.user.name"), Some(&json!("bob")));
        assert_eq!(ctx.lookup("$binary.file.mimeType"), Some(&json!("text/plain")));
        assert_eq!(ctx.input_items().len(), 2);
    }

    #[test]
    fn all_items_context_focuses_first_item() {
        let scope = scope();
        let items = items();
        let ctx = CodeContext::all_items(&scope, &items);
        assert!(ctx.current_item().is_none());
        assert_eq!(ctx.lookup("$json.user.tags.1"), Some(&json!("y")));
        assert_eq!(ctx.binary(), None);
        assert_eq!(ctx.last_item(), items.last());
    }

    #[test]
    fn parameters_are_readable() {
        let scope = scope();
        let ctx = CodeContext::all_items(&scope, &[]);
        assert_eq!(ctx.parameter("limit"), Some(&json!(5)));
        assert_eq!(ctx.lookup("$parameter.limit"), Some(&json!(5)));
        assert_eq!(ctx.json(), None);
    }

    #[test]
    fn unknown_roots_and_paths_resolve_to_none() {
        let scope = scope();
        let items = items();
        let ctx = CodeContext::each_item(&scope, &items, 0);
        assert_eq!(ctx.lookup("$env.HOME"), None);
        assert_eq!(ctx.lookup("$json"), None);
        assert_eq!(ctx.lookup("$json.user.tags.nope"), None);
        assert_eq!(ctx.lookup("$json.user.name.first"), None);
    }
}
