//! `nodes` crate — the item model and the Code node controller.
//!
//! User code runs through a [`CodeEngine`]; whatever it returns is gated,
//! normalized and validated by [`code::CodeController`] before it re-enters
//! the workflow as [`Item`]s.

pub mod code;
pub mod context;
pub mod error;
pub mod item;
pub mod mock;
pub mod replay;
pub mod traits;

pub use code::{CodeController, RunMode, TextKeys};
pub use context::{CodeContext, RunScope};
pub use error::{CodeError, ShapeViolation};
pub use item::{ExecutionResult, Item, ItemSequence, JsonMap, RECOGNIZED_ITEM_KEYS};
pub use traits::CodeEngine;

#[cfg(test)]
mod controller_tests;
