//! Errors raised while running a Code node.

use thiserror::Error;

/// A returned value broke the item contract.
///
/// Always a workflow-authoring mistake rather than a system fault, so it
/// carries enough text for the author to fix the script: a short `message`,
/// a `description` with the remedy, and the input position it relates to.
/// Whole-batch mismatches in all-items mode have no `item_index`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ShapeViolation {
    pub message: String,
    pub description: String,
    pub item_index: Option<usize>,
}

impl ShapeViolation {
    /// A violation describing the whole returned value.
    pub fn batch(message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: description.into(),
            item_index: None,
        }
    }

    /// A violation tied to the input item at `index`.
    pub fn at(index: usize, message: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: description.into(),
            item_index: Some(index),
        }
    }
}

/// Errors returned by the Code controller.
///
/// - `Shape`     — the script returned data of the wrong shape.
/// - `Engine`    — the code engine itself failed; passed through untouched.
/// - `Cancelled` — the surrounding run was cancelled before completion.
#[derive(Debug, Error)]
pub enum CodeError {
    #[error(transparent)]
    Shape(#[from] ShapeViolation),

    #[error(transparent)]
    Engine(anyhow::Error),

    #[error("execution was cancelled")]
    Cancelled,
}

impl CodeError {
    /// The item position of a shape violation, if it has one.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::Shape(violation) => violation.item_index,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn as_shape_violation(&self) -> Option<&ShapeViolation> {
        match self {
            Self::Shape(violation) => Some(violation),
            _ => None,
        }
    }
}
