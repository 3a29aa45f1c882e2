//! Engine-level error types.

use nodes::CodeError;
use thiserror::Error;

/// Errors produced while executing a Code node.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Execution errors ------

    /// The node failed and was not configured to continue.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: CodeError,
    },

    /// The run was cancelled before the node finished.
    #[error("node '{node}' was cancelled")]
    Cancelled { node: String },

    // ------ Configuration errors ------

    /// The executor configuration is unusable.
    #[error("invalid executor configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// The underlying Code node error, if the node itself failed.
    pub fn code_error(&self) -> Option<&CodeError> {
        match self {
            Self::NodeFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
