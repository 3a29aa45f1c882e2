//! Executor configuration.
//!
//! Values come from [`Default`], optionally overlaid by a JSON file; the
//! command line overrides individual fields afterwards.

use std::path::Path;

use nodes::TextKeys;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::EngineError;

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Maximum number of each-item calls in flight.  `1` runs items strictly
    /// one after another.
    pub item_concurrency: usize,
    /// Vocabulary used in diagnostics.
    pub text_keys: TextKeys,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            item_concurrency: 1,
            text_keys: TextKeys::default(),
        }
    }
}

impl ExecutorConfig {
    /// Load and validate a configuration file.  Missing fields keep their
    /// defaults.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        info!("Loading executor configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// [`EngineError::Config`] if concurrency is zero or a noun is blank.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.item_concurrency == 0 {
            return Err(EngineError::Config("itemConcurrency must be at least 1".into()));
        }
        let noun = &self.text_keys.object;
        if noun.singular.trim().is_empty() || noun.plural.trim().is_empty() {
            return Err(EngineError::Config(
                "textKeys.object needs a singular and a plural spelling".into(),
            ));
        }
        Ok(())
    }
}
