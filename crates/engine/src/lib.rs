//! `engine` crate — Code node models, configuration, and the node executor.

pub mod config;
pub mod error;
pub mod executor;
pub mod models;

pub use config::ExecutorConfig;
pub use error::EngineError;
pub use executor::CodeNodeExecutor;
pub use models::{CodeNodeDefinition, NodeRun};
