//! `engine` crate: workflow graph models, structural validation, and the
//! execution engine.

pub mod config;
pub mod dag;
pub mod error;
pub mod executor;
pub mod models;

pub use config::{AppConfig, ConfigError};
pub use dag::validate_workflow;
pub use error::EngineError;
pub use executor::{builtin_registry, ExecutorConfig, NodeRegistry, WorkflowExecutor};
pub use models::{Edge, ExecutionRequest, ExecutionResponse, Node, RunStatus, Workflow};

#[cfg(test)]
mod executor_tests;
