//! `nodes` crate: the `ExecutableNode` trait and built-in node implementations.
//!
//! Every node kind the engine can run implements [`ExecutableNode`]; the
//! engine dispatches through a table of these trait objects keyed by type
//! tag. The collaborators the built-ins call out to (weather API, email
//! transport, form validator) live here too, each behind its own trait.

pub mod builtin;
pub mod context;
pub mod data;
pub mod email;
pub mod error;
pub mod integration;
pub mod mock;
pub mod output;
pub mod traits;
pub mod validator;
pub mod value;

pub use context::{ExecutionContext, ExecutionStep, StepStatus};
pub use data::{NodeData, NodeKind};
pub use error::NodeError;
pub use output::StepOutput;
pub use traits::{ExecutableNode, NodeInvocation, Route};
pub use value::{Variable, Variables};
