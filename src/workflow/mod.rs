//! Export/import workflow: selection state, package discovery and the step engine.

mod discovery;
mod engine;
mod state;

pub use engine::{WorkflowEngine, WorkflowOptions, WorkflowSeed};
pub use state::{AuthMethod, Flow, SelectionState, ServerRef, Target};
