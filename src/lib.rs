//! Declarative training pipelines.
//!
//! Stages are plain Rust values implementing [`pipeline::Stage`]; a
//! [`pipeline::PipelineBuilder`] wires their outputs to inputs and validates
//! the graph before anything runs. [`workflow`] uses this to load the penguin
//! measurements, split them, fit a logistic-regression classifier and score it.

pub mod config;
pub mod data;
pub mod ml;
pub mod pipeline;
pub mod workflow;

pub use config::WorkflowConfig;
pub use workflow::{WorkflowOutput, training_workflow};
