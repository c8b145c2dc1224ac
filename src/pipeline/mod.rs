//! Pipeline layer: stages, graph construction and execution.
//!
//! ```text
//!   impl Stage ──add_stage──▶ PipelineBuilder ──connect / expose──┐
//!                                                                 ▼
//!                                                              build()
//!                                   (names, ports, kinds, wiring, cycles)
//!                                                                 │
//!                                                                 ▼
//!                                   Pipeline ──run()──▶ RunOutputs
//!                                   (levels in order, stages within a
//!                                    level in parallel)
//! ```

pub mod builder;
pub mod executor;
pub mod stage;

use thiserror::Error;

pub use builder::{Input, Output, Pipeline, PipelineBuilder, StageId};
pub use executor::{RunOutputs, StageReport};
pub use stage::{Artifact, ArtifactKind, Stage};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),

    #[error("no stage with id {0}")]
    UnknownStage(usize),

    #[error("stage '{stage}' has no {direction} port {port}")]
    UnknownPort {
        stage: String,
        port: usize,
        direction: &'static str,
    },

    #[error(
        "cannot connect {from_stage}.out[{from_port}] ({from_kind}) \
         to {to_stage}.in[{to_port}] ({to_kind})"
    )]
    KindMismatch {
        from_stage: String,
        from_port: usize,
        from_kind: ArtifactKind,
        to_stage: String,
        to_port: usize,
        to_kind: ArtifactKind,
    },

    #[error("input {port} of stage '{stage}' is connected more than once")]
    InputWiredTwice { stage: String, port: usize },

    #[error("input {port} ({kind}) of stage '{stage}' is not connected")]
    UnboundInput {
        stage: String,
        port: usize,
        kind: ArtifactKind,
    },

    #[error("pipeline output '{0}' exposed more than once")]
    DuplicateOutput(String),

    #[error("cycle between stages: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("value for '{stage}' port {port} was never produced")]
    MissingInput { stage: String, port: usize },

    #[error("pipeline output '{0}' was never produced")]
    MissingOutput(String),

    #[error("stage '{stage}' failed")]
    StageFailed {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("stage '{stage}' returned {actual:?}, declared {expected:?}")]
    BadOutputs {
        stage: String,
        expected: Vec<ArtifactKind>,
        actual: Vec<ArtifactKind>,
    },
}
