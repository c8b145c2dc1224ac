use std::fmt;
use std::sync::Arc;

use crate::data::Dataset;
use crate::ml::LogisticRegression;

/// Type tag of a value flowing along a pipeline edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Dataset,
    Model,
    Metric,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Dataset => write!(f, "Dataset"),
            ArtifactKind::Model => write!(f, "Model"),
            ArtifactKind::Metric => write!(f, "Metric"),
        }
    }
}

/// A value produced by one stage and consumed by others.
#[derive(Debug, Clone)]
pub enum Artifact {
    Dataset(Dataset),
    Model(LogisticRegression),
    Metric(f64),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Dataset(_) => ArtifactKind::Dataset,
            Artifact::Model(_) => ArtifactKind::Model,
            Artifact::Metric(_) => ArtifactKind::Metric,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Artifact::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&LogisticRegression> {
        match self {
            Artifact::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_metric(&self) -> Option<f64> {
        match self {
            Artifact::Metric(v) => Some(*v),
            _ => None,
        }
    }
}

/// One named unit of computation.
///
/// A stage declares the kinds of its input and output ports up front so the
/// [`PipelineBuilder`](super::PipelineBuilder) can check every edge before
/// anything runs. Inputs arrive as shared, read-only artifacts in port order.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn inputs(&self) -> Vec<ArtifactKind>;

    fn outputs(&self) -> Vec<ArtifactKind>;

    fn run(&self, inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>>;
}

/// Fetch input `port` as a dataset; the builder already checked its kind.
pub fn dataset_input(inputs: &[Arc<Artifact>], port: usize) -> anyhow::Result<&Dataset> {
    inputs
        .get(port)
        .and_then(|a| a.as_dataset())
        .ok_or_else(|| anyhow::anyhow!("input {port} is not a Dataset"))
}

/// Fetch input `port` as a fitted model.
pub fn model_input(inputs: &[Arc<Artifact>], port: usize) -> anyhow::Result<&LogisticRegression> {
    inputs
        .get(port)
        .and_then(|a| a.as_model())
        .ok_or_else(|| anyhow::anyhow!("input {port} is not a Model"))
}
