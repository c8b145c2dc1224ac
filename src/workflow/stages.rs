//! The four stages of the training workflow.

use std::path::PathBuf;
use std::sync::Arc;

use crate::ml::Hyperparameters;
use crate::pipeline::stage::{dataset_input, model_input};
use crate::pipeline::{Artifact, ArtifactKind, Stage};

use super::{evaluate, get_data, split_data, train_model};

/// Reads the dataset file and keeps the clean target + feature columns.
pub struct LoadData {
    pub path: PathBuf,
}

impl Stage for LoadData {
    fn name(&self) -> &str {
        "get_data"
    }

    fn inputs(&self) -> Vec<ArtifactKind> {
        vec![]
    }

    fn outputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Dataset]
    }

    fn run(&self, _inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
        Ok(vec![Artifact::Dataset(get_data(&self.path)?)])
    }
}

/// Dataset → (train, test).
pub struct SplitData {
    pub test_size: f64,
    pub random_state: u64,
}

impl Stage for SplitData {
    fn name(&self) -> &str {
        "split_data"
    }

    fn inputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Dataset]
    }

    fn outputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Dataset, ArtifactKind::Dataset]
    }

    fn run(&self, inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
        let data = dataset_input(inputs, 0)?;
        let (train, test) = split_data(data, self.test_size, self.random_state)?;
        Ok(vec![Artifact::Dataset(train), Artifact::Dataset(test)])
    }
}

/// Training dataset → fitted model.
pub struct TrainModel {
    pub hyperparameters: Hyperparameters,
}

impl Stage for TrainModel {
    fn name(&self) -> &str {
        "train_model"
    }

    fn inputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Dataset]
    }

    fn outputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Model]
    }

    fn run(&self, inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
        let data = dataset_input(inputs, 0)?;
        let model = train_model(data, &self.hyperparameters)?;
        Ok(vec![Artifact::Model(model)])
    }
}

/// (model, dataset) → accuracy. Named per use so one pipeline can hold several.
pub struct Evaluate {
    pub name: String,
}

impl Evaluate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for Evaluate {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Model, ArtifactKind::Dataset]
    }

    fn outputs(&self) -> Vec<ArtifactKind> {
        vec![ArtifactKind::Metric]
    }

    fn run(&self, inputs: &[Arc<Artifact>]) -> anyhow::Result<Vec<Artifact>> {
        let model = model_input(inputs, 0)?;
        let data = dataset_input(inputs, 1)?;
        Ok(vec![Artifact::Metric(evaluate(model, data)?)])
    }
}
