//! The penguin training workflow.
//!
//! Each step is a plain function; [`stages`] wraps them as pipeline stages
//! and [`build_pipeline`] wires them:
//!
//! ```text
//!   get_data ─▶ split_data ─┬─ train ─▶ train_model ─┬─▶ evaluate_train
//!                           │                        └─▶ evaluate_test
//!                           └─ test ─────────────────────▶ evaluate_test
//! ```
//!
//! The two evaluations share a level and run concurrently.

pub mod stages;

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::WorkflowConfig;
use crate::data::{Dataset, filter, loader, split};
use crate::ml::{Hyperparameters, LogisticRegression};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineError, StageReport};

use stages::{Evaluate, LoadData, SplitData, TrainModel};

pub const TARGET: &str = "species";
pub const FEATURES: [&str; 4] = [
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
];

/// Load the dataset, keep the target and feature columns, drop incomplete rows.
pub fn get_data(path: &Path) -> Result<Dataset> {
    let raw = loader::load_file(path)?;
    let mut columns = vec![TARGET];
    columns.extend(FEATURES);
    let selected = filter::select_columns(&raw, &columns)
        .with_context(|| format!("selecting columns from {}", path.display()))?;
    let clean = filter::drop_missing(&selected);
    log::info!("{} of {} rows complete", clean.len(), raw.len());
    Ok(clean)
}

/// Returns `(train, test)`.
pub fn split_data(
    data: &Dataset,
    test_size: f64,
    random_state: u64,
) -> Result<(Dataset, Dataset)> {
    Ok(split::train_test_split(data, test_size, random_state)?)
}

pub fn train_model(
    data: &Dataset,
    hyperparameters: &Hyperparameters,
) -> Result<LogisticRegression> {
    let mut model = LogisticRegression::new(hyperparameters.clone());
    model.fit_dataset(data, TARGET, &FEATURES)?;
    Ok(model)
}

pub fn evaluate(model: &LogisticRegression, data: &Dataset) -> Result<f64> {
    Ok(model.score_dataset(data)?)
}

/// Wire the five workflow stages into a validated pipeline.
pub fn build_pipeline(config: &WorkflowConfig) -> Result<Pipeline, PipelineError> {
    let mut b = PipelineBuilder::new();

    let load = b.add_stage(LoadData {
        path: config.data_path.clone(),
    });
    let split = b.add_stage(SplitData {
        test_size: config.test_size,
        random_state: config.random_state,
    });
    let train = b.add_stage(TrainModel {
        hyperparameters: config.hyperparameters.clone(),
    });
    let eval_train = b.add_stage(Evaluate::new("evaluate_train"));
    let eval_test = b.add_stage(Evaluate::new("evaluate_test"));

    b.connect(load.output(0), split.input(0))
        .connect(split.output(0), train.input(0))
        .connect(train.output(0), eval_train.input(0))
        .connect(split.output(0), eval_train.input(1))
        .connect(train.output(0), eval_test.input(0))
        .connect(split.output(1), eval_test.input(1));

    b.expose("train_data", split.output(0))
        .expose("test_data", split.output(1))
        .expose("model", train.output(0))
        .expose("train_acc", eval_train.output(0))
        .expose("test_acc", eval_test.output(0));

    b.build()
}

/// Result of [`training_workflow`]: the model and its two accuracies.
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub model: LogisticRegression,
    pub train_acc: f64,
    pub test_acc: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub reports: Vec<StageReport>,
}

impl fmt::Display for WorkflowOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?}, {:?})", self.model, self.train_acc, self.test_acc)
    }
}

/// Build and run the workflow for `config`.
pub fn training_workflow(config: &WorkflowConfig) -> Result<WorkflowOutput> {
    config.validate()?;
    let pipeline = build_pipeline(config)?;
    let outputs = pipeline.run()?;

    let missing = |label: &str| anyhow::anyhow!("pipeline produced no '{label}'");
    let model = outputs.model("model").ok_or_else(|| missing("model"))?.clone();
    let train_acc = outputs.metric("train_acc").ok_or_else(|| missing("train_acc"))?;
    let test_acc = outputs.metric("test_acc").ok_or_else(|| missing("test_acc"))?;
    let n_train = outputs.dataset("train_data").map_or(0, Dataset::len);
    let n_test = outputs.dataset("test_data").map_or(0, Dataset::len);

    Ok(WorkflowOutput {
        model,
        train_acc,
        test_acc,
        n_train,
        n_test,
        reports: outputs.reports,
    })
}
