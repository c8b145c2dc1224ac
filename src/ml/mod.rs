//! Classifier fitting and scoring.

pub mod features;
pub mod hyperparams;
pub mod logistic;
pub mod metrics;

use thiserror::Error;

pub use hyperparams::Hyperparameters;
pub use logistic::LogisticRegression;
pub use metrics::accuracy_score;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter { name: &'static str, reason: String },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("training data is empty")]
    EmptyData,

    #[error("need at least two classes to fit a classifier, found {0}")]
    SingleClass(usize),

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("row {row_id}: column '{column}' holds non-numeric value '{value}'")]
    NonNumeric {
        row_id: usize,
        column: String,
        value: String,
    },

    #[error("{0} contains NaN or infinite values")]
    NonFinite(&'static str),

    #[error("gradient became non-finite at iteration {0}")]
    Diverged(usize),

    #[error("model has not been fitted")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, ModelError>;
