use serde::{Deserialize, Serialize};

use super::{ModelError, Result};

/// Logistic-regression settings.
///
/// Deserialises from the familiar `{"C": 0.1, "max_iter": 5000}` shape;
/// unknown keys are an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    /// Inverse of L2 regularisation strength; smaller means stronger.
    #[serde(rename = "C", alias = "c")]
    pub c: f64,
    /// Upper bound on gradient-descent iterations.
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this.
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            fit_intercept: true,
        }
    }
}

impl Hyperparameters {
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self {
            c,
            max_iter,
            ..Self::default()
        }
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ModelError::InvalidHyperparameter {
                name: "C",
                reason: format!("must be a positive finite float, got {}", self.c),
            });
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidHyperparameter {
                name: "max_iter",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(ModelError::InvalidHyperparameter {
                name: "tol",
                reason: format!("must be a non-negative finite float, got {}", self.tol),
            });
        }
        Ok(())
    }
}
