//! Multinomial logistic regression.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data::Dataset;

use super::features::{feature_matrix, target_labels};
use super::{Hyperparameters, ModelError, Result, accuracy_score};

/// Parameters learned by [`LogisticRegression::fit`].
///
/// Coefficients live in standardised feature space; `feature_mean` and
/// `feature_scale` map raw inputs into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParams {
    /// Sorted class labels; column `k` of `coefficients` scores `classes[k]`.
    pub classes: Vec<String>,
    /// `(n_features, n_classes)`
    pub coefficients: Array2<f64>,
    pub intercepts: Array1<f64>,
    pub feature_mean: Array1<f64>,
    pub feature_scale: Array1<f64>,
    /// Gradient-descent iterations actually run.
    pub n_iter: usize,
    pub converged: bool,
}

/// Softmax classifier with L2 penalty, fitted by full-batch gradient descent.
///
/// Minimises `0.5 * ||W||^2 + C * sum_i cross_entropy_i`; intercepts are not
/// penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub hyperparameters: Hyperparameters,
    /// Label column, set when fitted through [`LogisticRegression::fit_dataset`].
    pub target: Option<String>,
    /// Feature columns in matrix order, set alongside `target`.
    pub features: Vec<String>,
    pub fitted: Option<FittedParams>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(Hyperparameters::default())
    }
}

impl LogisticRegression {
    pub fn new(hyperparameters: Hyperparameters) -> Self {
        Self {
            hyperparameters,
            target: None,
            features: Vec::new(),
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Class labels seen during fitting.
    pub fn classes(&self) -> Result<&[String]> {
        Ok(&self.params()?.classes)
    }

    fn params(&self) -> Result<&FittedParams> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)
    }

    /// Numerically stable row-wise softmax.
    fn softmax(mut logits: Array2<f64>) -> Array2<f64> {
        for mut row in logits.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        logits
    }

    /// Fit on a feature matrix and one label per row.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<&mut Self> {
        let hp = &self.hyperparameters;
        hp.validate()?;

        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ModelError::EmptyData);
        }
        if n_samples != y.len() {
            return Err(ModelError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("feature matrix"));
        }

        let classes: Vec<String> = y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(ModelError::SingleClass(classes.len()));
        }
        let n_classes = classes.len();
        let class_index: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(k, c)| (c.as_str(), k))
            .collect();

        let mut one_hot = Array2::<f64>::zeros((n_samples, n_classes));
        for (i, label) in y.iter().enumerate() {
            one_hot[[i, class_index[label.as_str()]]] = 1.0;
        }

        // Standardise so a single step size suits every feature
        let feature_mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyData)?;
        let feature_scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        let xs = (x - &feature_mean) / &feature_scale;

        // Objective scaled by 1 / (C * n): mean cross-entropy + ||W||^2 / (2 C n).
        // Its gradient is Lipschitz with constant at most 0.5 * (d + 1) + 1 / (C n)
        // on standardised inputs.
        let n = n_samples as f64;
        let penalty = 1.0 / (hp.c * n);
        let intercept_dim = if hp.fit_intercept { 1.0 } else { 0.0 };
        let step = 1.0 / (0.5 * (n_features as f64 + intercept_dim) + penalty);

        let mut weights = Array2::<f64>::zeros((n_features, n_classes));
        let mut intercepts = Array1::<f64>::zeros(n_classes);
        let mut n_iter = 0;
        let mut converged = false;

        for iter in 0..hp.max_iter {
            n_iter = iter + 1;

            let proba = Self::softmax(xs.dot(&weights) + &intercepts);
            let residual = proba - &one_hot;

            let grad_w = xs.t().dot(&residual) / n + &weights * penalty;
            let grad_b = residual.mean_axis(Axis(0)).ok_or(ModelError::EmptyData)?;

            let mut max_grad = max_abs(grad_w.iter(), 0.0);
            if hp.fit_intercept {
                max_grad = max_abs(grad_b.iter(), max_grad);
            }
            if max_grad.is_nan() {
                return Err(ModelError::Diverged(n_iter));
            }
            if iter % 500 == 0 {
                log::debug!("iter {iter}: max |gradient| = {max_grad:.3e}");
            }
            if max_grad < hp.tol {
                converged = true;
                break;
            }

            weights.scaled_add(-step, &grad_w);
            if hp.fit_intercept {
                intercepts.scaled_add(-step, &grad_b);
            }
        }

        if converged {
            log::debug!("Converged after {n_iter} iterations");
        } else {
            log::warn!(
                "Gradient descent did not converge within max_iter={}; increase max_iter",
                hp.max_iter
            );
        }

        self.fitted = Some(FittedParams {
            classes,
            coefficients: weights,
            intercepts,
            feature_mean,
            feature_scale,
            n_iter,
            converged,
        });

        Ok(self)
    }

    /// Fit on named columns of a dataset and remember them for prediction.
    pub fn fit_dataset(
        &mut self,
        data: &Dataset,
        target: &str,
        features: &[&str],
    ) -> Result<&mut Self> {
        let x = feature_matrix(data, features)?;
        let y = target_labels(data, target)?;
        self.fit(&x, &y)?;
        self.target = Some(target.to_string());
        self.features = features.iter().map(|f| f.to_string()).collect();
        Ok(self)
    }

    /// Class membership probabilities, one row per sample, columns ordered
    /// like [`LogisticRegression::classes`].
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params()?;
        if x.ncols() != params.feature_mean.len() {
            return Err(ModelError::ShapeError {
                expected: format!("{} features", params.feature_mean.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let xs = (x - &params.feature_mean) / &params.feature_scale;
        Ok(Self::softmax(xs.dot(&params.coefficients) + &params.intercepts))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<String>> {
        let params = self.params()?;
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(k, _)| k)
                    .unwrap_or(0);
                params.classes[best].clone()
            })
            .collect())
    }

    fn feature_names(&self) -> Result<Vec<&str>> {
        if self.features.is_empty() {
            return Err(ModelError::ShapeError {
                expected: "a model fitted on named columns".to_string(),
                actual: "a model fitted on a raw matrix".to_string(),
            });
        }
        Ok(self.features.iter().map(String::as_str).collect())
    }

    /// Predict labels for the rows of a dataset using the fitted feature columns.
    pub fn predict_dataset(&self, data: &Dataset) -> Result<Vec<String>> {
        let x = feature_matrix(data, &self.feature_names()?)?;
        self.predict(&x)
    }

    /// Accuracy of the model's predictions against the dataset's target column.
    pub fn score_dataset(&self, data: &Dataset) -> Result<f64> {
        let target = self.target.as_deref().ok_or(ModelError::NotFitted)?;
        let y_true = target_labels(data, target)?;
        let y_pred = self.predict_dataset(data)?;
        accuracy_score(&y_true, &y_pred)
    }
}

/// Largest absolute value, NaN if any element is NaN.
fn max_abs<'a>(values: impl Iterator<Item = &'a f64>, init: f64) -> f64 {
    values.fold(init, |m, g| {
        if m.is_nan() || g.is_nan() {
            f64::NAN
        } else {
            m.max(g.abs())
        }
    })
}

impl fmt::Display for LogisticRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogisticRegression(C={}, max_iter={})",
            self.hyperparameters.c, self.hyperparameters.max_iter
        )
    }
}
