//! Conversion from [`Dataset`] columns to `ndarray` inputs.

use ndarray::Array2;

use crate::data::Dataset;

use super::{ModelError, Result};

/// Build an `(n_rows, n_features)` matrix from numeric columns.
/// NaN and infinite cells are rejected like non-numeric ones.
pub fn feature_matrix(data: &Dataset, features: &[&str]) -> Result<Array2<f64>> {
    let indices = features
        .iter()
        .map(|name| {
            data.column_index(name)
                .ok_or_else(|| ModelError::UnknownColumn(name.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut x = Array2::zeros((data.len(), indices.len()));
    for (i, row) in data.rows.iter().enumerate() {
        for (j, &col) in indices.iter().enumerate() {
            let cell = &row.values[col];
            x[[i, j]] = cell
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ModelError::NonNumeric {
                    row_id: row.row_id,
                    column: features[j].to_string(),
                    value: cell.to_string(),
                })?;
        }
    }
    Ok(x)
}

/// Labels of the target column, rendered as strings.
pub fn target_labels(data: &Dataset, target: &str) -> Result<Vec<String>> {
    let column = data
        .column(target)
        .ok_or_else(|| ModelError::UnknownColumn(target.to_string()))?;
    Ok(column.map(|v| v.to_string()).collect())
}
