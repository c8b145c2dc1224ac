use anyhow::{Result, bail};

use super::model::{Dataset, Row};

/// Project the dataset onto `columns`, in the given order.
///
/// Fails if any requested column is absent from the dataset.
pub fn select_columns(dataset: &Dataset, columns: &[&str]) -> Result<Dataset> {
    let mut indices = Vec::with_capacity(columns.len());
    for col in columns {
        match dataset.column_index(col) {
            Some(idx) => indices.push(idx),
            None => bail!(
                "Dataset missing '{col}' column (available: {})",
                dataset.columns.join(", ")
            ),
        }
    }

    let rows = dataset
        .rows
        .iter()
        .map(|row| Row {
            row_id: row.row_id,
            values: indices.iter().map(|&i| row.values[i].clone()).collect(),
        })
        .collect();

    Ok(Dataset::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows,
    ))
}

/// Return indices of rows that have no missing cell.
pub fn complete_indices(dataset: &Dataset) -> Vec<usize> {
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.values.iter().any(|v| v.is_missing()))
        .map(|(i, _)| i)
        .collect()
}

/// Drop every row containing a missing cell.
pub fn drop_missing(dataset: &Dataset) -> Dataset {
    let keep = complete_indices(dataset);
    let dropped = dataset.len() - keep.len();
    if dropped > 0 {
        log::debug!("Dropped {dropped} of {} rows with missing values", dataset.len());
    }
    dataset.take(&keep)
}
