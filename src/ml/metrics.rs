use super::{ModelError, Result};

/// Fraction of positions where the prediction equals the true label.
pub fn accuracy_score<T: PartialEq>(y_true: &[T], y_pred: &[T]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyData);
    }

    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(actual, pred)| actual == pred)
        .count();

    Ok(correct as f64 / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let y = ["a", "b", "c", "a"];
        assert_eq!(accuracy_score(&y, &["a", "b", "c", "a"]).unwrap(), 1.0);
        assert_eq!(accuracy_score(&y, &["a", "a", "a", "a"]).unwrap(), 0.5);
        assert_eq!(accuracy_score(&y, &["c", "c", "a", "b"]).unwrap(), 0.0);
    }

    #[test]
    fn test_accuracy_errors() {
        assert!(matches!(
            accuracy_score(&["a"], &["a", "b"]),
            Err(ModelError::ShapeError { .. })
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(accuracy_score(&empty, &empty), Err(ModelError::EmptyData)));
    }
}
