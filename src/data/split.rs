use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use super::model::Dataset;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test_size must lie strictly between 0 and 1, got {0}")]
    InvalidTestSize(f64),

    #[error(
        "with n_samples={n_samples} and test_size={test_size}, the resulting \
         train set ({n_train} rows) or test set ({n_test} rows) would be empty"
    )]
    EmptyPartition {
        n_samples: usize,
        test_size: f64,
        n_train: usize,
        n_test: usize,
    },
}

/// Row counts `(n_train, n_test)` for a shuffle split of `n_samples` rows.
///
/// The test share is rounded up, the train set gets the remainder.
pub fn split_sizes(n_samples: usize, test_size: f64) -> Result<(usize, usize), SplitError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SplitError::InvalidTestSize(test_size));
    }
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_train == 0 || n_test == 0 {
        return Err(SplitError::EmptyPartition {
            n_samples,
            test_size,
            n_train,
            n_test,
        });
    }
    Ok((n_train, n_test))
}

/// Shuffle the row indices with an RNG seeded by `random_state`, then take
/// the first `n_test` permuted rows as the test set and the rest as train.
///
/// Returns `(train, test)`. Both keep the input's columns and each row's
/// `row_id`; together they cover the input exactly once.
pub fn train_test_split(
    data: &Dataset,
    test_size: f64,
    random_state: u64,
) -> Result<(Dataset, Dataset), SplitError> {
    let (n_train, n_test) = split_sizes(data.len(), test_size)?;

    let mut rng = StdRng::seed_from_u64(random_state);
    let mut permutation: Vec<usize> = (0..data.len()).collect();
    permutation.shuffle(&mut rng);

    let (test_idx, train_idx) = permutation.split_at(n_test);

    log::debug!(
        "Dataset split: {n_train} training, {n_test} test (seed {random_state})"
    );

    Ok((data.take(train_idx), data.take(test_idx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;

    fn numbered(n: usize) -> Dataset {
        Dataset::from_records(
            vec!["x".into()],
            (0..n).map(|i| vec![Value::Integer(i as i64)]).collect(),
        )
    }

    #[test]
    fn test_correct_split_sizes() {
        let (train, test) = train_test_split(&numbered(100), 0.2, 42).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn test_test_share_rounds_up() {
        // 0.2 * 333 = 66.6 -> 67 test rows
        assert_eq!(split_sizes(333, 0.2).unwrap(), (266, 67));
        assert_eq!(split_sizes(10, 0.25).unwrap(), (7, 3));
    }

    #[test]
    fn test_partitions_are_disjoint_cover() {
        let data = numbered(57);
        let (train, test) = train_test_split(&data, 0.3, 7).unwrap();
        let train_ids = train.row_ids();
        let test_ids = test.row_ids();
        assert!(train_ids.is_disjoint(&test_ids));
        let union: std::collections::BTreeSet<usize> =
            train_ids.union(&test_ids).copied().collect();
        assert_eq!(union, data.row_ids());
    }

    #[test]
    fn test_same_seed_same_partition() {
        let data = numbered(40);
        let a = train_test_split(&data, 0.25, 42).unwrap();
        let b = train_test_split(&data, 0.25, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_shuffles_differently() {
        let data = numbered(200);
        let (_, a) = train_test_split(&data, 0.5, 1).unwrap();
        let (_, b) = train_test_split(&data, 0.5, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_test_size() {
        for bad in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                train_test_split(&numbered(10), bad, 0),
                Err(SplitError::InvalidTestSize(_))
            ));
        }
    }

    #[test]
    fn test_empty_partition_rejected() {
        // a single row cannot feed both sides
        assert!(matches!(
            train_test_split(&numbered(1), 0.2, 0),
            Err(SplitError::EmptyPartition { .. })
        ));
        assert!(matches!(
            train_test_split(&numbered(0), 0.2, 0),
            Err(SplitError::EmptyPartition { .. })
        ));
        // 0.95 * 10 rounds up to every row
        assert!(matches!(
            train_test_split(&numbered(10), 0.95, 0),
            Err(SplitError::EmptyPartition { .. })
        ));
    }
}
