use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{RecError, Result};
use crate::store::{Rating, RatingStore};

/// Seeded random holdout partition of a store's ratings.
///
/// The test side receives `ceil(n * test_fraction)` ratings, capped so at
/// least one rating stays on each side. `test_fraction` must lie strictly
/// inside (0, 1). Re-running with the same seed reproduces the partition
/// exactly.
pub fn holdout(
    store: &RatingStore,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<Rating>, Vec<Rating>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(RecError::InvalidArgument(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n = store.ratings_count();
    if n < 2 {
        return Err(RecError::InvalidArgument(
            "holdout needs at least two ratings".to_string(),
        ));
    }

    let mut positions: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    positions.shuffle(&mut rng);

    let test_size = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
    let test = store.subset(&positions[..test_size]);
    let train = store.subset(&positions[test_size..]);

    Ok((train, test))
}

/// K-fold cross-validator over a store's ratings.
///
/// Each rating lands in exactly one test fold; the remainder when `n` does
/// not divide evenly is spread over the leading folds.
#[derive(Debug, Clone)]
pub struct KFold {
    k: usize,
    seed: Option<u64>,
}

impl KFold {
    pub fn new(k: usize) -> Self {
        Self { k, seed: None }
    }

    /// Shuffle positions with a fixed seed before folding, for reproducible
    /// splits.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generates `k` (train, test) rating pairs covering the store.
    pub fn split(&self, store: &RatingStore) -> Result<Vec<(Vec<Rating>, Vec<Rating>)>> {
        let n = store.ratings_count();
        if self.k < 2 {
            return Err(RecError::InvalidArgument(format!(
                "k-fold needs at least 2 folds, got {}",
                self.k
            )));
        }
        if self.k > n {
            return Err(RecError::InvalidArgument(format!(
                "cannot split {n} ratings into {} folds",
                self.k
            )));
        }

        let mut positions: Vec<usize> = (0..n).collect();
        if let Some(seed) = self.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            positions.shuffle(&mut rng);
        }

        let fold_size = n / self.k;
        let remainder = n % self.k;

        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for fold in 0..self.k {
            let current_size = if fold < remainder {
                fold_size + 1
            } else {
                fold_size
            };
            let end = start + current_size;

            let test = store.subset(&positions[start..end]);
            let mut train_positions = Vec::with_capacity(n - current_size);
            train_positions.extend_from_slice(&positions[..start]);
            train_positions.extend_from_slice(&positions[end..]);
            let train = store.subset(&train_positions);

            folds.push((train, test));
            start = end;
        }

        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RatingScale;

    fn store_of(n: i64) -> RatingStore {
        let ratings: Vec<Rating> = (0..n)
            .map(|i| Rating::new(i % 7, i, 1.0 + (i % 5) as f32))
            .collect();
        RatingStore::build(&ratings, RatingScale::default()).unwrap()
    }

    #[test]
    fn holdout_partitions_without_overlap() {
        let store = store_of(20);
        let (train, test) = holdout(&store, 0.25, 42).unwrap();

        assert_eq!(train.len() + test.len(), 20);
        assert_eq!(test.len(), 5);
        for rating in &test {
            assert!(!train.contains(rating));
        }
    }

    #[test]
    fn holdout_is_seed_reproducible() {
        let store = store_of(20);
        let (train_a, test_a) = holdout(&store, 0.25, 42).unwrap();
        let (train_b, test_b) = holdout(&store, 0.25, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);

        let (_, test_c) = holdout(&store, 0.25, 43).unwrap();
        assert_ne!(test_a, test_c);
    }

    #[test]
    fn holdout_rejects_degenerate_fractions() {
        let store = store_of(10);
        assert!(holdout(&store, 0.0, 1).is_err());
        assert!(holdout(&store, 1.0, 1).is_err());
        assert!(holdout(&store, -0.5, 1).is_err());
        assert!(holdout(&store, f64::NAN, 1).is_err());
    }

    #[test]
    fn kfold_covers_every_rating_exactly_once() {
        let store = store_of(17);
        let folds = KFold::new(5).with_seed(9).split(&store).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen: Vec<Rating> = Vec::new();
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 17);
            for rating in test {
                assert!(!seen.contains(rating), "test folds must be disjoint");
                assert!(!train.contains(rating));
                seen.push(*rating);
            }
        }
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn kfold_spreads_the_remainder_over_leading_folds() {
        let store = store_of(11);
        let folds = KFold::new(3).split(&store).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
    }

    #[test]
    fn kfold_rejects_bad_fold_counts() {
        let store = store_of(4);
        assert!(KFold::new(1).split(&store).is_err());
        assert!(KFold::new(5).split(&store).is_err());
    }
}
