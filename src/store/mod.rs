use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RecError, Result};

/// A single explicit-feedback observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: i64,
    pub item_id: i64,
    pub value: f32,
}

impl Rating {
    pub fn new(user_id: i64, item_id: i64, value: f32) -> Self {
        Self {
            user_id,
            item_id,
            value,
        }
    }
}

/// Declared bounds of the rating scale, e.g. (1, 5) for MovieLens stars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f32,
    pub max: f32,
}

impl RatingScale {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(RecError::InvalidArgument(format!(
                "rating scale must satisfy min < max, got ({min}, {max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

/// Immutable in-memory index of rating triples.
///
/// External user/item ids are mapped to dense contiguous indices in
/// first-seen order, so building twice from the same input sequence yields
/// identical mappings. The store is read-only after `build` and is safe to
/// share across worker threads.
#[derive(Debug, Clone)]
pub struct RatingStore {
    scale: RatingScale,
    // dense (user_index, item_index, value) triples in input order
    triples: Vec<(usize, usize, f32)>,
    user_ids: Vec<i64>,
    item_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    item_index: HashMap<i64, usize>,
}

impl RatingStore {
    /// Builds a store from raw ratings, validating each value against the
    /// scale. Fails on an empty input and on non-finite or out-of-range
    /// values.
    pub fn build(ratings: &[Rating], scale: RatingScale) -> Result<Self> {
        if ratings.is_empty() {
            return Err(RecError::InvalidData(
                "cannot build a rating store from an empty sequence".to_string(),
            ));
        }

        let mut store = Self {
            scale,
            triples: Vec::with_capacity(ratings.len()),
            user_ids: Vec::new(),
            item_ids: Vec::new(),
            user_index: HashMap::new(),
            item_index: HashMap::new(),
        };

        for rating in ratings {
            if !scale.contains(rating.value) {
                return Err(RecError::InvalidData(format!(
                    "rating {} for (user {}, item {}) outside scale [{}, {}]",
                    rating.value, rating.user_id, rating.item_id, scale.min, scale.max
                )));
            }

            let u = store.intern_user(rating.user_id);
            let i = store.intern_item(rating.item_id);
            store.triples.push((u, i, rating.value));
        }

        Ok(store)
    }

    fn intern_user(&mut self, user_id: i64) -> usize {
        if let Some(&idx) = self.user_index.get(&user_id) {
            return idx;
        }
        let idx = self.user_ids.len();
        self.user_ids.push(user_id);
        self.user_index.insert(user_id, idx);
        idx
    }

    fn intern_item(&mut self, item_id: i64) -> usize {
        if let Some(&idx) = self.item_index.get(&item_id) {
            return idx;
        }
        let idx = self.item_ids.len();
        self.item_ids.push(item_id);
        self.item_index.insert(item_id, idx);
        idx
    }

    pub fn users_count(&self) -> usize {
        self.user_ids.len()
    }

    pub fn items_count(&self) -> usize {
        self.item_ids.len()
    }

    pub fn ratings_count(&self) -> usize {
        self.triples.len()
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Restartable iterator over dense `(user_index, item_index, value)`
    /// triples in input order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.triples.iter().copied()
    }

    pub fn user_index(&self, user_id: i64) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn item_index(&self, item_id: i64) -> Option<usize> {
        self.item_index.get(&item_id).copied()
    }

    /// External ids in index order; slot `k` holds the id mapped to index `k`.
    pub fn user_ids(&self) -> &[i64] {
        &self.user_ids
    }

    pub fn item_ids(&self) -> &[i64] {
        &self.item_ids
    }

    /// The stored rating at `position` re-expressed with external ids.
    pub fn rating_at(&self, position: usize) -> Option<Rating> {
        self.triples.get(position).map(|&(u, i, value)| Rating {
            user_id: self.user_ids[u],
            item_id: self.item_ids[i],
            value,
        })
    }

    /// Materializes the ratings at the given positions as raw triples,
    /// suitable for rebuilding a fold-local store.
    pub fn subset(&self, positions: &[usize]) -> Vec<Rating> {
        positions
            .iter()
            .filter_map(|&p| self.rating_at(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ratings() -> Vec<Rating> {
        vec![
            Rating::new(1, 10, 5.0),
            Rating::new(1, 20, 3.0),
            Rating::new(2, 10, 4.0),
            Rating::new(2, 30, 2.0),
        ]
    }

    #[test]
    fn build_assigns_first_seen_indices() {
        let store = RatingStore::build(&sample_ratings(), RatingScale::default()).unwrap();

        assert_eq!(store.users_count(), 2);
        assert_eq!(store.items_count(), 3);
        assert_eq!(store.ratings_count(), 4);
        assert_eq!(store.user_index(1), Some(0));
        assert_eq!(store.user_index(2), Some(1));
        assert_eq!(store.item_index(10), Some(0));
        assert_eq!(store.item_index(20), Some(1));
        assert_eq!(store.item_index(30), Some(2));
        assert_eq!(store.user_index(99), None);
    }

    #[test]
    fn build_is_deterministic() {
        let a = RatingStore::build(&sample_ratings(), RatingScale::default()).unwrap();
        let b = RatingStore::build(&sample_ratings(), RatingScale::default()).unwrap();

        assert_eq!(a.user_ids(), b.user_ids());
        assert_eq!(a.item_ids(), b.item_ids());
        assert_eq!(
            a.iter().collect::<Vec<_>>(),
            b.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn build_rejects_empty_input() {
        let err = RatingStore::build(&[], RatingScale::default()).unwrap_err();
        assert!(matches!(err, RecError::InvalidData(_)));
    }

    #[test]
    fn build_rejects_out_of_scale_values() {
        let ratings = vec![Rating::new(1, 10, 6.5)];
        let err = RatingStore::build(&ratings, RatingScale::default()).unwrap_err();
        assert!(matches!(err, RecError::InvalidData(_)));

        let ratings = vec![Rating::new(1, 10, f32::NAN)];
        assert!(RatingStore::build(&ratings, RatingScale::default()).is_err());
    }

    #[test]
    fn iter_is_restartable() {
        let store = RatingStore::build(&sample_ratings(), RatingScale::default()).unwrap();
        let first: Vec<_> = store.iter().collect();
        let second: Vec<_> = store.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn subset_round_trips_external_ids() {
        let store = RatingStore::build(&sample_ratings(), RatingScale::default()).unwrap();
        let subset = store.subset(&[0, 3]);
        assert_eq!(subset, vec![Rating::new(1, 10, 5.0), Rating::new(2, 30, 2.0)]);
    }
}
