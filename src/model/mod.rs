use chrono::{DateTime, Utc};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{RecError, Result};
use crate::store::RatingScale;

pub const CHECKPOINT_VERSION: &str = "latentrec-v1";

/// Biased matrix-factorization model.
///
/// Holds the global bias, per-user and per-item bias vectors, and dense
/// latent factor rows for every user and item seen at training time, plus
/// the id mappings of the store it was fitted on. The latent dimensionality
/// is fixed at construction.
#[derive(Debug, Clone)]
pub struct FactorModel {
    pub(crate) global_bias: f32,
    pub(crate) user_biases: Vec<f32>,
    pub(crate) item_biases: Vec<f32>,
    pub(crate) user_factors: Vec<DVector<f32>>,
    pub(crate) item_factors: Vec<DVector<f32>>,
    n_factors: usize,
    scale: RatingScale,
    user_ids: Vec<i64>,
    item_ids: Vec<i64>,
    user_index: HashMap<i64, usize>,
    item_index: HashMap<i64, usize>,
}

impl FactorModel {
    /// Zero-initialized model; the trainer overwrites the factor rows with
    /// random draws before the first epoch.
    pub(crate) fn new(
        n_users: usize,
        n_items: usize,
        n_factors: usize,
        scale: RatingScale,
        user_ids: Vec<i64>,
        item_ids: Vec<i64>,
    ) -> Self {
        let user_index = user_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let item_index = item_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        Self {
            global_bias: 0.0,
            user_biases: vec![0.0; n_users],
            item_biases: vec![0.0; n_items],
            user_factors: vec![DVector::zeros(n_factors); n_users],
            item_factors: vec![DVector::zeros(n_factors); n_items],
            n_factors,
            scale,
            user_ids,
            item_ids,
            user_index,
            item_index,
        }
    }

    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    pub fn users_count(&self) -> usize {
        self.user_biases.len()
    }

    pub fn items_count(&self) -> usize {
        self.item_biases.len()
    }

    pub fn global_bias(&self) -> f32 {
        self.global_bias
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Unclamped score for a known (user, item) index pair.
    fn raw_score(&self, user_index: usize, item_index: usize) -> f32 {
        self.global_bias
            + self.user_biases[user_index]
            + self.item_biases[item_index]
            + self.user_factors[user_index].dot(&self.item_factors[item_index])
    }

    /// Predicted rating, clamped to the training scale.
    ///
    /// An index outside the trained range on either side is a cold start:
    /// the prediction falls back to the clamped global bias instead of
    /// failing.
    pub fn predict(&self, user_index: usize, item_index: usize) -> f32 {
        if user_index >= self.users_count() || item_index >= self.items_count() {
            return self.scale.clamp(self.global_bias);
        }
        self.scale.clamp(self.raw_score(user_index, item_index))
    }

    /// Predicts from external ids, resolving through the id maps captured at
    /// training time. Unseen ids take the same cold-start fallback as
    /// out-of-range indices.
    pub fn predict_pair(&self, user_id: i64, item_id: i64) -> f32 {
        match (
            self.user_index.get(&user_id),
            self.item_index.get(&item_id),
        ) {
            (Some(&u), Some(&i)) => self.predict(u, i),
            _ => self.scale.clamp(self.global_bias),
        }
    }

    /// One stochastic gradient step on a single observation.
    ///
    /// Computes the error against the unclamped score, then nudges both
    /// biases and both factor rows by `lr * (err * partial - reg * param)`.
    /// Returns the pre-update error for loss tracking.
    ///
    /// Both indices must be in range; the trainer only feeds indices interned
    /// by the store it is fitting.
    pub(crate) fn sgd_step(
        &mut self,
        user_index: usize,
        item_index: usize,
        actual: f32,
        learning_rate: f64,
        regularization: f64,
    ) -> f32 {
        let lr = learning_rate as f32;
        let reg = regularization as f32;
        let err = actual - self.raw_score(user_index, item_index);

        self.user_biases[user_index] += lr * (err - reg * self.user_biases[user_index]);
        self.item_biases[item_index] += lr * (err - reg * self.item_biases[item_index]);

        let user_row = self.user_factors[user_index].clone();
        let item_row = self.item_factors[item_index].clone();
        self.user_factors[user_index] += (&item_row * err - &user_row * reg) * lr;
        self.item_factors[item_index] += (&user_row * err - &item_row * reg) * lr;

        err
    }

    /// Persists the model as a JSON checkpoint.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &ModelCheckpoint::from(self))?;
        writer.flush()?;
        Ok(())
    }

    /// Restores a model from a JSON checkpoint written by [`save`].
    ///
    /// [`save`]: FactorModel::save
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let checkpoint: ModelCheckpoint = serde_json::from_reader(reader)?;
        checkpoint.into_model()
    }
}

/// Serializable snapshot of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCheckpoint {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub scale: RatingScale,
    pub n_factors: usize,
    pub global_bias: f32,
    pub user_biases: Vec<f32>,
    pub item_biases: Vec<f32>,
    pub user_factors: Vec<Vec<f32>>,
    pub item_factors: Vec<Vec<f32>>,
    pub user_ids: Vec<i64>,
    pub item_ids: Vec<i64>,
}

impl From<&FactorModel> for ModelCheckpoint {
    fn from(model: &FactorModel) -> Self {
        Self {
            version: CHECKPOINT_VERSION.to_string(),
            trained_at: Utc::now(),
            scale: model.scale,
            n_factors: model.n_factors,
            global_bias: model.global_bias,
            user_biases: model.user_biases.clone(),
            item_biases: model.item_biases.clone(),
            user_factors: model
                .user_factors
                .iter()
                .map(|row| row.as_slice().to_vec())
                .collect(),
            item_factors: model
                .item_factors
                .iter()
                .map(|row| row.as_slice().to_vec())
                .collect(),
            user_ids: model.user_ids.clone(),
            item_ids: model.item_ids.clone(),
        }
    }
}

impl ModelCheckpoint {
    pub fn into_model(self) -> Result<FactorModel> {
        let n_users = self.user_ids.len();
        let n_items = self.item_ids.len();

        if self.user_biases.len() != n_users
            || self.item_biases.len() != n_items
            || self.user_factors.len() != n_users
            || self.item_factors.len() != n_items
        {
            return Err(RecError::InvalidData(format!(
                "checkpoint dimensions are inconsistent: {n_users} users, {n_items} items"
            )));
        }
        for row in self.user_factors.iter().chain(self.item_factors.iter()) {
            if row.len() != self.n_factors {
                return Err(RecError::InvalidData(format!(
                    "checkpoint factor row has length {}, expected {}",
                    row.len(),
                    self.n_factors
                )));
            }
        }

        let mut model = FactorModel::new(
            n_users,
            n_items,
            self.n_factors,
            self.scale,
            self.user_ids,
            self.item_ids,
        );
        model.global_bias = self.global_bias;
        model.user_biases = self.user_biases;
        model.item_biases = self.item_biases;
        model.user_factors = self
            .user_factors
            .into_iter()
            .map(DVector::from_vec)
            .collect();
        model.item_factors = self
            .item_factors
            .into_iter()
            .map(DVector::from_vec)
            .collect();

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> FactorModel {
        let mut model = FactorModel::new(
            2,
            2,
            3,
            RatingScale::default(),
            vec![7, 8],
            vec![100, 200],
        );
        model.global_bias = 3.0;
        model.user_biases = vec![0.5, -0.5];
        model.item_biases = vec![0.25, -0.25];
        model.user_factors[0] = DVector::from_vec(vec![0.1, 0.2, 0.3]);
        model.item_factors[0] = DVector::from_vec(vec![0.3, 0.2, 0.1]);
        model
    }

    #[test]
    fn predict_is_clamped_to_scale() {
        let mut model = tiny_model();
        model.user_biases[0] = 100.0;
        assert_eq!(model.predict(0, 0), 5.0);

        model.user_biases[0] = -100.0;
        assert_eq!(model.predict(0, 0), 1.0);
    }

    #[test]
    fn unknown_index_falls_back_to_global_bias() {
        let model = tiny_model();
        assert_eq!(model.predict(99, 0), 3.0);
        assert_eq!(model.predict(0, 99), 3.0);
        assert_eq!(model.predict_pair(12345, 100), 3.0);
        assert_eq!(model.predict_pair(7, 999), 3.0);
    }

    #[test]
    fn predict_pair_resolves_known_ids() {
        let model = tiny_model();
        assert_eq!(model.predict_pair(7, 100), model.predict(0, 0));
        assert_eq!(model.predict_pair(8, 200), model.predict(1, 1));
    }

    #[test]
    fn save_surfaces_io_errors() {
        let model = tiny_model();
        let err = model
            .save("/nonexistent-latentrec-dir/model.json")
            .unwrap_err();
        assert!(matches!(err, RecError::Io(_)));
    }

    #[test]
    fn sgd_step_reduces_error() {
        let mut model = tiny_model();
        let before = model.sgd_step(0, 0, 5.0, 0.1, 0.0);
        let after = 5.0 - model.predict(0, 0);
        assert!(after.abs() < before.abs());
    }

    #[test]
    fn sgd_step_returns_pre_update_error() {
        let mut model = tiny_model();
        let expected = 5.0
            - (model.global_bias
                + model.user_biases[0]
                + model.item_biases[0]
                + model.user_factors[0].dot(&model.item_factors[0]));
        let err = model.sgd_step(0, 0, 5.0, 0.01, 0.02);
        assert!((err - expected).abs() < 1e-6);
    }
}
