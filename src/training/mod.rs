pub mod initializer;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::TrainConfig;
use crate::error::Result;
use crate::model::FactorModel;
use crate::store::RatingStore;

/// Standard deviation of the initial factor draws.
const INIT_STD_DEV: f32 = 0.1;

/// Epoch-wise stochastic gradient descent over a rating store.
///
/// Biases start at zero, the global bias at the training mean, and factor
/// rows at small N(0, 0.1) draws. Each epoch visits every rating once in a
/// fresh pseudo-random order; with `random_seed` set, initialization and all
/// epoch shuffles derive from one `StdRng` so a fit is reproducible.
///
/// The trainer does not police divergence: an unbounded learning rate or
/// regularization can blow the factors up to NaN, which then propagates
/// through `predict`. Keeping hyperparameters sane is the caller's job; a
/// debug assertion on the epoch loss is the only internal check.
pub struct Trainer;

impl Trainer {
    /// Fits a fresh model on the full store.
    pub fn fit(store: &RatingStore, config: &TrainConfig) -> Result<FactorModel> {
        Self::fit_with_history(store, config).map(|(model, _)| model)
    }

    /// Fits a fresh model and also returns the per-epoch training RMSE,
    /// computed from the pre-update error of each gradient step.
    pub fn fit_with_history(
        store: &RatingStore,
        config: &TrainConfig,
    ) -> Result<(FactorModel, Vec<f64>)> {
        config.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut model = FactorModel::new(
            store.users_count(),
            store.items_count(),
            config.n_factors,
            store.scale(),
            store.user_ids().to_vec(),
            store.item_ids().to_vec(),
        );

        let ratings: Vec<(usize, usize, f32)> = store.iter().collect();
        model.global_bias =
            ratings.iter().map(|&(_, _, v)| v as f64).sum::<f64>() as f32 / ratings.len() as f32;
        model.user_factors = initializer::factor_rows(
            &mut rng,
            store.users_count(),
            config.n_factors,
            INIT_STD_DEV,
        );
        model.item_factors = initializer::factor_rows(
            &mut rng,
            store.items_count(),
            config.n_factors,
            INIT_STD_DEV,
        );

        let mut order = ratings;
        let mut history = Vec::with_capacity(config.n_epochs);

        for epoch in 1..=config.n_epochs {
            order.shuffle(&mut rng);

            let mut squared_error = 0.0f64;
            for &(u, i, value) in &order {
                let err = model.sgd_step(u, i, value, config.learning_rate, config.regularization);
                squared_error += (err as f64).powi(2);
            }

            let epoch_rmse = (squared_error / order.len() as f64).sqrt();
            debug_assert!(epoch_rmse.is_finite(), "training loss diverged");
            debug!(epoch, rmse = epoch_rmse, "epoch complete");
            history.push(epoch_rmse);
        }

        info!(
            epochs = config.n_epochs,
            n_factors = config.n_factors,
            users = store.users_count(),
            items = store.items_count(),
            final_rmse = history.last().copied().unwrap_or(f64::NAN),
            "training finished"
        );

        Ok((model, history))
    }
}
