use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};
use crate::store::RatingScale;

/// Hyperparameters for one SGD training run. Immutable once handed to the
/// trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    pub n_factors: usize,
    pub random_seed: Option<u64>,
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_epochs == 0 {
            return Err(RecError::InvalidArgument(
                "n_epochs must be positive".to_string(),
            ));
        }
        if self.n_factors == 0 {
            return Err(RecError::InvalidArgument(
                "n_factors must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(RecError::InvalidArgument(format!(
                "learning_rate must be a positive real, got {}",
                self.learning_rate
            )));
        }
        if !(self.regularization >= 0.0) || !self.regularization.is_finite() {
            return Err(RecError::InvalidArgument(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            n_factors: 100,
            random_seed: None,
        }
    }
}

/// Settings driving hyperparameter search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of cross-validation folds, at least 2.
    pub cv: usize,
    /// Worker pool size; 0 means one worker per logical CPU.
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv: 3,
            workers: num_cpus::get(),
        }
    }
}

/// Application-level configuration for callers embedding the core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub scale: RatingScale,
    pub training: TrainConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Loads from a config file layered with `LATENTREC_`-prefixed
    /// environment variables.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LATENTREC"))
            .build()
            .map_err(|e| RecError::InvalidArgument(format!("config load failed: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| RecError::InvalidArgument(format!("config parse failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_hyperparameters() {
        let zero_epochs = TrainConfig {
            n_epochs: 0,
            ..TrainConfig::default()
        };
        assert!(zero_epochs.validate().is_err());

        let zero_factors = TrainConfig {
            n_factors: 0,
            ..TrainConfig::default()
        };
        assert!(zero_factors.validate().is_err());

        let negative_lr = TrainConfig {
            learning_rate: -0.01,
            ..TrainConfig::default()
        };
        assert!(negative_lr.validate().is_err());

        let negative_reg = TrainConfig {
            regularization: -1.0,
            ..TrainConfig::default()
        };
        assert!(negative_reg.validate().is_err());
    }
}
