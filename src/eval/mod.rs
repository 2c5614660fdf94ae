use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RecError, Result};
use crate::model::FactorModel;
use crate::store::Rating;

/// Accuracy measures supported by the evaluator and grid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Rmse,
    Mae,
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Rmse => write!(f, "rmse"),
            Measure::Mae => write!(f, "mae"),
        }
    }
}

/// Prediction accuracy over a held-out set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rmse: f64,
    pub mae: f64,
}

impl EvaluationReport {
    pub fn get(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Rmse => self.rmse,
            Measure::Mae => self.mae,
        }
    }
}

/// Scores a model against held-out ratings.
///
/// Predictions go through the model's clamped, cold-start-aware path, so
/// test triples naming users or items absent from training contribute the
/// global-bias fallback rather than an error. An empty test set has no
/// defined metric and is rejected.
pub fn evaluate(model: &FactorModel, test_ratings: &[Rating]) -> Result<EvaluationReport> {
    if test_ratings.is_empty() {
        return Err(RecError::EmptyTestSet);
    }

    let mut squared = 0.0f64;
    let mut absolute = 0.0f64;
    for rating in test_ratings {
        let predicted = model.predict_pair(rating.user_id, rating.item_id);
        let err = (rating.value - predicted) as f64;
        squared += err * err;
        absolute += err.abs();
    }

    let n = test_ratings.len() as f64;
    Ok(EvaluationReport {
        rmse: (squared / n).sqrt(),
        mae: absolute / n,
    })
}
