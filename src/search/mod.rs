use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{Config, TrainConfig};
use crate::error::{RecError, Result};
use crate::eval::{evaluate, EvaluationReport, Measure};
use crate::split::KFold;
use crate::store::RatingStore;
use crate::training::Trainer;

/// Winning candidate for one measure.
#[derive(Debug, Clone)]
pub struct BestCandidate {
    pub score: f64,
    /// Position of the winning config in the original grid.
    pub index: usize,
    pub config: TrainConfig,
}

/// Outcome of a grid search: the best averaged score and the config that
/// produced it, per measure, plus the full per-candidate score table.
#[derive(Debug, Clone)]
pub struct SearchResult {
    best: HashMap<Measure, BestCandidate>,
    candidate_scores: Vec<EvaluationReport>,
}

impl SearchResult {
    pub fn best_score(&self, measure: Measure) -> Option<f64> {
        self.best.get(&measure).map(|b| b.score)
    }

    pub fn best_config(&self, measure: Measure) -> Option<&TrainConfig> {
        self.best.get(&measure).map(|b| &b.config)
    }

    pub fn best_index(&self, measure: Measure) -> Option<usize> {
        self.best.get(&measure).map(|b| b.index)
    }

    /// Cross-validation averages for every candidate, in grid order.
    pub fn candidate_scores(&self) -> &[EvaluationReport] {
        &self.candidate_scores
    }
}

/// Cross-validated grid search over training hyperparameters.
///
/// Every (candidate, fold) cell trains an independent model, so the cells
/// run on a rayon worker pool. The pool size only affects wall-clock time:
/// cell results are collected in cell order and reduced sequentially in grid
/// order with a strict minimum, so ties always go to the first-encountered
/// candidate no matter how the scheduler interleaves completions.
#[derive(Debug, Clone)]
pub struct GridSearch {
    cv: usize,
    workers: usize,
    fold_seed: u64,
    measures: Vec<Measure>,
}

impl GridSearch {
    pub fn new(cv: usize) -> Self {
        Self {
            cv,
            workers: 0,
            fold_seed: 0,
            measures: vec![Measure::Rmse, Measure::Mae],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.search.cv).with_workers(config.search.workers)
    }

    /// Worker pool size; 0 delegates to rayon's default.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Seed for the fold assignment shuffle.
    pub fn with_fold_seed(mut self, seed: u64) -> Self {
        self.fold_seed = seed;
        self
    }

    pub fn with_measures(mut self, measures: Vec<Measure>) -> Self {
        self.measures = measures;
        self
    }

    /// Evaluates every candidate with k-fold cross-validation and returns
    /// the per-measure winners.
    pub fn search(&self, store: &RatingStore, grid: &[TrainConfig]) -> Result<SearchResult> {
        if grid.is_empty() {
            return Err(RecError::InvalidArgument(
                "hyperparameter grid is empty".to_string(),
            ));
        }
        if self.measures.is_empty() {
            return Err(RecError::InvalidArgument(
                "at least one measure is required".to_string(),
            ));
        }
        for config in grid {
            config.validate()?;
        }

        let folds = KFold::new(self.cv).with_seed(self.fold_seed).split(store)?;
        let scale = store.scale();

        info!(
            candidates = grid.len(),
            cv = self.cv,
            workers = self.workers,
            "starting grid search"
        );

        // one task per (candidate, fold) cell; results land in cell order
        let cells: Vec<(usize, usize)> = (0..grid.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| RecError::InvalidArgument(format!("worker pool setup failed: {e}")))?;

        let reports: Vec<EvaluationReport> = pool.install(|| {
            cells
                .par_iter()
                .map(|&(c, f)| {
                    let (train, test) = &folds[f];
                    let fold_store = RatingStore::build(train, scale)?;
                    let model = Trainer::fit(&fold_store, &grid[c])?;
                    evaluate(&model, test)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let n_folds = folds.len() as f64;
        let candidate_scores: Vec<EvaluationReport> = (0..grid.len())
            .map(|c| {
                let fold_reports = &reports[c * folds.len()..(c + 1) * folds.len()];
                let averaged = EvaluationReport {
                    rmse: fold_reports.iter().map(|r| r.rmse).sum::<f64>() / n_folds,
                    mae: fold_reports.iter().map(|r| r.mae).sum::<f64>() / n_folds,
                };
                debug!(
                    candidate = c,
                    rmse = averaged.rmse,
                    mae = averaged.mae,
                    "candidate evaluated"
                );
                averaged
            })
            .collect();

        let mut best = HashMap::new();
        for &measure in &self.measures {
            let mut winner: Option<(f64, usize)> = None;
            for (c, report) in candidate_scores.iter().enumerate() {
                let score = report.get(measure);
                // strict comparison keeps the first candidate on ties
                if winner.map_or(true, |(best_score, _)| score < best_score) {
                    winner = Some((score, c));
                }
            }
            if let Some((score, c)) = winner {
                info!(%measure, score, candidate = c, "selected best candidate");
                best.insert(
                    measure,
                    BestCandidate {
                        score,
                        index: c,
                        config: grid[c].clone(),
                    },
                );
            }
        }

        Ok(SearchResult {
            best,
            candidate_scores,
        })
    }
}
