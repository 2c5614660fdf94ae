pub mod config;
pub mod error;
pub mod eval;
pub mod model;
pub mod search;
pub mod split;
pub mod store;
pub mod training;

pub use config::{Config, SearchConfig, TrainConfig};
pub use error::{RecError, Result};
pub use eval::{evaluate, EvaluationReport, Measure};
pub use model::{FactorModel, ModelCheckpoint};
pub use search::{BestCandidate, GridSearch, SearchResult};
pub use split::{holdout, KFold};
pub use store::{Rating, RatingScale, RatingStore};
pub use training::Trainer;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
