use thiserror::Error;

/// Errors raised by the recommendation core.
///
/// All variants are detected and returned synchronously at the call site;
/// nothing here is deferred. Numeric divergence (NaN factors from an
/// unbounded learning rate) is deliberately not represented: hyperparameter
/// sanity is the caller's responsibility and a NaN prediction propagates
/// rather than failing.
#[derive(Debug, Error)]
pub enum RecError {
    #[error("invalid rating data: {0}")]
    InvalidData(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("test set is empty, metrics are undefined")]
    EmptyTestSet,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecError>;
