use std::path::PathBuf;
use thiserror::Error;

use crate::utils::validation::{InvalidUserId, TopKError};

/// Problems with the interaction dataset. Always fatal for a training run.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is empty")]
    Empty,

    #[error("dataset contains missing values: row {row} has no `{field}`")]
    MissingValue { row: usize, field: &'static str },

    #[error("row {row}: invalid `{field}` value {value:?}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {source}")]
    InvalidUserId {
        row: usize,
        #[source]
        source: InvalidUserId,
    },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {path} could not be decoded: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("artifact could not be encoded: {0}")]
    Encode(#[source] bincode::Error),

    #[error("artifact shapes disagree: {0}")]
    ShapeMismatch(String),
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    InvalidUserId(#[from] InvalidUserId),
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failures of a single recommendation request as seen by the service layer.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("recommendation model not loaded")]
    NotReady,

    #[error(transparent)]
    InvalidUserId(#[from] InvalidUserId),

    #[error(transparent)]
    InvalidTopK(#[from] TopKError),
}
