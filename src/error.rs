//! Error types for the training pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file absent or unreadable
    #[error("dataset not found: '{path}'")]
    DatasetNotFound { path: String },

    /// Too few minority rows for the neighbour search
    #[error("insufficient minority samples for resampling: {available} available, {required} required")]
    InsufficientMinoritySamples { available: usize, required: usize },

    /// Malformed columns, values or labels
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    /// Numerical failure while fitting the classifier
    #[error("solver failure: {0}")]
    Solver(String),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PipelineError::InvalidInput(msg.into())
    }
}
