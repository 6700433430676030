//! Fraud Classifier Training Library
//!
//! Trains a logistic regression fraud classifier on a heavily imbalanced
//! credit card transactions dataset: stratified splitting, SMOTE rebalancing
//! of the training partition and evaluation on the untouched test partition.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod resample;
pub mod split;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use evaluation::{ClassificationReport, ConfusionMatrix, Evaluation};
pub use models::{LogisticModel, LogisticRegression};
pub use pipeline::PipelineReport;
pub use resample::Smote;
pub use types::{Dataset, Features, Labels, Split};
