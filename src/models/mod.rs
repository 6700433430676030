//! Binary classifiers

pub mod logistic;

pub use logistic::{LogisticModel, LogisticRegression};
