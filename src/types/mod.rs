//! Type definitions for the training pipeline

pub mod dataset;
pub mod split;

pub use dataset::{ClassCounts, Dataset, Features, Labels, CLASS_NAMES, FRAUD, LEGITIMATE};
pub use split::{Resampled, Split};
