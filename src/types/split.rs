//! Train/test partitions and the rebalanced training set

use super::dataset::{ClassCounts, Labels};
use ndarray::Array2;

/// Stratified train/test partition; features and labels stay row-aligned
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train_features: Array2<f64>,
    pub test_features: Array2<f64>,
    pub train_labels: Labels,
    pub test_labels: Labels,
    /// Source row index of every training row
    pub train_indices: Vec<usize>,
    /// Source row index of every test row
    pub test_indices: Vec<usize>,
}

impl Split {
    pub fn train_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(self.train_labels.iter())
    }

    pub fn test_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(self.test_labels.iter())
    }
}

/// Training set after synthetic minority oversampling
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    /// Original training rows in order, followed by synthetic rows
    pub features: Array2<f64>,
    pub labels: Labels,
    /// Number of synthetic rows appended
    pub synthetic: usize,
}

impl Resampled {
    pub fn counts(&self) -> ClassCounts {
        ClassCounts::from_labels(self.labels.iter())
    }
}
