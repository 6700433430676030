//! Tabular transaction data held in memory

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::Serialize;

/// Binary class labels (0 = legitimate, 1 = fraud), aligned with feature rows
pub type Labels = Array1<u8>;

pub const LEGITIMATE: u8 = 0;
pub const FRAUD: u8 = 1;

/// Display names for the two classes, indexed by label value
pub const CLASS_NAMES: [&str; 2] = ["Not Fraud", "Fraud"];

/// Every column of the source file, label included, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    /// One row per transaction; missing cells are NaN
    pub values: Array2<f64>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(columns.len(), values.ncols());
        Self { columns, values }
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }
}

/// Feature matrix with the label column removed
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl Features {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Row counts per class, indexed by label value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub legitimate: usize,
    pub fraud: usize,
}

impl ClassCounts {
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a u8>,
    {
        labels.into_iter().fold(Self::default(), |mut acc, &label| {
            if label == FRAUD {
                acc.fraud += 1;
            } else {
                acc.legitimate += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.legitimate + self.fraud
    }

    pub fn get(&self, label: u8) -> usize {
        if label == FRAUD {
            self.fraud
        } else {
            self.legitimate
        }
    }

    /// Share of rows carrying `label`, 0.0 when empty
    pub fn ratio(&self, label: u8) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(label) as f64 / total as f64
        }
    }

    /// Fraud share as a percentage
    pub fn fraud_rate_pct(&self) -> f64 {
        self.ratio(FRAUD) * 100.0
    }
}
