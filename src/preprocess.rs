//! Label extraction and column standardization.
//!
//! Splits a loaded [`Dataset`] into a feature matrix and a label vector, then
//! rescales the designated columns (amount and time) to zero mean and unit
//! variance. The remaining columns are assumed to be normalized upstream.

use crate::error::{PipelineError, Result};
use crate::types::{Dataset, Features, Labels, FRAUD, LEGITIMATE};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::Serialize;
use tracing::debug;

/// Zero-mean / unit-variance scaler for a single column.
///
/// Uses the population variance; a constant column keeps scale 1.0 so the
/// transform only centres it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StandardScaler {
    pub mean: f64,
    pub variance: f64,
}

impl StandardScaler {
    pub fn fit(values: ArrayView1<'_, f64>) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                variance: 0.0,
            };
        }
        let mean = values.sum() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        Self { mean, variance }
    }

    pub fn scale(&self) -> f64 {
        let std = self.variance.sqrt();
        if std > f64::EPSILON {
            std
        } else {
            1.0
        }
    }

    pub fn transform_in_place(&self, mut values: ArrayViewMut1<'_, f64>) {
        let scale = self.scale();
        values.mapv_inplace(|v| (v - self.mean) / scale);
    }
}

/// Scaler bound to a named feature column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScaler {
    pub column: String,
    pub index: usize,
    pub scaler: StandardScaler,
}

impl ColumnScaler {
    /// Rescale this column of `values` in place
    pub fn apply(&self, values: &mut Array2<f64>) {
        self.scaler
            .transform_in_place(values.index_axis_mut(Axis(1), self.index));
    }
}

/// Fit one scaler per named column over every row of `values`.
pub fn fit_scalers(
    columns: &[String],
    values: &Array2<f64>,
    scaled_columns: &[String],
) -> Result<Vec<ColumnScaler>> {
    scaled_columns
        .iter()
        .map(|name| {
            let index = columns.iter().position(|c| c == name).ok_or_else(|| {
                PipelineError::invalid(format!("column '{name}' to rescale not found"))
            })?;
            let scaler = StandardScaler::fit(values.index_axis(Axis(1), index));
            debug!(
                column = %name,
                mean = scaler.mean,
                variance = scaler.variance,
                "Fitted column scaler"
            );
            Ok(ColumnScaler {
                column: name.clone(),
                index,
                scaler,
            })
        })
        .collect()
}

/// Move the label column out of `dataset` and validate it is binary.
pub fn split_labels(dataset: Dataset, label_column: &str) -> Result<(Features, Labels)> {
    let label_idx = dataset.column_index(label_column).ok_or_else(|| {
        PipelineError::invalid(format!("label column '{label_column}' not found"))
    })?;

    let labels = dataset
        .values
        .index_axis(Axis(1), label_idx)
        .iter()
        .enumerate()
        .map(|(row, &v)| {
            if v == f64::from(LEGITIMATE) {
                Ok(LEGITIMATE)
            } else if v == f64::from(FRAUD) {
                Ok(FRAUD)
            } else {
                Err(PipelineError::invalid(format!(
                    "label {v} at row {} is not 0 or 1",
                    row + 1
                )))
            }
        })
        .collect::<Result<Labels>>()?;

    let keep: Vec<usize> = (0..dataset.n_columns()).filter(|&i| i != label_idx).collect();
    let values = dataset.values.select(Axis(1), &keep);
    let columns = keep.iter().map(|&i| dataset.columns[i].clone()).collect();

    Ok((Features { columns, values }, labels))
}

/// Separate labels and standardize `scaled_columns` over the whole dataset.
///
/// Returns the fitted scalers alongside the data for reporting.
pub fn prepare(
    dataset: Dataset,
    label_column: &str,
    scaled_columns: &[String],
) -> Result<(Features, Labels, Vec<ColumnScaler>)> {
    let (mut features, labels) = split_labels(dataset, label_column)?;
    let scalers = fit_scalers(&features.columns, &features.values, scaled_columns)?;
    for scaler in &scalers {
        scaler.apply(&mut features.values);
    }
    Ok((features, labels, scalers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_dataset() -> Dataset {
        Dataset::new(
            vec![
                "Time".to_string(),
                "V1".to_string(),
                "Amount".to_string(),
                "Class".to_string(),
            ],
            array![
                [0.0, 0.5, 10.0, 0.0],
                [10.0, -1.0, 20.0, 1.0],
                [20.0, 0.25, 30.0, 0.0],
                [30.0, 2.0, 40.0, 0.0],
            ],
        )
    }

    fn scaled() -> Vec<String> {
        vec!["Amount".to_string(), "Time".to_string()]
    }

    #[test]
    fn test_prepare_extracts_labels() {
        let (features, labels, _) = prepare(sample_dataset(), "Class", &scaled()).unwrap();

        assert_eq!(features.columns, vec!["Time", "V1", "Amount"]);
        assert_eq!(features.n_rows(), 4);
        assert_eq!(labels.to_vec(), vec![0, 1, 0, 0]);
    }

    #[test]
    fn test_scaled_columns_standardized() {
        let (features, _, scalers) = prepare(sample_dataset(), "Class", &scaled()).unwrap();

        for name in ["Amount", "Time"] {
            let column = features.values.column(features.column_index(name).unwrap());
            let mean = column.sum() / column.len() as f64;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        assert_eq!(scalers[0].column, "Amount");
        assert!((scalers[0].scaler.mean - 25.0).abs() < 1e-12);
        assert!((scalers[0].scaler.variance - 125.0).abs() < 1e-12);
    }

    #[test]
    fn test_other_columns_untouched() {
        let (features, _, _) = prepare(sample_dataset(), "Class", &scaled()).unwrap();
        assert_eq!(features.values.column(1).to_vec(), vec![0.5, -1.0, 0.25, 2.0]);
    }

    #[test]
    fn test_constant_column_centred_only() {
        let scaler = StandardScaler::fit(array![3.0, 3.0, 3.0].view());
        assert_eq!(scaler.scale(), 1.0);

        let mut values = array![3.0, 3.0, 3.0];
        scaler.transform_in_place(values.view_mut());
        assert_eq!(values.to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let dataset = Dataset::new(
            vec!["Amount".to_string(), "Class".to_string()],
            array![[1.0, 0.0], [2.0, 2.0]],
        );
        let err = prepare(dataset, "Class", &["Amount".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_missing_scaled_column_rejected() {
        let dataset = Dataset::new(
            vec!["Amount".to_string(), "Class".to_string()],
            array![[1.0, 0.0], [2.0, 1.0]],
        );
        assert!(prepare(dataset, "Class", &scaled()).is_err());
    }
}
