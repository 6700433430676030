//! Delimited-file loader for the transactions dataset

use crate::error::{PipelineError, Result};
use crate::types::{ClassCounts, Dataset};
use csv::ReaderBuilder;
use ndarray::{Array2, Axis};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Load a header-bearing delimited file into a [`Dataset`].
///
/// Every non-empty cell must parse as a number; empty cells load as NaN so
/// they can be reported as missing. Row order is preserved.
pub fn load_dataset<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.is_file() {
        debug!(path = %path.display(), "Dataset path is not a regular file");
        return Err(PipelineError::DatasetNotFound {
            path: path.display().to_string(),
        });
    }
    let file = File::open(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "Failed to open dataset");
        PipelineError::DatasetNotFound {
            path: path.display().to_string(),
        }
    })?;

    let delimiter = u8::try_from(delimiter)
        .map_err(|_| PipelineError::invalid(format!("delimiter {delimiter:?} is not ASCII")))?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.is_empty() {
        return Err(PipelineError::invalid("dataset has no columns"));
    }

    let mut values = Vec::new();
    let mut rows = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.len() != columns.len() {
            return Err(PipelineError::invalid(format!(
                "row {} has {} fields, expected {}",
                rows + 1,
                record.len(),
                columns.len()
            )));
        }
        for (col, cell) in record.iter().enumerate() {
            values.push(parse_cell(cell, rows, &columns[col])?);
        }
        rows += 1;
    }

    let values = Array2::from_shape_vec((rows, columns.len()), values)
        .map_err(|e| PipelineError::invalid(format!("dataset shape: {e}")))?;

    info!(
        path = %path.display(),
        rows = rows,
        columns = columns.len(),
        "Dataset loaded successfully"
    );

    Ok(Dataset::new(columns, values))
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    let cell = cell.trim().trim_matches('"');
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        PipelineError::invalid(format!(
            "non-numeric value {cell:?} in column '{column}' at row {}",
            row + 1
        ))
    })
}

/// Per-column schema entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub non_null: usize,
    pub nulls: usize,
}

/// Observability summary of a freshly loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
    pub class_counts: ClassCounts,
    pub fraud_rate_pct: f64,
}

/// Compute schema, missing-value and class-balance statistics.
pub fn summarize(dataset: &Dataset, label_column: &str) -> Result<DatasetSummary> {
    let labels = dataset.column(label_column).ok_or_else(|| {
        PipelineError::invalid(format!("label column '{label_column}' not found"))
    })?;

    let columns = dataset
        .columns
        .iter()
        .zip(dataset.values.axis_iter(Axis(1)))
        .map(|(name, column)| {
            let nulls = column.iter().filter(|v| v.is_nan()).count();
            ColumnInfo {
                name: name.clone(),
                non_null: column.len() - nulls,
                nulls,
            }
        })
        .collect();

    let mut class_counts = ClassCounts::default();
    for &label in labels.iter() {
        if label == 1.0 {
            class_counts.fraud += 1;
        } else if label == 0.0 {
            class_counts.legitimate += 1;
        }
    }

    let fraud_rate_pct = if dataset.n_rows() > 0 {
        class_counts.fraud as f64 / dataset.n_rows() as f64 * 100.0
    } else {
        0.0
    };

    Ok(DatasetSummary {
        rows: dataset.n_rows(),
        columns,
        class_counts,
        fraud_rate_pct,
    })
}

impl DatasetSummary {
    /// Emit schema, null counts and class distribution
    pub fn log(&self) {
        info!("Dataset Info:");
        info!(
            "{} entries, {} columns (all float64)",
            self.rows,
            self.columns.len()
        );
        for (i, column) in self.columns.iter().enumerate() {
            info!("  {:>3}  {:<10} {:>8} non-null", i, column.name, column.non_null);
        }

        info!("Missing values per column:");
        for column in &self.columns {
            info!("  {:<10} {}", column.name, column.nulls);
        }

        info!("Class distribution:");
        info!("  0    {}", self.class_counts.legitimate);
        info!("  1    {}", self.class_counts.fraud);
        info!(
            "Fraction of fraudulent transactions: {:.4}%",
            self.fraud_rate_pct
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_preserves_order() {
        let file = write_csv("Time,V1,Amount,Class\n0,1.5,10.0,0\n1,-0.5,250.0,1\n2,0.0,3.5,0\n");

        let dataset = load_dataset(file.path(), ',').unwrap();

        assert_eq!(dataset.columns, vec!["Time", "V1", "Amount", "Class"]);
        assert_eq!(dataset.n_rows(), 3);
        assert_eq!(dataset.values[[1, 2]], 250.0);
        assert_eq!(dataset.column("Time").unwrap().to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_dataset("definitely/not/here.csv", ',').unwrap_err();
        assert!(matches!(err, PipelineError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creditcard.csv");
        std::fs::create_dir(&path).unwrap();

        let err = load_dataset(&path, ',').unwrap_err();
        assert!(matches!(err, PipelineError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_non_numeric_cell_rejected() {
        let file = write_csv("Time,Amount,Class\n0,abc,0\n");
        let err = load_dataset(file.path(), ',').unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let file = write_csv("Time,Amount,Class\n0,1.0,0\n1,2.0\n");
        let err = load_dataset(file.path(), ',').unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_summary_counts_nulls_and_classes() {
        let file = write_csv("Time,Amount,Class\n0,,0\n1,5.0,0\n2,7.0,1\n3,,0\n");
        let dataset = load_dataset(file.path(), ',').unwrap();

        let summary = summarize(&dataset, "Class").unwrap();

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.columns[1].nulls, 2);
        assert_eq!(summary.columns[1].non_null, 2);
        assert_eq!(summary.class_counts.legitimate, 3);
        assert_eq!(summary.class_counts.fraud, 1);
        assert!((summary.fraud_rate_pct - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_requires_label_column() {
        let file = write_csv("Time,Amount\n0,1\n");
        let dataset = load_dataset(file.path(), ',').unwrap();
        assert!(summarize(&dataset, "Class").is_err());
    }
}
