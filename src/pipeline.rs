//! End-to-end training pipeline.
//!
//! Load -> preprocess -> stratified split -> SMOTE (training partition only)
//! -> logistic regression -> evaluation on the untouched test partition.
//! Each stage hands its output to the next; nothing is revisited.

use crate::config::{AppConfig, ScalingMode};
use crate::error::Result;
use crate::evaluation::Evaluation;
use crate::loader::{self, DatasetSummary};
use crate::models::{LogisticModel, LogisticRegression};
use crate::preprocess::{self, ColumnScaler};
use crate::resample::Smote;
use crate::split::{log_split_distribution, stratified_split};
use crate::types::{ClassCounts, Dataset, Labels, Split};
use serde::Serialize;
use tracing::info;

/// Outcome of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub summary: DatasetSummary,
    pub feature_columns: Vec<String>,
    pub scalers: Vec<ColumnScaler>,
    pub train_counts: ClassCounts,
    pub test_counts: ClassCounts,
    pub resampled_counts: ClassCounts,
    pub synthetic_samples: usize,
    pub model: LogisticModel,
    pub predictions: Labels,
    pub evaluation: Evaluation,
}

/// Load the configured dataset and run every stage on it
pub fn run(config: &AppConfig) -> Result<PipelineReport> {
    let dataset = loader::load_dataset(&config.data.path, config.data.delimiter)?;
    run_on_dataset(dataset, config)
}

/// Run every stage after loading on an in-memory dataset
pub fn run_on_dataset(dataset: Dataset, config: &AppConfig) -> Result<PipelineReport> {
    let summary = loader::summarize(&dataset, &config.data.label_column)?;
    summary.log();

    let (feature_columns, split, scalers) = partition(dataset, config)?;
    for scaler in &scalers {
        info!(
            column = %scaler.column,
            mean = scaler.scaler.mean,
            variance = scaler.scaler.variance,
            mode = ?config.data.scaling,
            "Column standardized"
        );
    }
    log_split_distribution(&split);

    info!("Handling class imbalance with SMOTE...");
    let smote = Smote::new(config.resampling.k_neighbors, config.resampling.seed);
    let resampled = smote.fit_resample(&split.train_features, &split.train_labels)?;
    let resampled_counts = resampled.counts();
    info!(
        "Original training set shape: ({}, {})",
        split.train_features.nrows(),
        split.train_features.ncols()
    );
    info!(
        "Resampled training set shape: ({}, {})",
        resampled.features.nrows(),
        resampled.features.ncols()
    );
    info!(
        legitimate = resampled_counts.legitimate,
        fraud = resampled_counts.fraud,
        synthetic = resampled.synthetic,
        "Resampled training label distribution"
    );

    info!("Training Logistic Regression model...");
    let model = LogisticRegression::from_config(&config.model)
        .fit(&resampled.features, &resampled.labels)?;
    info!(
        iterations = model.iterations,
        converged = model.converged,
        "Model training complete."
    );

    let predictions = model.predict(&split.test_features, config.model.threshold)?;
    let evaluation = Evaluation::compute(&split.test_labels, &predictions)?;
    evaluation.log();

    Ok(PipelineReport {
        summary,
        feature_columns,
        scalers,
        train_counts: split.train_counts(),
        test_counts: split.test_counts(),
        resampled_counts,
        synthetic_samples: resampled.synthetic,
        model,
        predictions,
        evaluation,
    })
}

/// Separate labels, standardize and split according to the scaling mode
fn partition(
    dataset: Dataset,
    config: &AppConfig,
) -> Result<(Vec<String>, Split, Vec<ColumnScaler>)> {
    let data = &config.data;
    match data.scaling {
        ScalingMode::Global => {
            let (features, labels, scalers) =
                preprocess::prepare(dataset, &data.label_column, &data.scaled_columns)?;
            let split = stratified_split(
                &features.values,
                &labels,
                config.split.test_fraction,
                config.split.seed,
            )?;
            Ok((features.columns, split, scalers))
        }
        ScalingMode::TrainOnly => {
            let (features, labels) = preprocess::split_labels(dataset, &data.label_column)?;
            let mut split = stratified_split(
                &features.values,
                &labels,
                config.split.test_fraction,
                config.split.seed,
            )?;
            let scalers = preprocess::fit_scalers(
                &features.columns,
                &split.train_features,
                &data.scaled_columns,
            )?;
            for scaler in &scalers {
                scaler.apply(&mut split.train_features);
                scaler.apply(&mut split.test_features);
            }
            Ok((features.columns, split, scalers))
        }
    }
}
