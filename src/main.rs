//! Fraud Classifier Training - Main Entry Point
//!
//! Loads the transactions dataset, rebalances the training partition with
//! SMOTE, fits a logistic regression model and reports test-set metrics.

use anyhow::{Context, Result};
use fraud_trainer::config::{AppConfig, LoggingConfig};
use fraud_trainer::{pipeline, PipelineError};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> Result<ExitCode> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting fraud classifier training pipeline");
    info!(
        path = %config.data.path,
        test_fraction = config.split.test_fraction,
        seed = config.split.seed,
        k_neighbors = config.resampling.k_neighbors,
        threshold = config.model.threshold,
        "Configuration loaded successfully"
    );

    match pipeline::run(&config) {
        Ok(report) => {
            if config.logging.format == "json" {
                let evaluation = serde_json::to_string(&report.evaluation)
                    .context("Failed to serialize evaluation")?;
                info!(evaluation = %evaluation, "Evaluation summary");
            }
            info!("Pipeline finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::DatasetNotFound { path }) => {
            error!("Error: '{}' not found.", path);
            error!("Please ensure the dataset file exists at the configured path.");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_trainer={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
