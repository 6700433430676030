//! Configuration management for the fraud classifier training pipeline

use anyhow::{ensure, Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Dataset file read when no configuration overrides it
pub const DEFAULT_DATASET_PATH: &str = "creditcard.csv";
/// Name of the binary class column
pub const DEFAULT_LABEL_COLUMN: &str = "Class";
/// Columns rescaled to zero mean / unit variance
pub const DEFAULT_SCALED_COLUMNS: [&str; 2] = ["Amount", "Time"];
/// Fraction of rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
/// Seed shared by the splitter and the resampler
pub const DEFAULT_RANDOM_SEED: u64 = 42;
/// Neighbours considered when synthesizing minority samples
pub const DEFAULT_SMOTE_NEIGHBORS: usize = 5;
/// Inverse regularization strength
pub const DEFAULT_REGULARIZATION_C: f64 = 1.0;
/// Newton iteration cap
pub const DEFAULT_MAX_ITER: usize = 100;
/// Gradient infinity-norm tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Probability above which a transaction is classified as fraud
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Where the amount/time scalers are fitted
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Fit on every row before splitting (leaks test statistics, matches the
    /// historical behaviour)
    #[default]
    Global,
    /// Fit on the training partition only, then apply to the test partition
    TrainOnly,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub resampling: ResamplingConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Input dataset configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path of the delimited transactions file
    pub path: String,
    /// Field delimiter
    pub delimiter: char,
    /// Label column name
    pub label_column: String,
    /// Columns standardized before training
    pub scaled_columns: Vec<String>,
    /// Global (historical) or train-only scaler fitting
    pub scaling: ScalingMode,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATASET_PATH.to_string(),
            delimiter: ',',
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            scaled_columns: DEFAULT_SCALED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scaling: ScalingMode::Global,
        }
    }
}

/// Train/test partition configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

/// SMOTE configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResamplingConfig {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            k_neighbors: DEFAULT_SMOTE_NEIGHBORS,
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

/// Logistic regression configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    pub fit_intercept: bool,
    /// Decision threshold on the fraud probability
    pub threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            c: DEFAULT_REGULARIZATION_C,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            fit_intercept: true,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path; a missing file yields defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.split.test_fraction > 0.0 && self.split.test_fraction < 1.0,
            "split.test_fraction must be in (0, 1), got {}",
            self.split.test_fraction
        );
        ensure!(
            self.resampling.k_neighbors > 0,
            "resampling.k_neighbors must be positive"
        );
        ensure!(
            self.model.c > 0.0,
            "model.c must be positive, got {}",
            self.model.c
        );
        ensure!(self.model.max_iter > 0, "model.max_iter must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.model.threshold),
            "model.threshold must be in [0, 1], got {}",
            self.model.threshold
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.path, "creditcard.csv");
        assert_eq!(config.data.label_column, "Class");
        assert_eq!(config.data.scaled_columns, vec!["Amount", "Time"]);
        assert_eq!(config.data.scaling, ScalingMode::Global);
        assert_eq!(config.split.test_fraction, 0.2);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.resampling.k_neighbors, 5);
        assert_eq!(config.model.threshold, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.split.seed, DEFAULT_RANDOM_SEED);
    }

    #[test]
    fn test_partial_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[split]\ntest_fraction = 0.25\n\n[data]\nscaling = \"train_only\""
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.split.test_fraction, 0.25);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.data.scaling, ScalingMode::TrainOnly);
        assert_eq!(config.data.path, "creditcard.csv");
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let mut config = AppConfig::default();
        config.split.test_fraction = 1.0;
        assert!(config.validate().is_err());
    }
}
