//! Synthetic minority oversampling (SMOTE) for the training partition.
//!
//! New minority rows are interpolated between a minority row and one of its
//! `k` nearest minority neighbours until both classes have the same count.
//! Original rows are passed through untouched and keep their order; synthetic
//! rows are appended after them.

use crate::error::{PipelineError, Result};
use crate::types::{ClassCounts, Labels, Resampled, FRAUD, LEGITIMATE};
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Seeded SMOTE resampler
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Balance `labels` by synthesizing minority rows.
    ///
    /// Fails with [`PipelineError::InsufficientMinoritySamples`] when the
    /// minority class has fewer than `k_neighbors + 1` rows.
    pub fn fit_resample(&self, features: &Array2<f64>, labels: &Labels) -> Result<Resampled> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::invalid(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if self.k_neighbors == 0 {
            return Err(PipelineError::invalid("k_neighbors must be positive"));
        }

        let counts = ClassCounts::from_labels(labels.iter());
        if counts.total() == 0 {
            return Err(PipelineError::invalid("cannot resample an empty training set"));
        }
        if counts.legitimate == counts.fraud {
            info!("Training classes already balanced, skipping resampling");
            return Ok(Resampled {
                features: features.clone(),
                labels: labels.clone(),
                synthetic: 0,
            });
        }

        let (minority, n_minority, n_majority) = if counts.fraud < counts.legitimate {
            (FRAUD, counts.fraud, counts.legitimate)
        } else {
            (LEGITIMATE, counts.legitimate, counts.fraud)
        };

        let required = self.k_neighbors + 1;
        if n_minority < required {
            return Err(PipelineError::InsufficientMinoritySamples {
                available: n_minority,
                required,
            });
        }

        let minority_rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == minority)
            .map(|(i, _)| i)
            .collect();
        let samples = features.select(Axis(0), &minority_rows);
        let neighbors = nearest_neighbors(&samples, self.k_neighbors);

        let n_synthetic = n_majority - n_minority;
        let synthetic = self.interpolate(&samples, &neighbors, n_synthetic);

        debug!(
            minority = minority,
            k_neighbors = self.k_neighbors,
            n_synthetic = n_synthetic,
            "Generated synthetic minority samples"
        );

        let features = concatenate(Axis(0), &[features.view(), synthetic.view()])
            .map_err(|e| PipelineError::invalid(format!("feature shape mismatch: {e}")))?;
        let labels = concatenate(
            Axis(0),
            &[labels.view(), Array1::from_elem(n_synthetic, minority).view()],
        )
        .map_err(|e| PipelineError::invalid(format!("label shape mismatch: {e}")))?;

        Ok(Resampled {
            features,
            labels,
            synthetic: n_synthetic,
        })
    }

    fn interpolate(
        &self,
        samples: &Array2<f64>,
        neighbors: &[Vec<usize>],
        n_synthetic: usize,
    ) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let k = self.k_neighbors;
        let mut synthetic = Array2::zeros((n_synthetic, samples.ncols()));

        for mut out in synthetic.rows_mut() {
            let pick = rng.gen_range(0..samples.nrows() * k);
            let base = samples.row(pick / k);
            let neighbor = samples.row(neighbors[pick / k][pick % k]);
            let gap: f64 = rng.gen();

            out.assign(&(&base + &((&neighbor - &base) * gap)));
        }

        synthetic
    }
}

/// Indices of the `k` nearest rows (Euclidean) for every row, self excluded.
/// Ties resolve to the lower index.
fn nearest_neighbors(samples: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    samples
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut distances: Vec<(f64, usize)> = samples
                .rows()
                .into_iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, other)| (squared_distance(row, other), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn training_set(n_legit: usize, n_fraud: usize) -> (Array2<f64>, Labels) {
        let n = n_legit + n_fraud;
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            if i < n_legit {
                i as f64 + j as f64
            } else {
                100.0 + (i - n_legit) as f64 * (j as f64 + 1.0)
            }
        });
        let labels: Labels = (0..n).map(|i| u8::from(i >= n_legit)).collect();
        (features, labels)
    }

    #[test]
    fn test_classes_balanced() {
        let (features, labels) = training_set(80, 8);
        let resampled = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();

        let counts = resampled.counts();
        assert_eq!(counts.legitimate, 80);
        assert_eq!(counts.fraud, 80);
        assert_eq!(resampled.synthetic, 72);
        assert_eq!(resampled.features.nrows(), 160);
    }

    #[test]
    fn test_original_rows_untouched() {
        let (features, labels) = training_set(50, 6);
        let resampled = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();

        let n = features.nrows();
        assert_eq!(resampled.features.slice(ndarray::s![..n, ..]), features);
        assert_eq!(resampled.labels.slice(ndarray::s![..n]), labels);
        assert!(resampled.labels.iter().skip(n).all(|&l| l == FRAUD));
    }

    #[test]
    fn test_synthetic_rows_inside_minority_hull() {
        let (features, labels) = training_set(50, 6);
        let resampled = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();

        // minority rows lie on the line x1 = 2 * (x0 - 100) + 100 for x0 in [100, 105]
        for row in resampled.features.rows().into_iter().skip(features.nrows()) {
            assert!(row[0] >= 100.0 && row[0] <= 105.0);
            assert!((row[1] - (2.0 * (row[0] - 100.0) + 100.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (features, labels) = training_set(40, 7);
        let a = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();
        let b = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();
        let c = Smote::new(5, 1).fit_resample(&features, &labels).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.features, c.features);
    }

    #[test]
    fn test_insufficient_minority() {
        let (features, labels) = training_set(40, 5);
        let err = Smote::new(5, 42).fit_resample(&features, &labels).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InsufficientMinoritySamples {
                available: 5,
                required: 6
            }
        ));
    }

    #[test]
    fn test_single_class_is_insufficient() {
        let (features, labels) = training_set(10, 0);
        let err = Smote::new(5, 42).fit_resample(&features, &labels).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientMinoritySamples { available: 0, .. }
        ));
    }

    #[test]
    fn test_legitimate_minority() {
        let features = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let labels: Labels = array![0, 0, 0, 1, 1, 1, 1, 1, 1, 1];
        let resampled = Smote::new(2, 42).fit_resample(&features, &labels).unwrap();

        assert_eq!(resampled.counts().legitimate, 7);
        assert_eq!(resampled.counts().fraud, 7);
        for row in resampled.features.rows().into_iter().skip(10) {
            assert!(row[0] >= 0.0 && row[0] <= 2.0);
        }
    }

    #[test]
    fn test_balanced_input_passes_through() {
        let (features, labels) = training_set(6, 6);
        let resampled = Smote::new(5, 42).fit_resample(&features, &labels).unwrap();
        assert_eq!(resampled.synthetic, 0);
        assert_eq!(resampled.features, features);
    }

    #[test]
    fn test_nearest_neighbors_excludes_self() {
        let samples = array![[0.0], [1.0], [3.0], [10.0]];
        let neighbors = nearest_neighbors(&samples, 2);

        assert_eq!(neighbors[0], vec![1, 2]);
        assert_eq!(neighbors[1], vec![0, 2]);
        assert_eq!(neighbors[3], vec![2, 1]);
    }
}
