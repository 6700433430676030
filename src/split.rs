//! Stratified, seeded train/test partitioning

use crate::error::{PipelineError, Result};
use crate::types::{Labels, Split, FRAUD, LEGITIMATE};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Partition rows into train and test subsets preserving class proportions.
///
/// The test subset receives `ceil(test_fraction * n)` rows, apportioned across
/// classes by largest remainder. Every class with at least two members lands in
/// both subsets; a class with a single member goes to train. Inputs too small
/// for that are rejected. The same `seed` always produces the same partition.
pub fn stratified_split(
    features: &Array2<f64>,
    labels: &Labels,
    test_fraction: f64,
    seed: u64,
) -> Result<Split> {
    let n = labels.len();
    if features.nrows() != n {
        return Err(PipelineError::invalid(format!(
            "{} feature rows but {} labels",
            features.nrows(),
            n
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::invalid(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::invalid(format!(
            "cannot split {n} rows with test fraction {test_fraction}"
        )));
    }

    let mut by_class: Vec<Vec<usize>> = [LEGITIMATE, FRAUD]
        .iter()
        .map(|&class| {
            labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();
    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let stratified = counts.iter().filter(|&&c| c >= 2).count();
    let present = counts.iter().filter(|&&c| c > 0).count();
    if n_test < stratified || n - n_test < present {
        return Err(PipelineError::invalid(format!(
            "{n_test} test and {} train rows cannot hold every class of {counts:?}",
            n - n_test
        )));
    }

    let allocation = allocate_test_rows(&counts, n_test);
    if allocation.iter().sum::<usize>() != n_test {
        return Err(PipelineError::invalid(format!(
            "could not apportion {n_test} test rows across classes {counts:?}"
        )));
    }

    debug!(
        n_test = n_test,
        allocation = ?allocation,
        counts = ?counts,
        "Stratified test allocation"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n - n_test);
    let mut test_indices = Vec::with_capacity(n_test);
    for (rows, &take) in by_class.iter_mut().zip(&allocation) {
        rows.shuffle(&mut rng);
        test_indices.extend_from_slice(&rows[..take]);
        train_indices.extend_from_slice(&rows[take..]);
    }
    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    Ok(Split {
        train_features: features.select(Axis(0), &train_indices),
        test_features: features.select(Axis(0), &test_indices),
        train_labels: labels.select(Axis(0), &train_indices),
        test_labels: labels.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    })
}

/// Log subset sizes and per-subset class distribution
pub fn log_split_distribution(split: &Split) {
    let train = split.train_counts();
    let test = split.test_counts();

    info!("Training set size: {} samples", split.train_labels.len());
    info!("Testing set size: {} samples", split.test_labels.len());
    info!(
        legitimate = train.legitimate,
        fraud = train.fraud,
        "Training label distribution"
    );
    info!(
        legitimate = test.legitimate,
        fraud = test.fraud,
        "Testing label distribution"
    );
}

/// Number of test rows to draw from each class.
fn allocate_test_rows(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| n_test as f64 * c as f64 / n as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = allocation.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
            .then(counts[b].cmp(&counts[a]))
            .then(a.cmp(&b))
    });
    for &class in order.iter().take(n_test.saturating_sub(assigned)) {
        allocation[class] += 1;
    }

    // Bounds that keep every class with >= 2 members on both sides
    let bounds: Vec<(usize, usize)> = counts
        .iter()
        .map(|&c| if c >= 2 { (1, c - 1) } else { (0, 0) })
        .collect();
    for (slot, &(lo, hi)) in allocation.iter_mut().zip(&bounds) {
        *slot = (*slot).clamp(lo, hi);
    }

    loop {
        let total: usize = allocation.iter().sum();
        if total > n_test {
            let donor = (0..counts.len())
                .filter(|&i| allocation[i] > bounds[i].0)
                .max_by_key(|&i| (allocation[i], std::cmp::Reverse(i)));
            match donor {
                Some(i) => allocation[i] -= 1,
                None => break,
            }
        } else if total < n_test {
            let receiver = (0..counts.len())
                .filter(|&i| allocation[i] < bounds[i].1)
                .max_by_key(|&i| (bounds[i].1 - allocation[i], std::cmp::Reverse(i)));
            match receiver {
                Some(i) => allocation[i] += 1,
                None => break,
            }
        } else {
            break;
        }
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassCounts;
    use ndarray::Array1;
    use std::collections::HashSet;

    fn imbalanced(n_legit: usize, n_fraud: usize) -> (Array2<f64>, Labels) {
        let n = n_legit + n_fraud;
        let features = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f64);
        let labels: Labels = (0..n).map(|i| u8::from(i >= n_legit)).collect();
        (features, labels)
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let (features, labels) = imbalanced(990, 10);
        let split = stratified_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(split.train_labels.len() + split.test_labels.len(), 1000);
        assert_eq!(split.test_labels.len(), 200);

        let train: HashSet<usize> = split.train_indices.iter().copied().collect();
        let test: HashSet<usize> = split.test_indices.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 1000);
    }

    #[test]
    fn test_rows_stay_aligned() {
        let (features, labels) = imbalanced(90, 10);
        let split = stratified_split(&features, &labels, 0.2, 7).unwrap();

        for (pos, &src) in split.test_indices.iter().enumerate() {
            assert_eq!(split.test_features.row(pos), features.row(src));
            assert_eq!(split.test_labels[pos], labels[src]);
        }
        for (pos, &src) in split.train_indices.iter().enumerate() {
            assert_eq!(split.train_features.row(pos), features.row(src));
            assert_eq!(split.train_labels[pos], labels[src]);
        }
    }

    #[test]
    fn test_class_proportions_preserved() {
        let (features, labels) = imbalanced(990, 10);
        let split = stratified_split(&features, &labels, 0.2, 42).unwrap();

        let full = ClassCounts::from_labels(labels.iter());
        let train = split.train_counts();
        let test = split.test_counts();

        assert_eq!(train.legitimate, 792);
        assert_eq!(train.fraud, 8);
        assert_eq!(test.legitimate, 198);
        assert_eq!(test.fraud, 2);
        for class in [LEGITIMATE, FRAUD] {
            assert!((train.ratio(class) - full.ratio(class)).abs() < 0.02);
            assert!((test.ratio(class) - full.ratio(class)).abs() < 0.02);
        }
    }

    #[test]
    fn test_same_seed_same_partition() {
        let (features, labels) = imbalanced(300, 20);
        let a = stratified_split(&features, &labels, 0.2, 42).unwrap();
        let b = stratified_split(&features, &labels, 0.2, 42).unwrap();
        let c = stratified_split(&features, &labels, 0.2, 43).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn test_small_class_represented_on_both_sides() {
        let (features, labels) = imbalanced(48, 2);
        let split = stratified_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(split.train_counts().fraud, 1);
        assert_eq!(split.test_counts().fraud, 1);
        assert_eq!(split.test_labels.len(), 10);
    }

    #[test]
    fn test_singleton_class_goes_to_train() {
        let (features, labels) = imbalanced(19, 1);
        let split = stratified_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(split.train_counts().fraud, 1);
        assert_eq!(split.test_counts().fraud, 0);
        assert_eq!(split.test_labels.len(), 4);
    }

    #[test]
    fn test_two_small_classes_split_evenly() {
        let (features, labels) = imbalanced(8, 2);
        let split = stratified_split(&features, &labels, 0.2, 42).unwrap();

        assert_eq!(split.test_labels.len(), 2);
        assert_eq!(split.test_counts().legitimate, 1);
        assert_eq!(split.test_counts().fraud, 1);
        assert_eq!(split.train_counts().fraud, 1);
    }

    #[test]
    fn test_too_few_test_rows_for_classes() {
        // ceil(0.2 * 5) = 1 test row cannot hold both classes
        let (features, labels) = imbalanced(3, 2);
        let err = stratified_split(&features, &labels, 0.2, 42).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_fraction() {
        let (features, labels) = imbalanced(10, 2);
        assert!(stratified_split(&features, &labels, 0.0, 42).is_err());
        assert!(stratified_split(&features, &labels, 1.0, 42).is_err());
    }

    #[test]
    fn test_misaligned_input() {
        let features = Array2::<f64>::zeros((5, 2));
        let labels: Labels = Array1::zeros(4);
        assert!(stratified_split(&features, &labels, 0.2, 42).is_err());
    }
}
