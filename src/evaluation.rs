//! Classification metrics computed on the held-out test partition.

use crate::error::{PipelineError, Result};
use crate::types::{Labels, CLASS_NAMES, FRAUD};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// 2x2 counts of (true label, predicted label) with fraud as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &Labels, y_pred: &Labels) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::invalid(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }

        let mut cm = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            match (truth == FRAUD, pred == FRAUD) {
                (false, false) => cm.true_negatives += 1,
                (false, true) => cm.false_positives += 1,
                (true, false) => cm.false_negatives += 1,
                (true, true) => cm.true_positives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    /// Rows are true labels, columns predicted labels
    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negatives + self.true_positives, self.total())
    }

    /// TP / (TP + FP); 0.0 when nothing was predicted as fraud
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN); 0.0 when the test set has no fraud
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        f1(self.precision(), self.recall())
    }

    /// Metrics with `class` treated as the positive label
    pub fn class_metrics(&self, class: u8) -> ClassMetrics {
        let (hit, false_alarm, miss) = if class == FRAUD {
            (self.true_positives, self.false_positives, self.false_negatives)
        } else {
            (self.true_negatives, self.false_negatives, self.false_positives)
        };
        let precision = ratio(hit, hit + false_alarm);
        let recall = ratio(hit, hit + miss);
        ClassMetrics {
            precision,
            recall,
            f1: f1(precision, recall),
            support: hit + miss,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Precision, recall, F1 and support for one class (or an average)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class report with accuracy and macro/weighted averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub not_fraud: ClassMetrics,
    pub fraud: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let not_fraud = cm.class_metrics(0);
        let fraud = cm.class_metrics(FRAUD);
        let total = cm.total();

        let macro_avg = ClassMetrics {
            precision: (not_fraud.precision + fraud.precision) / 2.0,
            recall: (not_fraud.recall + fraud.recall) / 2.0,
            f1: (not_fraud.f1 + fraud.f1) / 2.0,
            support: total,
        };

        let weight = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * not_fraud.support as f64 + b * fraud.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(not_fraud.precision, fraud.precision),
            recall: weight(not_fraud.recall, fraud.recall),
            f1: weight(not_fraud.f1, fraud.f1),
            support: total,
        };

        Self {
            not_fraud,
            fraud,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in CLASS_NAMES.iter().zip([&self.not_fraud, &self.fraud]) {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Everything reported about the classifier on the test partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub report: ClassificationReport,
}

impl Evaluation {
    /// Score predictions against the true test labels
    pub fn compute(y_true: &Labels, y_pred: &Labels) -> Result<Self> {
        let confusion = ConfusionMatrix::from_labels(y_true, y_pred)?;
        Ok(Self {
            confusion,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            report: ClassificationReport::from_confusion(&confusion),
        })
    }

    /// Log the confusion matrix, its heatmap, the report and headline metrics
    pub fn log(&self) {
        info!("--- Model Evaluation ---");

        let cm = self.confusion.as_array();
        info!("Confusion Matrix:");
        info!("[[{:>8} {:>8}]", cm[0][0], cm[0][1]);
        info!(" [{:>8} {:>8}]]", cm[1][0], cm[1][1]);

        for line in render_heatmap(&self.confusion) {
            info!("{}", line);
        }

        info!("Classification Report:");
        for line in self.report.to_string().lines() {
            info!("{}", line);
        }

        info!("Key Performance Metrics:");
        info!("Accuracy: {:.4}", self.accuracy);
        info!("Precision: {:.4}", self.precision);
        info!("Recall: {:.4}", self.recall);
        info!("F1-Score: {:.4}", self.f1);
    }
}

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];
const CELL_WIDTH: usize = 16;

/// Shade-coded terminal rendering of the confusion matrix
pub fn render_heatmap(cm: &ConfusionMatrix) -> Vec<String> {
    let counts = cm.as_array();
    let max = counts.iter().flatten().copied().max().unwrap_or(0);

    let cell = |count: usize| {
        let level = if count == 0 || max == 0 {
            0
        } else {
            1 + ((count as f64 / max as f64 * 3.0).round() as usize).min(3)
        };
        let shade: String = std::iter::repeat(SHADES[level]).take(3).collect();
        format!(" {} {:>10} ", shade, count)
    };
    let border = |left: char, mid: char, right: char| {
        let bar = "─".repeat(CELL_WIDTH);
        format!("{:12}{left}{bar}{mid}{bar}{right}", "")
    };

    let mut lines = vec![
        "Confusion Matrix for Credit Card Fraud Detection".to_string(),
        format!("{:12} {:^33}", "", "Predicted Label"),
        format!(
            "{:<12} {:^16} {:^16}",
            "True Label", CLASS_NAMES[0], CLASS_NAMES[1]
        ),
        border('┌', '┬', '┐'),
    ];
    for (i, row) in counts.iter().enumerate() {
        lines.push(format!(
            "{:<12}│{}│{}│",
            CLASS_NAMES[i],
            cell(row[0]),
            cell(row[1])
        ));
        if i == 0 {
            lines.push(border('├', '┼', '┤'));
        }
    }
    lines.push(border('└', '┴', '┘'));
    lines
}
