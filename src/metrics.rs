//! Evaluation metrics for binary probability forecasts.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CALIBRATION_BINS: usize = 10;
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bin_lower: f64,
    pub bin_upper: f64,
    pub count: u64,
    pub mean_predicted_probability: f64,
    pub observed_positive_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub threshold: f64,
    /// Indexed by class label (0, 1).
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
}

/// Area under the ROC curve via the rank-sum statistic, averaging ranks over
/// tied scores. `None` when only one class is present.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|y| **y == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group spans ranks start+1 ..= end.
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for idx in &order[start..end] {
            if labels[*idx] == 1 {
                positive_rank_sum += average_rank;
            }
        }
        start = end;
    }

    let pos = positives as f64;
    let neg = negatives as f64;
    Some((positive_rank_sum - pos * (pos + 1.0) / 2.0) / (pos * neg))
}

/// Mean squared difference between predicted probability and outcome.
pub fn brier_score(labels: &[u8], probabilities: &[f64]) -> Option<f64> {
    let n = labels.len().min(probabilities.len());
    if n == 0 {
        return None;
    }
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(y, p)| {
            let d = p - f64::from(*y);
            d * d
        })
        .sum();
    Some(total / n as f64)
}

/// Uniform-width reliability bins over [0, 1]. Inner edges are right-closed
/// (a probability equal to an edge falls in the lower bin); empty bins are
/// omitted.
pub fn calibration_curve(labels: &[u8], probabilities: &[f64], n_bins: usize) -> Vec<CalibrationBin> {
    if n_bins == 0 {
        return Vec::new();
    }
    let width = 1.0 / n_bins as f64;

    let mut prob_sums = vec![0.0; n_bins];
    let mut positive_counts = vec![0_u64; n_bins];
    let mut counts = vec![0_u64; n_bins];

    for (y, p) in labels.iter().zip(probabilities) {
        let bin = (1..n_bins).filter(|k| (*k as f64 * width) < *p).count();
        prob_sums[bin] += p;
        positive_counts[bin] += u64::from(*y);
        counts[bin] += 1;
    }

    (0..n_bins)
        .filter(|bin| counts[*bin] > 0)
        .map(|bin| {
            let count = counts[bin] as f64;
            CalibrationBin {
                bin_lower: bin as f64 * width,
                bin_upper: (bin + 1) as f64 * width,
                count: counts[bin],
                mean_predicted_probability: prob_sums[bin] / count,
                observed_positive_fraction: positive_counts[bin] as f64 / count,
            }
        })
        .collect()
}

/// Per-class precision/recall/F1 for hard predictions `p >= threshold`.
/// Undefined ratios are reported as 0.
pub fn classification_report(
    labels: &[u8],
    probabilities: &[f64],
    threshold: f64,
) -> ClassificationReport {
    let mut confusion = [[0_u64; 2]; 2];
    for (y, p) in labels.iter().zip(probabilities) {
        let actual = usize::from(*y == 1);
        let predicted = usize::from(*p >= threshold);
        confusion[actual][predicted] += 1;
    }

    let class_metrics = |class: usize| {
        let other = 1 - class;
        let tp = confusion[class][class] as f64;
        let fp = confusion[other][class] as f64;
        let fn_ = confusion[class][other] as f64;
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        ClassMetrics {
            precision,
            recall,
            f1: ratio(2.0 * precision * recall, precision + recall),
            support: confusion[class][0] + confusion[class][1],
        }
    };

    let total: u64 = confusion.iter().flatten().sum();
    let correct = confusion[0][0] + confusion[1][1];

    ClassificationReport {
        threshold,
        classes: [class_metrics(0), class_metrics(1)],
        accuracy: ratio(correct as f64, total as f64),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (class, m) in self.classes.iter().enumerate() {
            writeln!(
                f,
                "{:>12} {:>9.3} {:>9.3} {:>9.3} {:>9}",
                class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let support: u64 = self.classes.iter().map(|m| m.support).sum();
        write!(
            f,
            "{:>12} {:>9} {:>9} {:>9.3} {:>9}",
            "accuracy", "", "", self.accuracy, support
        )
    }
}
