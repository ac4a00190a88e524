//! Scoring predictions against a labelled benchmark.
//!
//! Every source in the benchmark is scored. A source with no predicted row
//! counts as an empty prediction. Sources that appear only in the prediction
//! file are ignored.
//!
//! # Metrics
//!
//! - `mean_jaccard`: average of per-source Jaccard similarity
//! - `precision`: micro-averaged, true positives over all predicted labels
//! - `recall`: micro-averaged, true positives over all expected labels
//!
//! # Examples
//!
//! ```
//! use pretzel::eval::evaluate;
//! use pretzel::{Prediction, Predictions};
//!
//! let mut expected = Predictions::new();
//! expected.push("soil sample", Prediction::label("Soil"));
//! expected.push("soil sample", Prediction::label("Terrestrial"));
//!
//! let mut predicted = Predictions::new();
//! predicted.push("soil sample", Prediction::label("Soil"));
//!
//! let report = evaluate(&expected, &predicted);
//! assert_eq!(report.sources, 1);
//! assert_eq!(report.mean_jaccard, 0.5);
//! assert_eq!(report.precision, 1.0);
//! assert_eq!(report.recall, 0.5);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::Predictions;

/// Aggregate evaluation metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Number of benchmark sources scored.
    pub sources: usize,
    pub mean_jaccard: f64,
    pub precision: f64,
    pub recall: f64,
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sources: {}, Jaccard: {:.3}, Precision: {:.3}, Recall: {:.3}",
            self.sources, self.mean_jaccard, self.precision, self.recall
        )
    }
}

/// Calculates Jaccard similarity between two label sets.
///
/// Two empty sets are identical and score 1.0.
///
/// # Examples
///
/// ```
/// use pretzel::eval::jaccard_similarity;
/// use std::collections::BTreeSet;
///
/// let expected: BTreeSet<&str> = ["Soil", "Terrestrial", "Plant"].into_iter().collect();
/// let actual: BTreeSet<&str> = ["Soil", "Terrestrial", "Marine"].into_iter().collect();
///
/// // Intersection: 2, Union: 4
/// assert_eq!(jaccard_similarity(&expected, &actual), 0.5);
/// ```
pub fn jaccard_similarity(expected: &BTreeSet<&str>, actual: &BTreeSet<&str>) -> f64 {
    if expected.is_empty() && actual.is_empty() {
        return 1.0;
    }

    let intersection = expected.intersection(actual).count();
    let union = expected.union(actual).count();

    intersection as f64 / union as f64
}

/// Compares expected labels with predicted labels, source by source.
pub fn evaluate(expected: &Predictions, predicted: &Predictions) -> EvalReport {
    let mut jaccard_sum = 0.0;
    let mut true_positives = 0;
    let mut predicted_total = 0;
    let mut expected_total = 0;

    for (source, expected_predictions) in expected {
        let expected_set: BTreeSet<&str> = expected_predictions.iter().map(|p| p.category()).collect();
        let actual_set: BTreeSet<&str> = predicted.labels(source).into_iter().collect();

        jaccard_sum += jaccard_similarity(&expected_set, &actual_set);
        true_positives += expected_set.intersection(&actual_set).count();
        predicted_total += actual_set.len();
        expected_total += expected_set.len();
    }

    let sources = expected.len();
    EvalReport {
        sources,
        mean_jaccard: ratio(jaccard_sum, sources as f64),
        precision: ratio(true_positives as f64, predicted_total as f64),
        recall: ratio(true_positives as f64, expected_total as f64),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
