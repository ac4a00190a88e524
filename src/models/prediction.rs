use std::collections::BTreeMap;
use std::collections::btree_map;

/// An accepted category for a query.
///
/// `confidence` is the "yes" probability percentage when the backend
/// reported token probabilities, and `None` for text-only backends.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    category: String,
    confidence: Option<f64>,
}

impl Prediction {
    pub fn new(category: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            category: category.into(),
            confidence,
        }
    }

    /// Creates a prediction without a confidence score.
    pub fn label(category: impl Into<String>) -> Self {
        Self::new(category, None)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

/// Accumulated predictions, keyed by query.
///
/// Each query's predictions keep insertion order, which is the category
/// iteration order of the run that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions(BTreeMap<String, Vec<Prediction>>);

impl Predictions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a prediction to the query's list.
    pub fn push(&mut self, query: impl Into<String>, prediction: Prediction) {
        self.0.entry(query.into()).or_default().push(prediction);
    }

    /// Returns the predictions recorded for a query.
    pub fn get(&self, query: &str) -> Option<&[Prediction]> {
        self.0.get(query).map(Vec::as_slice)
    }

    /// Returns the category labels for a query, in insertion order.
    pub fn labels(&self, query: &str) -> Vec<&str> {
        self.get(query)
            .map(|predictions| predictions.iter().map(Prediction::category).collect())
            .unwrap_or_default()
    }

    /// Number of queries with at least one prediction.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of predictions across all queries.
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<Prediction>> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Predictions {
    type Item = (&'a String, &'a Vec<Prediction>);
    type IntoIter = btree_map::Iter<'a, String, Vec<Prediction>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
