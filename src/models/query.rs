use std::collections::BTreeSet;
use std::collections::btree_set;

/// A deduplicated set of free-text queries.
///
/// Queries are kept in sorted order so that prompt batches and output files
/// are reproducible between runs over the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet(BTreeSet<String>);

impl QuerySet {
    /// Creates an empty query set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a query, returning `false` if it was already present.
    pub fn insert(&mut self, query: impl Into<String>) -> bool {
        self.0.insert(query.into())
    }

    /// Returns `true` if the set contains the query.
    pub fn contains(&self, query: &str) -> bool {
        self.0.contains(query)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the queries in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for QuerySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a QuerySet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_ignores_duplicates() {
        let mut queries = QuerySet::new();

        assert!(queries.insert("soil sample"));
        assert!(!queries.insert("soil sample"));
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn iteration_is_sorted() {
        let queries: QuerySet = ["river water", "blood", "marine sediment"]
            .into_iter()
            .collect();

        let ordered: Vec<&String> = queries.iter().collect();
        assert_eq!(ordered, vec!["blood", "marine sediment", "river water"]);
    }
}
