use std::path::Path;

use tracing::{info, warn};

use super::{LoadError, read_text};
use crate::QuerySet;

/// Reads a newline-delimited query file into a deduplicated set.
///
/// Each line is trimmed and blank lines are skipped. Duplicate lines are not
/// an error: a warning is logged when the number of lines read differs from
/// the number of unique queries kept.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read.
pub fn read_queries(path: impl AsRef<Path>) -> Result<QuerySet, LoadError> {
    let path = path.as_ref();
    let content = read_text(path)?;

    let (queries, total) = parse_queries(&content);
    if total != queries.len() {
        warn!(
            total,
            unique = queries.len(),
            "Only unique queries were kept from {}",
            path.display()
        );
    }
    info!(count = queries.len(), "Loaded queries from {}", path.display());

    Ok(queries)
}

/// Collects the unique, trimmed, non-blank lines of `content`.
///
/// Returns the set together with the number of non-blank lines seen.
fn parse_queries(content: &str) -> (QuerySet, usize) {
    let mut queries = QuerySet::new();
    let mut total = 0;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        queries.insert(line);
        total += 1;
    }
    (queries, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_queries_deduplicates_and_counts_lines() {
        let (queries, total) = parse_queries("soil\nmarine sediment\nsoil\n");

        assert_eq!(total, 3);
        assert_eq!(queries.len(), 2);
        assert!(queries.contains("soil"));
        assert!(queries.contains("marine sediment"));
    }

    #[test]
    fn parse_queries_trims_whitespace() {
        let (queries, _) = parse_queries("  soil  \r\nsoil\t\n");

        assert_eq!(queries.len(), 1);
        assert!(queries.contains("soil"));
    }

    #[test]
    fn parse_queries_skips_blank_lines() {
        let (queries, total) = parse_queries("\n  \nblood\n\n");

        assert_eq!(total, 1);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn read_queries_reports_missing_file() {
        let result = read_queries("/definitely/not/here/queries.txt");
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
