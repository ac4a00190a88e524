use std::path::Path;

use super::{LoadError, read_text};
use crate::{Prediction, Predictions};

/// Reads a prediction file written by [`crate::writer::write_predictions`].
///
/// Every non-blank line must be `query\tcat1, cat2, ...`.
///
/// # Errors
///
/// Returns [`LoadError::MalformedLine`] for a line without exactly one tab,
/// or [`LoadError::Io`] if the file cannot be read.
pub fn read_predictions(path: impl AsRef<Path>) -> Result<Predictions, LoadError> {
    let path = path.as_ref();
    parse_labels(path, &read_text(path)?, false)
}

/// Reads a benchmark file of expected labels.
///
/// Same row format as a prediction file, with a header line (for example
/// `source\ttags`) that is skipped.
pub fn read_benchmark(path: impl AsRef<Path>) -> Result<Predictions, LoadError> {
    let path = path.as_ref();
    parse_labels(path, &read_text(path)?, true)
}

fn parse_labels(path: &Path, content: &str, has_header: bool) -> Result<Predictions, LoadError> {
    let mut labels = Predictions::new();
    let skip = usize::from(has_header);

    for (index, line) in content.lines().enumerate().skip(skip) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut columns = line.split('\t');
        let (Some(query), Some(categories), None) =
            (columns.next(), columns.next(), columns.next())
        else {
            return Err(LoadError::MalformedLine {
                path: path.display().to_string(),
                line: index + 1,
            });
        };

        for category in categories.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            labels.push(query.trim(), Prediction::label(category));
        }
    }

    Ok(labels)
}
