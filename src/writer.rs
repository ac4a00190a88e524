//! Output serialization.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::{CategorySet, Prediction, Predictions};

/// Errors raised while writing output files.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Replaces tab characters so a query always occupies exactly one column.
pub fn sanitize_query(query: &str) -> String {
    query.replace('\t', " ")
}

/// Formats one output row: `query\tcat1, cat2` (without a line terminator).
pub fn format_row(query: &str, predictions: &[Prediction]) -> String {
    let categories: Vec<&str> = predictions.iter().map(Prediction::category).collect();
    format!("{}\t{}", sanitize_query(query), categories.join(", "))
}

/// Writes predictions as tab-separated rows, one per query that received at
/// least one category.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`WriteError::Io`] if the file cannot be created or written.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &Predictions) -> Result<usize, WriteError> {
    let path = path.as_ref();
    let io_error = |source| WriteError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut out = BufWriter::new(File::create(path).map_err(io_error)?);
    let mut rows = 0;
    for (query, query_predictions) in predictions {
        if query_predictions.is_empty() {
            continue;
        }
        writeln!(out, "{}", format_row(query, query_predictions)).map_err(io_error)?;
        rows += 1;
    }
    out.flush().map_err(io_error)?;

    Ok(rows)
}

/// Writes category descriptions as a JSON object of `name -> description`.
///
/// The output can be passed straight back to
/// [`crate::loader::read_categories`].
pub fn write_descriptions(path: impl AsRef<Path>, descriptions: &CategorySet) -> Result<(), WriteError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, descriptions).map_err(|source| WriteError::Json {
        path: path.display().to_string(),
        source,
    })?;
    out.flush().map_err(|source| WriteError::Io {
        path: path.display().to_string(),
        source,
    })
}
