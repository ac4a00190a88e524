//! Readers for the pipeline's input files.
//!
//! - Query files: one free-text query per line.
//! - Category files: a JSON object of `name -> description`, or a `.csv` /
//!   `.tsv` table with a `class_name` column and an optional `desc` column.
//! - Example tables: `class_name` / `examples` columns, used by the
//!   description generator.
//! - Label files: `query\tcat1, cat2` rows, as written by the result writer
//!   or shipped as a benchmark.

mod categories;
mod error;
mod examples;
mod labels;
mod queries;

use std::path::Path;

pub use categories::read_categories;
pub use error::LoadError;
pub use examples::{ClassExamples, read_examples};
pub use labels::{read_benchmark, read_predictions};
pub use queries::read_queries;

/// Returns the lower-cased extension of a path, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Picks the field delimiter for a delimited table from its extension.
fn table_delimiter(path: &Path) -> Result<u8, LoadError> {
    match extension_of(path).as_str() {
        "csv" => Ok(b','),
        "tsv" => Ok(b'\t'),
        other => Err(LoadError::InvalidExtension {
            path: path.display().to_string(),
            extension: other.to_string(),
            expected: "csv or tsv",
        }),
    }
}

/// A delimited table opened for reading, with the positions of the columns
/// the caller asked for.
struct Table {
    reader: csv::Reader<std::fs::File>,
    required: Vec<usize>,
    optional: Vec<Option<usize>>,
}

/// Opens a `.csv` / `.tsv` file and resolves its header columns.
///
/// Header names are matched after trimming. Every missing required column is
/// reported at once.
fn open_table(path: &Path, required: &[&str], optional: &[&str]) -> Result<Table, LoadError> {
    let delimiter = table_delimiter(path)?;
    let display = path.display().to_string();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(&display, source))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| csv_error(&display, source))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = required
        .iter()
        .filter(|name| position(**name).is_none())
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: display,
            missing,
        });
    }

    Ok(Table {
        required: required.iter().filter_map(|name| position(*name)).collect(),
        optional: optional.iter().map(|name| position(*name)).collect(),
        reader,
    })
}

/// Maps a `csv::Error`, surfacing I/O failures as [`LoadError::Io`].
fn csv_error(path: &str, source: csv::Error) -> LoadError {
    if let csv::ErrorKind::Io(io) = source.kind() {
        return LoadError::Io {
            path: path.to_string(),
            source: std::io::Error::new(io.kind(), io.to_string()),
        };
    }
    LoadError::Csv {
        path: path.to_string(),
        source,
    }
}

/// Reads a whole file as UTF-8 text.
fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}
