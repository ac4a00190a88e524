use std::path::Path;

use tracing::info;

use super::{LoadError, csv_error, open_table};
use crate::clean_category_name;

/// Example sources for one class, as read from an example table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassExamples {
    pub class_name: String,
    /// Free-text example sources, as written in the table (usually
    /// comma-separated).
    pub examples: String,
}

/// Reads a `.csv` / `.tsv` table with `class_name` and `examples` columns.
///
/// Rows are returned in file order. A class listed twice keeps its first
/// position and takes the examples of its last row.
///
/// # Errors
///
/// - [`LoadError::InvalidExtension`] unless the file is `.csv` or `.tsv`.
/// - [`LoadError::MissingColumns`] if either column is missing.
pub fn read_examples(path: impl AsRef<Path>) -> Result<Vec<ClassExamples>, LoadError> {
    let path = path.as_ref();
    let mut table = open_table(path, &["class_name", "examples"], &[])?;
    let (name_column, examples_column) = (table.required[0], table.required[1]);
    let display = path.display().to_string();

    let mut classes: Vec<ClassExamples> = Vec::new();
    for record in table.reader.records() {
        let record = record.map_err(|source| csv_error(&display, source))?;
        let class_name = clean_category_name(record.get(name_column).unwrap_or_default());
        if class_name.is_empty() {
            continue;
        }
        let examples = record
            .get(examples_column)
            .unwrap_or_default()
            .trim()
            .to_string();

        match classes.iter_mut().find(|c| c.class_name == class_name) {
            Some(existing) => existing.examples = examples,
            None => classes.push(ClassExamples {
                class_name,
                examples,
            }),
        }
    }

    info!(count = classes.len(), "Loaded class examples from {}", path.display());
    Ok(classes)
}
