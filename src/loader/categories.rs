use std::path::Path;

use serde_json::Value;
use tracing::info;

use super::{LoadError, csv_error, extension_of, open_table, read_text};
use crate::{Category, CategorySet};

const CLASS_NAME_COLUMN: &str = "class_name";
const DESCRIPTION_COLUMN: &str = "desc";

/// Reads a category file into an ordered [`CategorySet`].
///
/// The format is chosen from the extension:
///
/// - `.json`: an object mapping category name to description. A `null`
///   description counts as empty.
/// - `.csv` / `.tsv`: a header with a required `class_name` column and an
///   optional `desc` column. Missing descriptions default to empty.
///
/// Category names are trimmed and stripped of leading `#` markers.
///
/// # Errors
///
/// - [`LoadError::InvalidExtension`] for any other extension.
/// - [`LoadError::MissingColumns`] when `class_name` is absent.
/// - [`LoadError::Json`] / [`LoadError::InvalidJsonShape`] for bad JSON.
/// - [`LoadError::Io`] / [`LoadError::Csv`] when the file cannot be read.
pub fn read_categories(path: impl AsRef<Path>) -> Result<CategorySet, LoadError> {
    let path = path.as_ref();

    let categories = match extension_of(path).as_str() {
        "json" => read_json_categories(path)?,
        "csv" | "tsv" => read_table_categories(path)?,
        other => {
            return Err(LoadError::InvalidExtension {
                path: path.display().to_string(),
                extension: other.to_string(),
                expected: "json, csv or tsv",
            });
        }
    };

    info!(count = categories.len(), "Loaded category descriptions from {}", path.display());
    Ok(categories)
}

fn read_json_categories(path: &Path) -> Result<CategorySet, LoadError> {
    let content = read_text(path)?;
    parse_json_categories(&content).map_err(|error| match error {
        JsonCategoryError::Syntax(source) => LoadError::Json {
            path: path.display().to_string(),
            source,
        },
        JsonCategoryError::Shape(message) => LoadError::InvalidJsonShape {
            path: path.display().to_string(),
            message,
        },
    })
}

enum JsonCategoryError {
    Syntax(serde_json::Error),
    Shape(String),
}

/// Parses a JSON object of `name -> description`, preserving key order.
fn parse_json_categories(content: &str) -> Result<CategorySet, JsonCategoryError> {
    let value: Value = serde_json::from_str(content).map_err(JsonCategoryError::Syntax)?;
    let Value::Object(entries) = value else {
        return Err(JsonCategoryError::Shape(
            "expected an object mapping category names to descriptions".to_string(),
        ));
    };

    let mut categories = CategorySet::new();
    for (name, description) in entries {
        let description = match description {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => {
                return Err(JsonCategoryError::Shape(format!(
                    "description of {name:?} must be a string, found {other}"
                )));
            }
        };
        categories.insert(Category::new(&name, description));
    }
    Ok(categories)
}

fn read_table_categories(path: &Path) -> Result<CategorySet, LoadError> {
    let mut table = open_table(path, &[CLASS_NAME_COLUMN], &[DESCRIPTION_COLUMN])?;
    let name_column = table.required[0];
    let description_column = table.optional[0];
    let display = path.display().to_string();

    let mut categories = CategorySet::new();
    for record in table.reader.records() {
        let record = record.map_err(|source| csv_error(&display, source))?;
        let Some(name) = record.get(name_column) else {
            continue;
        };
        let description = description_column
            .and_then(|column| record.get(column))
            .unwrap_or_default();
        categories.insert(Category::new(name, description));
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_categories_keep_file_order() {
        let json = r##"{"Soil": "land-related", "#Marine": "ocean-related", "Host": null}"##;
        let Ok(categories) = parse_json_categories(json) else {
            panic!("valid category JSON should parse");
        };

        assert_eq!(categories.names(), vec!["Soil", "Marine", "Host"]);
        assert_eq!(categories.get("Marine").unwrap().description(), "ocean-related");
        assert_eq!(categories.get("Host").unwrap().description(), "");
    }

    #[test]
    fn json_array_is_a_shape_error() {
        let result = parse_json_categories(r#"["Soil", "Marine"]"#);
        assert!(matches!(result, Err(JsonCategoryError::Shape(_))));
    }

    #[test]
    fn json_numeric_description_is_a_shape_error() {
        let result = parse_json_categories(r#"{"Soil": 3}"#);
        assert!(matches!(result, Err(JsonCategoryError::Shape(ref m)) if m.contains("Soil")));
    }

    #[test]
    fn malformed_json_is_a_syntax_error() {
        let result = parse_json_categories(r#"{"Soil": "#);
        assert!(matches!(result, Err(JsonCategoryError::Syntax(_))));
    }

    #[test]
    fn unsupported_extension_is_rejected_before_reading() {
        let result = read_categories("/no/such/dir/classes.yaml");
        assert!(matches!(result, Err(LoadError::InvalidExtension { .. })));
    }
}
