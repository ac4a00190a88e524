use thiserror::Error;

/// Errors raised while reading input files.
///
/// An unsupported extension and a schema problem are separate variants so
/// callers can tell "wrong kind of file" apart from "right kind of file,
/// wrong contents".
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one this loader understands.
    #[error("Unsupported file extension {extension:?} for {path} (expected {expected})")]
    InvalidExtension {
        path: String,
        extension: String,
        expected: &'static str,
    },

    /// A delimited file is missing required header columns.
    #[error("Missing required column(s) {} in {path}", .missing.join(", "))]
    MissingColumns { path: String, missing: Vec<String> },

    /// The file is not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but does not have the expected shape.
    #[error("Unexpected JSON structure in {path}: {message}")]
    InvalidJsonShape { path: String, message: String },

    /// A delimited file could not be parsed.
    #[error("Failed to parse delimited file {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A line of a tab-separated label file has the wrong number of columns.
    #[error("Malformed line {line} in {path}: expected two tab-separated columns")]
    MalformedLine { path: String, line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_extension_names_the_extension() {
        let error = LoadError::InvalidExtension {
            path: "classes.xlsx".to_string(),
            extension: "xlsx".to_string(),
            expected: "json, csv or tsv",
        };

        let message = error.to_string();
        assert!(message.contains("Unsupported file extension"));
        assert!(message.contains("\"xlsx\""));
        assert!(message.contains("json, csv or tsv"));
    }

    #[test]
    fn missing_columns_lists_every_column() {
        let error = LoadError::MissingColumns {
            path: "classes.tsv".to_string(),
            missing: vec!["class_name".to_string(), "examples".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Missing required column(s) class_name, examples in classes.tsv"
        );
    }

    #[test]
    fn json_error_chains_its_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = LoadError::Json {
            path: "classes.json".to_string(),
            source,
        };

        assert!(error.source().is_some());
    }
}
