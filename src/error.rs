use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring the article table into memory. Fatal to startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tabular data in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("required column '{column}' missing from {}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("no header row in {}", .0.display())]
    Empty(PathBuf),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query cancelled")]
    Cancelled,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("threshold must be within 0..=100, got {0}")]
    ThresholdOutOfRange(u8),

    #[error("unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_path() {
        let err = LoadError::NotFound(PathBuf::from("data/kb.csv"));
        assert_eq!(err.to_string(), "data file not found: data/kb.csv");
    }

    #[test]
    fn missing_column_message() {
        let err = LoadError::MissingColumn {
            path: PathBuf::from("kb.csv"),
            column: "keywords",
        };
        assert!(err.to_string().contains("'keywords'"));
    }
}
