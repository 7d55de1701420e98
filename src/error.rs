//! Error types for chart merging and publishing.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for all chartmerge operations.
#[derive(Debug, Error)]
pub enum ChartError {
    /// No chart CSV files were found under the input directory.
    #[error("No input CSV files found in {0}")]
    NoInput(PathBuf),

    /// A CSV file lacks a column an operation needs.
    #[error("Missing column '{column}' in {file}")]
    MissingColumn {
        /// Column name.
        column: String,
        /// File (or table) that was inspected.
        file: String,
    },

    /// A trigger path pattern could not be compiled.
    #[error("Invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending glob.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A git command failed.
    #[error("Git error: {0}")]
    Git(String),

    /// The push token environment variable is not set.
    #[error("Push token not found in environment variable {0}")]
    MissingToken(String),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML config parsing failed.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for chartmerge operations.
pub type Result<T> = std::result::Result<T, ChartError>;
