//! I/O error types for c45-io.

use std::path::PathBuf;

/// Errors from reading datasets and writing predictions.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file has no header row.
    #[error("missing header row in {path}")]
    MissingHeader {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the requested target column is not in the header.
    #[error("target column \"{target}\" not found in {path}")]
    UnknownTarget {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested target column.
        target: String,
    },

    /// Returned when an output file cannot be created or written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV or I/O error.
        source: csv::Error,
    },
}

impl IoError {
    /// A short explanation of what usually triggers this error.
    #[must_use]
    pub fn cause(&self) -> &'static str {
        match self {
            IoError::FileNotFound { .. } => "The specified input file does not exist.",
            IoError::CsvParse { .. } => "The file is not valid CSV.",
            IoError::MissingHeader { .. } => "The file is empty or its first line is blank.",
            IoError::EmptyDataset { .. } => "The file has a header but no data rows.",
            IoError::InconsistentRowLength { .. } => "A row has a different number of fields than the header.",
            IoError::UnknownTarget { .. } => "The target column is not in the dataset.",
            IoError::WriteFile { .. } => "The output location is missing or not writable.",
        }
    }

    /// What the caller can do about it.
    #[must_use]
    pub fn suggested_fix(&self) -> &'static str {
        match self {
            IoError::FileNotFound { .. } => "Check the file path and try again.",
            IoError::CsvParse { .. } => "Check quoting and delimiters near the reported offset.",
            IoError::MissingHeader { .. } => "Add a header row naming each column.",
            IoError::EmptyDataset { .. } => "Provide a file with at least one data row.",
            IoError::InconsistentRowLength { .. } => "Fix the reported row so every row has the same number of fields.",
            IoError::UnknownTarget { .. } => "Verify the target column name against the header.",
            IoError::WriteFile { .. } => "Create the output directory or choose another path.",
        }
    }
}
