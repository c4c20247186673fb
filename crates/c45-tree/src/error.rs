use std::path::PathBuf;

/// Errors from training and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum C45Error {
    /// Returned when the training set has no usable rows.
    #[error("training dataset has zero instances")]
    EmptyDataset,

    /// Returned when the target feature has no entry in the feature-type map.
    #[error("target feature \"{target}\" not found in feature types")]
    UnknownTarget {
        /// The requested target feature.
        target: String,
    },

    /// Returned when model encoding fails.
    #[error("failed to encode model")]
    EncodeModel {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a persisted model cannot be decoded.
    #[error("failed to decode model")]
    DecodeModel {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl C45Error {
    /// A short explanation of what usually triggers this error.
    #[must_use]
    pub fn cause(&self) -> &'static str {
        match self {
            C45Error::EmptyDataset => "The input contained no rows with a target value.",
            C45Error::UnknownTarget { .. } => "The target column is not in the dataset.",
            C45Error::EncodeModel { .. } => "A value in the tree could not be written as JSON.",
            C45Error::DecodeModel { .. } => "The model file is not a model written by this tool.",
            C45Error::WriteModel { .. } => "The output location is missing or not writable.",
            C45Error::ReadModel { .. } => "The specified model file does not exist.",
        }
    }

    /// What the caller can do about it.
    #[must_use]
    pub fn suggested_fix(&self) -> &'static str {
        match self {
            C45Error::EmptyDataset => "Check that the input file has data rows and a populated target column.",
            C45Error::UnknownTarget { .. } => "Verify the target column name against the header.",
            C45Error::EncodeModel { .. } => "Check the training data for values that cannot be encoded.",
            C45Error::DecodeModel { .. } => "Retrain the model or point at the right file.",
            C45Error::WriteModel { .. } => "Create the output directory or choose another path.",
            C45Error::ReadModel { .. } => "Train a model first or check the file path.",
        }
    }
}
