//! CSV writer for batch predictions.

use std::path::{Path, PathBuf};

use c45_tree::Prediction;
use tracing::{info, instrument};

use crate::IoError;

/// Writes predictions as a `prediction,confidence` CSV, one row per input row.
pub struct PredictionWriter {
    path: PathBuf,
}

impl PredictionWriter {
    /// Create a writer targeting `path`. Nothing is written until [`write`](Self::write).
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write `predictions` in order, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be created or written.
    #[instrument(skip_all, fields(path = %self.path.display(), n = predictions.len()))]
    pub fn write(&self, predictions: &[Prediction]) -> Result<(), IoError> {
        let write_err = |e: csv::Error| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        };

        let mut wtr = csv::Writer::from_path(&self.path).map_err(write_err)?;
        wtr.write_record(["prediction", "confidence"])
            .map_err(write_err)?;
        for p in predictions {
            let confidence = format!("{:.6}", p.confidence);
            wtr.write_record([p.label.as_str(), confidence.as_str()])
                .map_err(write_err)?;
        }
        wtr.flush().map_err(|e| write_err(e.into()))?;

        info!("predictions written");
        Ok(())
    }
}
