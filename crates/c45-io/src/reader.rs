//! CSV dataset reader with type inference, ID-column removal and sampling.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use c45_tree::{FeatureType, FeatureTypes, Instance, feature_type};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::infer::{ColumnProfile, TYPE_SAMPLE_ROWS, convert};

/// Default cap on the expected number of rows loaded from a large file.
pub const DEFAULT_SAMPLE_LIMIT: usize = 100_000;

/// Rows and schema loaded from a CSV file.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Kept column names in header order (ID columns removed).
    pub feature_names: Vec<String>,
    /// Type of every kept column.
    pub feature_types: FeatureTypes,
    /// Loaded rows.
    pub instances: Vec<Instance>,
    /// Columns dropped as row identifiers.
    pub id_columns: Vec<String>,
    /// Data rows in the file, before sampling.
    pub n_rows: usize,
}

/// Reads a headered CSV file into typed [`Instance`]s.
///
/// Construct via [`CsvReader::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default   |
/// |----------------|-----------|
/// | `target`       | `None`    |
/// | `max_rows`     | `None`    |
/// | `sample_limit` | 100 000   |
/// | `seed`         | 42        |
/// | `id_detection` | enabled   |
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingHeader`] | File has no header row |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::UnknownTarget`] | Target column not in header |
#[derive(Debug, Clone)]
pub struct CsvReader {
    path: PathBuf,
    target: Option<String>,
    max_rows: Option<usize>,
    sample_limit: usize,
    seed: u64,
    id_detection: bool,
}

impl CsvReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            target: None,
            max_rows: None,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            seed: 42,
            id_detection: true,
        }
    }

    /// Require `target` to be present; it is never dropped as an ID column.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Stop after loading `max_rows` rows.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Sample files with more than `sample_limit` rows down to about that many.
    #[must_use]
    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    /// Seed for row sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable dropping of ID-like columns.
    #[must_use]
    pub fn with_id_detection(mut self, enabled: bool) -> Self {
        self.id_detection = enabled;
        self
    }

    /// Read the file, inferring column types from the first rows.
    ///
    /// Makes two passes: the first validates every row, counts them and
    /// profiles the first [`TYPE_SAMPLE_ROWS`]; the second converts cells.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let (mut rdr, header) = self.open()?;
        self.check_target(&header)?;

        let mut profiles: Vec<ColumnProfile> =
            header.iter().map(|name| ColumnProfile::new(name)).collect();
        let mut n_rows = 0usize;
        for record in self.records(&mut rdr, header.len()) {
            let record = record?;
            if n_rows < TYPE_SAMPLE_ROWS {
                for (profile, cell) in profiles.iter_mut().zip(record.iter()) {
                    profile.observe(cell);
                }
            }
            n_rows += 1;
        }
        if n_rows == 0 {
            return Err(self.empty());
        }

        let id_columns: Vec<String> = if self.id_detection {
            profiles
                .iter()
                .filter(|p| self.target.as_deref() != Some(p.name()) && p.looks_like_id())
                .map(|p| p.name().to_owned())
                .collect()
        } else {
            Vec::new()
        };
        if !id_columns.is_empty() {
            info!(?id_columns, "dropping ID columns");
        }

        let types: Vec<FeatureType> = profiles.iter().map(ColumnProfile::inferred_type).collect();
        let dropped: HashSet<&str> = id_columns.iter().map(String::as_str).collect();
        let keep: Vec<bool> = header.iter().map(|h| !dropped.contains(h.as_str())).collect();
        debug!(n_rows, n_columns = header.len(), "first pass complete");

        let keep_probability = (n_rows > self.sample_limit)
            .then(|| self.sample_limit as f64 / n_rows as f64);
        if let Some(p) = keep_probability {
            info!(n_rows, rate = p, "sampling large dataset");
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let (mut rdr, _) = self.open()?;
        let mut instances = Vec::with_capacity(n_rows.min(self.sample_limit));
        for record in self.records(&mut rdr, header.len()) {
            let record = record?;
            if let Some(p) = keep_probability
                && !rng.gen_bool(p)
            {
                continue;
            }
            instances.push(to_instance(&header, &types, &keep, &record));
            if self.max_rows.is_some_and(|max| instances.len() >= max) {
                break;
            }
        }
        if instances.is_empty() {
            return Err(self.empty());
        }

        let feature_names: Vec<String> = header
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(h, _)| h.clone())
            .collect();
        let feature_types: FeatureTypes = header
            .iter()
            .zip(&types)
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|((h, t), _)| (h.clone(), *t))
            .collect();

        info!(
            n_instances = instances.len(),
            n_rows,
            n_features = feature_names.len(),
            "dataset loaded"
        );

        Ok(Dataset {
            feature_names,
            feature_types,
            instances,
            id_columns,
            n_rows,
        })
    }

    /// Read the file using known column types, without inference or sampling.
    ///
    /// Columns absent from `feature_types` are read as categorical.
    #[instrument(skip(self, feature_types), fields(path = %self.path.display()))]
    pub fn read_for_model(&self, feature_types: &FeatureTypes) -> Result<Dataset, IoError> {
        let (mut rdr, header) = self.open()?;
        self.check_target(&header)?;

        let types: Vec<FeatureType> = header
            .iter()
            .map(|h| feature_type(feature_types, h))
            .collect();
        let keep = vec![true; header.len()];

        let mut instances = Vec::new();
        for record in self.records(&mut rdr, header.len()) {
            let record = record?;
            instances.push(to_instance(&header, &types, &keep, &record));
            if self.max_rows.is_some_and(|max| instances.len() >= max) {
                break;
            }
        }
        if instances.is_empty() {
            return Err(self.empty());
        }

        info!(n_instances = instances.len(), "prediction input loaded");
        let n_rows = instances.len();
        Ok(Dataset {
            feature_types: header.iter().cloned().zip(types).collect(),
            feature_names: header,
            instances,
            id_columns: Vec::new(),
            n_rows,
        })
    }

    fn open(&self) -> Result<(csv::Reader<File>, Vec<String>), IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that InconsistentRowLength fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.parse_error(e))?
            .iter()
            .map(String::from)
            .collect();
        if header.is_empty() || header.iter().all(String::is_empty) {
            return Err(IoError::MissingHeader {
                path: self.path.clone(),
            });
        }
        Ok((rdr, header))
    }

    fn records<'r>(
        &'r self,
        rdr: &'r mut csv::Reader<File>,
        expected: usize,
    ) -> impl Iterator<Item = Result<csv::StringRecord, IoError>> + 'r {
        rdr.records().enumerate().map(move |(row_index, result)| {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            Ok(record)
        })
    }

    fn check_target(&self, header: &[String]) -> Result<(), IoError> {
        match &self.target {
            Some(target) if !header.contains(target) => Err(IoError::UnknownTarget {
                path: self.path.clone(),
                target: target.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn empty(&self) -> IoError {
        IoError::EmptyDataset {
            path: self.path.clone(),
        }
    }
}

fn to_instance(
    header: &[String],
    types: &[FeatureType],
    keep: &[bool],
    record: &csv::StringRecord,
) -> Instance {
    header
        .iter()
        .zip(types)
        .zip(keep)
        .zip(record.iter())
        .filter(|((_, keep), _)| **keep)
        .map(|(((name, ty), _), cell)| (name.clone(), convert(cell, *ty)))
        .collect()
}
