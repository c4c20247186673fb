//! CSV input and output for the c45 decision-tree pipeline.
//!
//! [`CsvReader`] loads a headered CSV into typed rows, inferring column
//! types, dropping ID-like columns and sampling very large files.
//! [`PredictionWriter`] writes batch predictions back out as CSV.

mod error;
mod infer;
mod reader;
mod writer;

pub use error::IoError;
pub use infer::{ColumnProfile, TYPE_SAMPLE_ROWS, convert, is_id_name, parse_date, parse_timestamp};
pub use reader::{CsvReader, DEFAULT_SAMPLE_LIMIT, Dataset};
pub use writer::PredictionWriter;
