//! Column type sniffing, cell conversion and ID-column heuristics.

use std::collections::HashSet;

use c45_tree::{FeatureType, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Rows inspected when inferring column types.
pub const TYPE_SAMPLE_ROWS: usize = 10_000;

/// Distinct values remembered per column for the ID heuristic.
const MAX_TRACKED_DISTINCT: usize = 1_000;

/// Minimum sampled values before the cardinality ID rule applies.
const MIN_ID_SAMPLE: usize = 20;

/// Distinct ratio above which an integral column is treated as an ID.
const ID_DISTINCT_RATIO: f64 = 0.9;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a calendar date in any accepted format.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                .ok()
                .map(|t| t.and_utc())
        })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}

/// Convert one raw cell to a [`Value`] for a column of type `ty`.
///
/// Empty cells become [`Value::Null`]. Cells that fail their column's
/// parser are kept as text.
#[must_use]
pub fn convert(raw: &str, ty: FeatureType) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    let parsed = match ty {
        FeatureType::Numerical => parse_number(raw).map(Value::Number),
        FeatureType::Date => parse_date(raw).map(Value::Date),
        FeatureType::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        FeatureType::Categorical => None,
    };
    parsed.unwrap_or_else(|| Value::Text(raw.to_owned()))
}

/// Running evidence about one column, fed one cell at a time.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    name: String,
    numeric: bool,
    integral: bool,
    date: bool,
    timestamp: bool,
    n_values: usize,
    distinct: HashSet<String>,
}

impl ColumnProfile {
    /// Start a profile for the column `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            numeric: true,
            integral: true,
            date: true,
            timestamp: true,
            n_values: 0,
            distinct: HashSet::new(),
        }
    }

    /// Record one raw cell. Empty cells carry no evidence.
    pub fn observe(&mut self, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        self.n_values += 1;
        if self.distinct.len() < MAX_TRACKED_DISTINCT {
            self.distinct.insert(raw.to_owned());
        }

        if self.numeric {
            match parse_number(raw) {
                Some(v) => self.integral &= v.fract() == 0.0,
                None => self.numeric = false,
            }
        }
        if self.date && parse_date(raw).is_none() {
            self.date = false;
        }
        if self.timestamp && parse_timestamp(raw).is_none() {
            self.timestamp = false;
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-empty cells observed.
    #[must_use]
    pub fn n_values(&self) -> usize {
        self.n_values
    }

    /// Most specific type consistent with every observed cell.
    ///
    /// A column with no values is numerical.
    #[must_use]
    pub fn inferred_type(&self) -> FeatureType {
        if self.numeric {
            FeatureType::Numerical
        } else if self.date {
            FeatureType::Date
        } else if self.timestamp {
            FeatureType::Timestamp
        } else {
            FeatureType::Categorical
        }
    }

    /// Return `true` if the column looks like a row identifier.
    ///
    /// Matches on the header name, or on an integral numeric column whose
    /// sampled values are nearly all distinct.
    #[must_use]
    pub fn looks_like_id(&self) -> bool {
        if is_id_name(&self.name) {
            return true;
        }
        if !self.numeric || !self.integral || self.n_values < MIN_ID_SAMPLE {
            return false;
        }
        let ratio = self.distinct.len() as f64 / self.n_values.min(MAX_TRACKED_DISTINCT) as f64;
        ratio > ID_DISTINCT_RATIO
    }
}

/// Return `true` for headers conventionally used for identifiers.
#[must_use]
pub fn is_id_name(name: &str) -> bool {
    let lower = name.trim().to_ascii_lowercase();
    matches!(lower.as_str(), "id" | "index" | "key")
        || lower.ends_with("_id")
        || lower.ends_with("_key")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, cells: &[&str]) -> ColumnProfile {
        let mut p = ColumnProfile::new(name);
        for c in cells {
            p.observe(c);
        }
        p
    }

    // --- Parsing ---

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("03/09/2024"), Some(expected));
        assert_eq!(parse_date("2024/03/09"), Some(expected));
        assert_eq!(parse_date("9 March 2024"), None);
    }

    #[test]
    fn timestamp_formats() {
        let a = parse_timestamp("2024-03-09T10:00:00Z").unwrap();
        let b = parse_timestamp("2024-03-09 10:00:00").unwrap();
        assert_eq!(a, b);
        let offset = parse_timestamp("2024-03-09T12:00:00+02:00").unwrap();
        assert_eq!(offset, a);
        assert!(parse_timestamp("2024-03-09").is_none());
    }

    #[test]
    fn convert_by_type() {
        assert_eq!(convert("2.5", FeatureType::Numerical), Value::Number(2.5));
        assert_eq!(convert("  ", FeatureType::Numerical), Value::Null);
        assert_eq!(convert("n/a", FeatureType::Numerical), Value::Text("n/a".into()));
        assert_eq!(convert("42", FeatureType::Categorical), Value::Text("42".into()));
        assert!(matches!(convert("2024-01-01", FeatureType::Date), Value::Date(_)));
        assert!(matches!(
            convert("2024-01-01 00:00:00", FeatureType::Timestamp),
            Value::Timestamp(_)
        ));
    }

    // --- Type inference ---

    #[test]
    fn numeric_column() {
        assert_eq!(profile("x", &["1", "2.5", "", "-3"]).inferred_type(), FeatureType::Numerical);
    }

    #[test]
    fn date_column() {
        assert_eq!(
            profile("d", &["2024-01-01", "02/15/2024"]).inferred_type(),
            FeatureType::Date
        );
    }

    #[test]
    fn timestamp_column() {
        assert_eq!(
            profile("t", &["2024-01-01T00:00:00Z", "2024-01-02 08:30:00"]).inferred_type(),
            FeatureType::Timestamp
        );
    }

    #[test]
    fn mixed_column_is_categorical() {
        assert_eq!(profile("c", &["1", "red"]).inferred_type(), FeatureType::Categorical);
        assert_eq!(
            profile("c", &["2024-01-01", "2024-01-01T00:00:00Z"]).inferred_type(),
            FeatureType::Categorical
        );
    }

    #[test]
    fn empty_column_is_numerical() {
        let p = profile("e", &["", ""]);
        assert_eq!(p.inferred_type(), FeatureType::Numerical);
        assert_eq!(p.n_values(), 0);
    }

    // --- ID detection ---

    #[test]
    fn id_names() {
        for name in ["id", "ID", "index", "key", "customer_id", "row_key"] {
            assert!(is_id_name(name), "{name}");
        }
        for name in ["idle", "valid", "keyboard", "paid"] {
            assert!(!is_id_name(name), "{name}");
        }
    }

    #[test]
    fn unique_integers_look_like_id() {
        let cells: Vec<String> = (100..150).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        assert!(profile("serial", &refs).looks_like_id());
    }

    #[test]
    fn unique_floats_are_not_ids() {
        let cells: Vec<String> = (0..50).map(|i| format!("{i}.5")).collect();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        assert!(!profile("weight", &refs).looks_like_id());
    }

    #[test]
    fn small_or_repetitive_columns_are_not_ids() {
        assert!(!profile("n", &["1", "2", "3"]).looks_like_id());
        let cells: Vec<String> = (0..50).map(|i| (i % 5).to_string()).collect();
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        assert!(!profile("bucket", &refs).looks_like_id());
    }
}
