//! Typed cell values, row instances, and feature type tags.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Declared type of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    /// Floating-point or integer column.
    Numerical,
    /// Free-form labels compared by exact string match.
    Categorical,
    /// Calendar date, projected to epoch seconds at UTC midnight.
    Date,
    /// Point in time, projected to epoch seconds.
    Timestamp,
}

impl FeatureType {
    /// Return `true` when splits on this feature use a numeric threshold.
    #[must_use]
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            FeatureType::Numerical | FeatureType::Date | FeatureType::Timestamp
        )
    }

    /// Return the lowercase tag used in persisted models.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureType::Numerical => "numerical",
            FeatureType::Categorical => "categorical",
            FeatureType::Date => "date",
            FeatureType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numerical" => Ok(FeatureType::Numerical),
            "categorical" => Ok(FeatureType::Categorical),
            "date" => Ok(FeatureType::Date),
            "timestamp" => Ok(FeatureType::Timestamp),
            other => Err(format!("unknown feature type: {other}")),
        }
    }
}

/// Feature name → declared type, ordered by name.
pub type FeatureTypes = BTreeMap<String, FeatureType>;

/// Look up a feature's declared type. Undeclared features are categorical.
#[must_use]
pub fn feature_type(types: &FeatureTypes, feature: &str) -> FeatureType {
    types
        .get(feature)
        .copied()
        .unwrap_or(FeatureType::Categorical)
}

/// A single dynamically-typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// Numeric value.
    Number(f64),
    /// Text value, also used for cells that failed their column's parser.
    Text(String),
    /// Calendar date.
    Date(NaiveDate),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Return `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Project the value onto the real line for threshold comparisons.
    ///
    /// Dates and timestamps become seconds since the Unix epoch. Text, null
    /// and non-finite numbers yield `None`.
    #[must_use]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Number(v) if v.is_finite() => Some(*v),
            Value::Date(d) => Some(d.and_time(NaiveTime::MIN).and_utc().timestamp() as f64),
            Value::Timestamp(t) => Some(t.timestamp() as f64),
            Value::Number(_) | Value::Text(_) | Value::Null => None,
        }
    }

    /// Stringify the value for categorical comparison. Null yields `None`.
    #[must_use]
    pub fn as_category(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One row of the dataset, keyed by feature name.
///
/// A row need not contain every column; an absent key and a [`Value::Null`]
/// entry are both treated as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    values: HashMap<String, Value>,
}

impl Instance {
    /// Create an empty instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance with `feature` set to `value`.
    #[must_use]
    pub fn with(mut self, feature: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(feature, value);
        self
    }

    /// Set `feature` to `value`, replacing any previous entry.
    pub fn insert(&mut self, feature: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(feature.into(), value.into());
    }

    /// Return the value for `feature`, or `None` when absent or null.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&Value> {
        self.values.get(feature).filter(|v| !v.is_null())
    }

    /// Numeric projection of `feature`, if present and coercible.
    #[must_use]
    pub fn numeric(&self, feature: &str) -> Option<f64> {
        self.get(feature).and_then(Value::as_numeric)
    }

    /// Categorical projection of `feature`, if present.
    #[must_use]
    pub fn category(&self, feature: &str) -> Option<String> {
        self.get(feature).and_then(Value::as_category)
    }

    /// Number of stored entries, including explicit nulls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when the instance has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(feature, value)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Instance {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn numeric_projection_of_number() {
        assert_eq!(Value::Number(2.5).as_numeric(), Some(2.5));
    }

    #[test]
    fn numeric_projection_rejects_text_and_nan() {
        assert_eq!(Value::from("abc").as_numeric(), None);
        assert_eq!(Value::Number(f64::NAN).as_numeric(), None);
        assert_eq!(Value::Null.as_numeric(), None);
    }

    #[test]
    fn date_projects_to_epoch_midnight() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(Value::Date(d).as_numeric(), Some(86_400.0));
    }

    #[test]
    fn timestamp_projects_to_epoch_seconds() {
        let t = Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 40).unwrap();
        assert_eq!(Value::Timestamp(t).as_numeric(), Some(100.0));
    }

    #[test]
    fn category_of_integral_number_has_no_fraction() {
        assert_eq!(Value::Number(25.0).as_category().as_deref(), Some("25"));
        assert_eq!(Value::Number(2.5).as_category().as_deref(), Some("2.5"));
    }

    #[test]
    fn category_of_date() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(d).as_category().as_deref(), Some("2024-03-09"));
    }

    #[test]
    fn null_is_missing_in_instance() {
        let row = Instance::new().with("a", Value::Null).with("b", 1.0);
        assert!(row.get("a").is_none());
        assert!(row.get("missing").is_none());
        assert_eq!(row.numeric("b"), Some(1.0));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn option_converts_to_null() {
        let v: Value = Option::<f64>::None.into();
        assert!(v.is_null());
    }

    #[test]
    fn feature_type_round_trip_through_str() {
        for ty in [
            FeatureType::Numerical,
            FeatureType::Categorical,
            FeatureType::Date,
            FeatureType::Timestamp,
        ] {
            assert_eq!(ty.as_str().parse::<FeatureType>().unwrap(), ty);
        }
        assert!("boolean".parse::<FeatureType>().is_err());
    }

    #[test]
    fn continuous_types() {
        assert!(FeatureType::Numerical.is_continuous());
        assert!(FeatureType::Date.is_continuous());
        assert!(FeatureType::Timestamp.is_continuous());
        assert!(!FeatureType::Categorical.is_continuous());
    }

    #[test]
    fn undeclared_feature_is_categorical() {
        let types = FeatureTypes::new();
        assert_eq!(feature_type(&types, "x"), FeatureType::Categorical);
    }
}
