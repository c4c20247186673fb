//! Per-feature summaries computed once per training run.
//!
//! Continuous features keep a sorted, deduplicated sample of at most
//! [`MAX_THRESHOLD_CANDIDATES`] values, so threshold search cost does not grow
//! with cardinality. Categorical features keep a value → count table. The
//! cache is built by a parallel pass over the features and never written
//! again; workers share it by reference.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::counter::ClassCounter;
use crate::value::{FeatureType, FeatureTypes, Instance, feature_type};

/// Upper bound on the number of cached values for a continuous feature.
pub const MAX_THRESHOLD_CANDIDATES: usize = 100;

/// Cached summary for a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSummary {
    /// Sorted, deduplicated numeric projections (possibly down-sampled).
    Continuous(Vec<f64>),
    /// Stringified value → occurrence count.
    Categorical(BTreeMap<String, usize>),
}

/// Read-only feature statistics shared by every split search of one training run.
#[derive(Debug, Clone, Default)]
pub struct FeatureCache {
    summaries: HashMap<String, FeatureSummary>,
    target_counts: BTreeMap<String, usize>,
}

impl FeatureCache {
    /// Summarize every feature in `features` over `instances`.
    ///
    /// Features are processed in parallel on the rayon pool. Target counts
    /// are accumulated once. Values that cannot be projected to the
    /// feature's declared kind are skipped; a feature with no usable values
    /// gets an empty summary.
    #[instrument(skip_all, fields(n_instances = instances.len(), n_features = features.len()))]
    pub fn precompute(
        instances: &[&Instance],
        features: &[String],
        target: &str,
        feature_types: &FeatureTypes,
    ) -> Self {
        let target_counts = instances
            .iter()
            .filter_map(|inst| inst.category(target))
            .fold(ClassCounter::new(), |mut acc, label| {
                acc.add(&label);
                acc
            })
            .into_counts();

        let summaries: HashMap<String, FeatureSummary> = features
            .par_iter()
            .map(|feature| {
                let summary = match feature_type(feature_types, feature) {
                    FeatureType::Categorical => {
                        FeatureSummary::Categorical(value_counts(instances, feature))
                    }
                    _ => FeatureSummary::Continuous(sorted_sample(instances, feature)),
                };
                (feature.clone(), summary)
            })
            .collect();

        debug!(
            n_summaries = summaries.len(),
            n_labels = target_counts.len(),
            "feature cache built"
        );

        Self {
            summaries,
            target_counts,
        }
    }

    /// Assemble a cache from already-computed parts.
    #[must_use]
    pub fn from_parts(
        summaries: HashMap<String, FeatureSummary>,
        target_counts: BTreeMap<String, usize>,
    ) -> Self {
        Self {
            summaries,
            target_counts,
        }
    }

    /// Summary for `feature`, if one was computed.
    #[must_use]
    pub fn summary(&self, feature: &str) -> Option<&FeatureSummary> {
        self.summaries.get(feature)
    }

    /// Cached threshold candidates for a continuous feature.
    ///
    /// Empty when the feature is unknown or categorical.
    #[must_use]
    pub fn sorted_values(&self, feature: &str) -> &[f64] {
        match self.summaries.get(feature) {
            Some(FeatureSummary::Continuous(values)) => values,
            _ => &[],
        }
    }

    /// Cached value counts for a categorical feature.
    #[must_use]
    pub fn value_counts(&self, feature: &str) -> Option<&BTreeMap<String, usize>> {
        match self.summaries.get(feature) {
            Some(FeatureSummary::Categorical(counts)) => Some(counts),
            _ => None,
        }
    }

    /// Number of distinct cached values for a categorical feature.
    #[must_use]
    pub fn n_distinct(&self, feature: &str) -> usize {
        self.value_counts(feature).map_or(0, BTreeMap::len)
    }

    /// Target label → count over the whole training set.
    #[must_use]
    pub fn target_counts(&self) -> &BTreeMap<String, usize> {
        &self.target_counts
    }

    /// Number of summarized features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Return `true` when no feature was summarized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

fn value_counts(instances: &[&Instance], feature: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in instances.iter().filter_map(|inst| inst.category(feature)) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

fn sorted_sample(instances: &[&Instance], feature: &str) -> Vec<f64> {
    let mut values: Vec<f64> = instances
        .iter()
        .filter_map(|inst| inst.numeric(feature))
        .collect();
    values.sort_unstable_by(f64::total_cmp);
    values.dedup();
    downsample(values)
}

/// Reduce a sorted list to exactly [`MAX_THRESHOLD_CANDIDATES`] values by
/// even-stride index selection. Shorter lists are returned unchanged.
pub(crate) fn downsample(values: Vec<f64>) -> Vec<f64> {
    let n = values.len();
    if n <= MAX_THRESHOLD_CANDIDATES {
        return values;
    }
    let step = n as f64 / MAX_THRESHOLD_CANDIDATES as f64;
    (0..MAX_THRESHOLD_CANDIDATES)
        .map(|i| values[((i as f64 * step) as usize).min(n - 1)])
        .collect()
}
