//! Gain-ratio evaluation of a single candidate feature.

use std::collections::{BTreeMap, HashSet};

use crate::cache::FeatureCache;
use crate::counter::ClassCounter;
use crate::value::{FeatureTypes, Instance};

/// Split information below this is treated as zero.
pub const SPLIT_INFO_EPSILON: f64 = 1e-10;

/// Normalize information gain by split information.
///
/// Returns 0 when the gain is non-positive or the split information is
/// negligible, so near-empty partitions cannot inflate the ratio.
#[must_use]
pub fn gain_ratio(info_gain: f64, split_info: f64) -> f64 {
    if info_gain <= 0.0 || split_info < SPLIT_INFO_EPSILON {
        0.0
    } else {
        info_gain / split_info
    }
}

/// Information gain and split information of a partition.
///
/// `groups` are the per-branch label counters and `total` the size of the
/// parent set (which may exceed the sum of the groups when some instances
/// had no usable value). Empty groups contribute nothing.
#[must_use]
pub fn partition_gain(base_entropy: f64, groups: &[&ClassCounter], total: usize) -> (f64, f64) {
    if total == 0 {
        return (0.0, 0.0);
    }
    let n = total as f64;
    let mut info_gain = base_entropy;
    let mut split_info = 0.0;
    for group in groups.iter().filter(|g| !g.is_empty()) {
        let p = group.total() as f64 / n;
        info_gain -= p * group.entropy();
        split_info -= p * p.log2();
    }
    (info_gain, split_info)
}

/// Everything an evaluator needs to score features at one tree node.
///
/// Borrowed for the duration of one split search and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct SplitContext<'a> {
    instances: &'a [&'a Instance],
    features: &'a [String],
    target: &'a str,
    feature_types: &'a FeatureTypes,
    excluded: &'a HashSet<String>,
    cache: &'a FeatureCache,
    base_entropy: f64,
}

impl<'a> SplitContext<'a> {
    /// Build a context, computing the base entropy of `instances`.
    #[must_use]
    pub fn new(
        instances: &'a [&'a Instance],
        features: &'a [String],
        target: &'a str,
        feature_types: &'a FeatureTypes,
        excluded: &'a HashSet<String>,
        cache: &'a FeatureCache,
    ) -> Self {
        let base_entropy = label_counter(instances, target).entropy();
        Self {
            instances,
            features,
            target,
            feature_types,
            excluded,
            cache,
            base_entropy,
        }
    }

    /// Instances reaching the node.
    #[must_use]
    pub fn instances(&self) -> &'a [&'a Instance] {
        self.instances
    }

    /// Candidate features.
    #[must_use]
    pub fn features(&self) -> &'a [String] {
        self.features
    }

    /// Target feature name.
    #[must_use]
    pub fn target(&self) -> &'a str {
        self.target
    }

    /// Declared feature types.
    #[must_use]
    pub fn feature_types(&self) -> &'a FeatureTypes {
        self.feature_types
    }

    /// Training-run feature cache.
    #[must_use]
    pub fn cache(&self) -> &'a FeatureCache {
        self.cache
    }

    /// Entropy of the target labels at this node.
    #[must_use]
    pub fn base_entropy(&self) -> f64 {
        self.base_entropy
    }

    /// Return `true` if `feature` must not be split on here.
    #[must_use]
    pub fn is_excluded(&self, feature: &str) -> bool {
        feature == self.target || self.excluded.contains(feature)
    }

    fn label(&self, instance: &Instance) -> String {
        instance.category(self.target).unwrap_or_default()
    }
}

/// Best achievable split for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    /// Candidate feature name.
    pub feature: String,
    /// Gain ratio of the best split on this feature (0 when none is viable).
    pub gain_ratio: f64,
    /// Whether the feature is split by threshold.
    pub continuous: bool,
    /// Chosen threshold for continuous features.
    pub threshold: Option<f64>,
}

impl SplitResult {
    fn none(feature: &str, continuous: bool) -> Self {
        Self {
            feature: feature.to_owned(),
            gain_ratio: 0.0,
            continuous,
            threshold: None,
        }
    }
}

/// Score of one candidate threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdScore {
    /// Gain ratio of the binary partition.
    pub gain_ratio: f64,
    /// Information gain of the binary partition.
    pub info_gain: f64,
    /// Split information of the binary partition.
    pub split_info: f64,
    /// Instances with a value `<= threshold`.
    pub n_left: usize,
    /// Instances with a value `> threshold`.
    pub n_right: usize,
}

impl ThresholdScore {
    /// Both sides received at least one instance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.n_left > 0 && self.n_right > 0
    }
}

/// Score the binary partition of the context's instances at `threshold`.
///
/// Instances whose value for `feature` is missing or not numeric fall on
/// neither side but still count toward the parent size.
#[must_use]
pub fn evaluate_threshold(feature: &str, threshold: f64, ctx: &SplitContext<'_>) -> ThresholdScore {
    let mut left = ClassCounter::new();
    let mut right = ClassCounter::new();
    for inst in ctx.instances {
        let Some(v) = inst.numeric(feature) else {
            continue;
        };
        let label = ctx.label(inst);
        if v <= threshold {
            left.add(&label);
        } else {
            right.add(&label);
        }
    }

    let (info_gain, split_info) =
        partition_gain(ctx.base_entropy, &[&left, &right], ctx.instances.len());

    ThresholdScore {
        gain_ratio: gain_ratio(info_gain, split_info),
        info_gain,
        split_info,
        n_left: left.total(),
        n_right: right.total(),
    }
}

/// Find the best threshold for a continuous feature.
///
/// Candidates are midpoints of adjacent cached values. Fewer than three cached
/// values yield no split. The strictly highest valid gain ratio wins; ties
/// keep the lowest threshold.
#[must_use]
pub fn evaluate_continuous(feature: &str, ctx: &SplitContext<'_>) -> SplitResult {
    let values = ctx.cache.sorted_values(feature);
    if values.len() <= 2 {
        return SplitResult::none(feature, true);
    }

    let mut best_gain = 0.0;
    let mut best_threshold = None;
    for pair in values.windows(2) {
        let threshold = (pair[0] + pair[1]) / 2.0;
        let score = evaluate_threshold(feature, threshold, ctx);
        if score.is_valid() && score.gain_ratio > best_gain {
            best_gain = score.gain_ratio;
            best_threshold = Some(threshold);
        }
    }

    SplitResult {
        feature: feature.to_owned(),
        gain_ratio: best_gain,
        continuous: true,
        threshold: best_threshold,
    }
}

/// Score a multiway split of a categorical feature, one branch per cached value.
///
/// Instances whose value is missing or absent from the cache are ignored.
#[must_use]
pub fn evaluate_categorical(feature: &str, ctx: &SplitContext<'_>) -> SplitResult {
    let Some(value_counts) = ctx.cache.value_counts(feature).filter(|c| !c.is_empty()) else {
        return SplitResult::none(feature, false);
    };

    let mut groups: BTreeMap<&str, ClassCounter> = value_counts
        .keys()
        .map(|value| (value.as_str(), ClassCounter::new()))
        .collect();
    for inst in ctx.instances {
        let Some(value) = inst.category(feature) else {
            continue;
        };
        if let Some(counter) = groups.get_mut(value.as_str()) {
            counter.add(&ctx.label(inst));
        }
    }

    let counters: Vec<&ClassCounter> = groups.values().collect();
    let (info_gain, split_info) =
        partition_gain(ctx.base_entropy, &counters, ctx.instances.len());

    SplitResult {
        feature: feature.to_owned(),
        gain_ratio: gain_ratio(info_gain, split_info),
        continuous: false,
        threshold: None,
    }
}

/// Count target labels over `instances`; a missing target counts as `""`.
pub(crate) fn label_counter(instances: &[&Instance], target: &str) -> ClassCounter {
    let mut counter = ClassCounter::new();
    for inst in instances {
        counter.add(&inst.category(target).unwrap_or_default());
    }
    counter
}
