use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, instrument, warn};

use crate::{
    C45Error,
    cache::FeatureCache,
    counter::ClassCounter,
    model::Model,
    node::{Node, UNKNOWN_BRANCH},
    select::find_best_split,
    split::{SplitContext, SplitResult, label_counter},
    value::{FeatureTypes, Instance},
};

/// Configuration for C4.5 tree induction.
///
/// Construct via [`C45Config::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                | Default |
/// |--------------------------|---------|
/// | `max_depth`              | 20      |
/// | `min_instances_per_leaf` | 2       |
/// | `excluded_features`      | empty   |
#[derive(Debug, Clone)]
pub struct C45Config {
    pub(crate) max_depth: usize,
    pub(crate) min_instances_per_leaf: usize,
    pub(crate) excluded_features: HashSet<String>,
}

impl Default for C45Config {
    fn default() -> Self {
        Self::new()
    }
}

impl C45Config {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 20,
            min_instances_per_leaf: 2,
            excluded_features: HashSet::new(),
        }
    }

    /// Set the maximum tree depth. Zero yields a single leaf.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the smallest subset size that may still be split.
    #[must_use]
    pub fn with_min_instances_per_leaf(mut self, min_instances_per_leaf: usize) -> Self {
        self.min_instances_per_leaf = min_instances_per_leaf;
        self
    }

    /// Set features that must never be split on.
    #[must_use]
    pub fn with_excluded_features<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_features = excluded.into_iter().map(Into::into).collect();
        self
    }

    // --- Getters ---

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum subset size for splitting.
    #[must_use]
    pub fn min_instances_per_leaf(&self) -> usize {
        self.min_instances_per_leaf
    }

    /// Return the excluded features.
    #[must_use]
    pub fn excluded_features(&self) -> &HashSet<String> {
        &self.excluded_features
    }

    /// Train a decision tree.
    ///
    /// Rows without a target value are skipped. The target and excluded
    /// features are never split on.
    ///
    /// # Errors
    ///
    /// | Variant                       | When                                            |
    /// |-------------------------------|-------------------------------------------------|
    /// | [`C45Error::EmptyDataset`]    | `instances` is empty or no row has a target     |
    /// | [`C45Error::UnknownTarget`]   | `target` has no entry in `feature_types`        |
    #[instrument(
        skip(self, instances, feature_names, feature_types),
        fields(n_instances = instances.len(), n_features = feature_names.len())
    )]
    pub fn fit(
        &self,
        instances: &[Instance],
        feature_names: &[String],
        target: &str,
        feature_types: &FeatureTypes,
    ) -> Result<Model, C45Error> {
        if instances.is_empty() {
            return Err(C45Error::EmptyDataset);
        }
        if !feature_types.contains_key(target) {
            return Err(C45Error::UnknownTarget {
                target: target.to_owned(),
            });
        }

        let rows: Vec<&Instance> = instances
            .iter()
            .filter(|inst| inst.get(target).is_some())
            .collect();
        let n_skipped = instances.len() - rows.len();
        if n_skipped > 0 {
            warn!(n_skipped, "skipped rows with a missing target value");
        }
        if rows.is_empty() {
            return Err(C45Error::EmptyDataset);
        }

        let candidates: Vec<String> = feature_names
            .iter()
            .filter(|f| f.as_str() != target && !self.excluded_features.contains(f.as_str()))
            .cloned()
            .collect();

        let cache = FeatureCache::precompute(&rows, &candidates, target, feature_types);

        let builder = Builder {
            target,
            feature_types,
            excluded: &self.excluded_features,
            cache: &cache,
            min_instances: self.min_instances_per_leaf,
        };
        let root = builder.build(&rows, &candidates, self.max_depth);

        let model = Model::new(
            root,
            feature_types.clone(),
            feature_names.to_vec(),
            target.to_owned(),
        );
        info!(
            n_rows = rows.len(),
            n_nodes = model.n_nodes(),
            n_leaves = model.n_leaves(),
            depth = model.depth(),
            "tree trained"
        );
        Ok(model)
    }
}

/// Train a decision tree with the default leaf size.
///
/// Shorthand for [`C45Config::fit`] with `max_depth` and `excluded` applied.
///
/// # Errors
///
/// See [`C45Config::fit`].
pub fn train(
    instances: &[Instance],
    feature_names: &[String],
    target: &str,
    feature_types: &FeatureTypes,
    excluded: &[String],
    max_depth: usize,
) -> Result<Model, C45Error> {
    C45Config::new()
        .with_max_depth(max_depth)
        .with_excluded_features(excluded.iter().cloned())
        .fit(instances, feature_names, target, feature_types)
}

/// Immutable state shared by every level of one induction run.
struct Builder<'a> {
    target: &'a str,
    feature_types: &'a FeatureTypes,
    excluded: &'a HashSet<String>,
    cache: &'a FeatureCache,
    min_instances: usize,
}

impl Builder<'_> {
    /// Grow the subtree for `instances` with `depth` levels of budget left.
    fn build(&self, instances: &[&Instance], features: &[String], depth: usize) -> Node {
        if instances.is_empty() {
            debug_assert!(false, "induction reached an empty instance subset");
            return Node::empty_leaf();
        }

        let counter = label_counter(instances, self.target);
        if depth == 0 || counter.n_labels() == 1 {
            return Node::leaf(counter);
        }
        if features.is_empty() || instances.len() < self.min_instances {
            return Node::leaf(counter);
        }

        let ctx = SplitContext::new(
            instances,
            features,
            self.target,
            self.feature_types,
            self.excluded,
            self.cache,
        );
        let Some(split) = find_best_split(&ctx) else {
            debug!(n_instances = instances.len(), depth, "no useful split");
            return Node::leaf(counter);
        };

        debug!(
            feature = %split.feature,
            gain_ratio = split.gain_ratio,
            threshold = ?split.threshold,
            n_instances = instances.len(),
            depth,
            "splitting node"
        );

        if split.continuous {
            self.build_continuous(instances, features, depth, split)
                .unwrap_or_else(|| Node::leaf(counter))
        } else {
            self.build_categorical(instances, features, depth, split, counter)
        }
    }

    /// Binary split at the chosen threshold. `None` when a side would be empty.
    fn build_continuous(
        &self,
        instances: &[&Instance],
        features: &[String],
        depth: usize,
        split: SplitResult,
    ) -> Option<Node> {
        let threshold = split.threshold?;
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &inst in instances {
            match inst.numeric(&split.feature) {
                Some(v) if v <= threshold => left.push(inst),
                Some(_) => right.push(inst),
                None => {}
            }
        }
        if left.is_empty() || right.is_empty() {
            return None;
        }

        let children = vec![
            self.build(&left, features, depth - 1),
            self.build(&right, features, depth - 1),
        ];
        Some(Node::Decision {
            value: None,
            feature: split.feature,
            continuous: true,
            threshold,
            children,
        })
    }

    /// One child per observed value, plus an `unknown` child when some values
    /// are missing here or cached values have no partition.
    ///
    /// The synthetic `unknown` child is always last. A real category spelled
    /// like it forces the synthetic child so unseen values never reach the
    /// real one.
    fn build_categorical(
        &self,
        instances: &[&Instance],
        features: &[String],
        depth: usize,
        split: SplitResult,
        counter: ClassCounter,
    ) -> Node {
        let mut groups: BTreeMap<String, Vec<&Instance>> = BTreeMap::new();
        let mut n_missing = 0usize;
        for &inst in instances {
            match inst.category(&split.feature) {
                Some(value) => groups.entry(value).or_default().push(inst),
                None => n_missing += 1,
            }
        }

        let remaining: Vec<String> = features
            .iter()
            .filter(|f| **f != split.feature)
            .cloned()
            .collect();

        let mut children: Vec<Node> = groups
            .iter()
            .map(|(value, group)| self.build(group, &remaining, depth - 1).with_value(value))
            .collect();

        if n_missing > 0
            || groups.len() < self.cache.n_distinct(&split.feature)
            || groups.contains_key(UNKNOWN_BRANCH)
        {
            children.push(Node::leaf(counter).with_value(UNKNOWN_BRANCH));
        }

        Node::Decision {
            value: None,
            feature: split.feature,
            continuous: false,
            threshold: 0.0,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FeatureType;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn buyers() -> (Vec<Instance>, Vec<String>, FeatureTypes) {
        let rows = vec![
            Instance::new().with("age", 25.0).with("income", "low").with("buys", "no"),
            Instance::new().with("age", 45.0).with("income", "high").with("buys", "yes"),
            Instance::new().with("age", 50.0).with("income", "high").with("buys", "yes"),
            Instance::new().with("age", 23.0).with("income", "low").with("buys", "no"),
        ];
        let types: FeatureTypes = [
            ("age".to_string(), FeatureType::Numerical),
            ("income".to_string(), FeatureType::Categorical),
            ("buys".to_string(), FeatureType::Categorical),
        ]
        .into_iter()
        .collect();
        (rows, names(&["age", "income", "buys"]), types)
    }

    // --- Config ---

    #[test]
    fn config_defaults() {
        let cfg = C45Config::new();
        assert_eq!(cfg.max_depth(), 20);
        assert_eq!(cfg.min_instances_per_leaf(), 2);
        assert!(cfg.excluded_features().is_empty());
    }

    #[test]
    fn config_setters() {
        let cfg = C45Config::new()
            .with_max_depth(3)
            .with_min_instances_per_leaf(5)
            .with_excluded_features(["id"]);
        assert_eq!(cfg.max_depth(), 3);
        assert_eq!(cfg.min_instances_per_leaf(), 5);
        assert!(cfg.excluded_features().contains("id"));
    }

    // --- Validation ---

    #[test]
    fn empty_dataset_rejected() {
        let (_, names, types) = buyers();
        let err = C45Config::new().fit(&[], &names, "buys", &types).unwrap_err();
        assert!(matches!(err, C45Error::EmptyDataset));
    }

    #[test]
    fn unknown_target_rejected() {
        let (rows, names, types) = buyers();
        let err = C45Config::new().fit(&rows, &names, "nope", &types).unwrap_err();
        assert!(matches!(err, C45Error::UnknownTarget { target } if target == "nope"));
    }

    #[test]
    fn rows_without_target_are_skipped() {
        let (_, names, types) = buyers();
        let rows = vec![Instance::new().with("age", 1.0), Instance::new().with("age", 2.0)];
        let err = C45Config::new().fit(&rows, &names, "buys", &types).unwrap_err();
        assert!(matches!(err, C45Error::EmptyDataset));
    }

    // --- Induction ---

    #[test]
    fn numeric_tie_with_categorical_prefers_smaller_name() {
        let (rows, names, types) = buyers();
        let model = C45Config::new().fit(&rows, &names, "buys", &types).unwrap();
        let root = model.root();
        assert_eq!(root.feature(), Some("age"));
        let Node::Decision { threshold, continuous, children, .. } = root else {
            panic!("expected a decision root");
        };
        assert!(*continuous);
        assert_eq!(*threshold, 35.0);
        assert_eq!(children[0].class(), Some("no"));
        assert_eq!(children[1].class(), Some("yes"));
    }

    #[test]
    fn categorical_split_when_numeric_excluded() {
        let (rows, names, types) = buyers();
        let model = C45Config::new()
            .with_excluded_features(["age"])
            .fit(&rows, &names, "buys", &types)
            .unwrap();
        let root = model.root();
        assert_eq!(root.feature(), Some("income"));
        let values: Vec<_> = root.children().iter().map(Node::value).collect();
        assert_eq!(values, vec![Some("high"), Some("low")]);
    }

    #[test]
    fn zero_depth_gives_single_leaf() {
        let (rows, names, types) = buyers();
        let model = C45Config::new()
            .with_max_depth(0)
            .fit(&rows, &names, "buys", &types)
            .unwrap();
        assert!(model.root().is_leaf());
        assert_eq!(model.root().class(), Some("no"));
    }

    #[test]
    fn pure_subset_gives_leaf() {
        let rows = vec![
            Instance::new().with("x", 1.0).with("y", "a"),
            Instance::new().with("x", 2.0).with("y", "a"),
            Instance::new().with("x", 3.0).with("y", "a"),
        ];
        let types: FeatureTypes = [
            ("x".to_string(), FeatureType::Numerical),
            ("y".to_string(), FeatureType::Categorical),
        ]
        .into_iter()
        .collect();
        let model = train(&rows, &names(&["x", "y"]), "y", &types, &[], 5).unwrap();
        assert!(model.root().is_leaf());
        assert_eq!(model.root().class(), Some("a"));
        assert_eq!(model.root().distribution().unwrap().get("a"), Some(&3));
    }

    #[test]
    fn too_few_instances_gives_majority_leaf() {
        let (rows, names, types) = buyers();
        let model = C45Config::new()
            .with_min_instances_per_leaf(10)
            .fit(&rows, &names, "buys", &types)
            .unwrap();
        assert!(model.root().is_leaf());
    }

    #[test]
    fn missing_categorical_values_add_unknown_child() {
        let mut rows = Vec::new();
        for _ in 0..3 {
            rows.push(Instance::new().with("color", "red").with("y", "a"));
            rows.push(Instance::new().with("color", "blue").with("y", "b"));
        }
        rows.push(Instance::new().with("y", "a"));
        let types: FeatureTypes = [
            ("color".to_string(), FeatureType::Categorical),
            ("y".to_string(), FeatureType::Categorical),
        ]
        .into_iter()
        .collect();
        let model = train(&rows, &names(&["color", "y"]), "y", &types, &[], 5).unwrap();
        let root = model.root();
        assert_eq!(root.feature(), Some("color"));
        let last = root.children().last().unwrap();
        assert_eq!(last.value(), Some(UNKNOWN_BRANCH));
        assert_eq!(last.class(), Some("a"));
    }

    #[test]
    fn real_unknown_category_keeps_synthetic_child_last() {
        let mut rows = Vec::new();
        for _ in 0..3 {
            rows.push(Instance::new().with("color", "red").with("y", "a"));
            rows.push(Instance::new().with("color", "unknown").with("y", "b"));
        }
        let types: FeatureTypes = [
            ("color".to_string(), FeatureType::Categorical),
            ("y".to_string(), FeatureType::Categorical),
        ]
        .into_iter()
        .collect();
        let model = train(&rows, &names(&["color", "y"]), "y", &types, &[], 5).unwrap();
        let children = model.root().children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1].value(), Some(UNKNOWN_BRANCH));
        assert_eq!(children[1].class(), Some("b"));
        assert_eq!(children[2].value(), Some(UNKNOWN_BRANCH));
        assert_eq!(children[2].distribution().unwrap().values().sum::<usize>(), 6);

        assert_eq!(model.predict_class(&Instance::new().with("color", "unknown")), "b");
        let unseen = model.predict(&Instance::new().with("color", "green"));
        assert_eq!(unseen.label, "a");
        assert!((unseen.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn no_unknown_child_when_every_value_is_present() {
        let (rows, names, types) = buyers();
        let model = C45Config::new()
            .with_excluded_features(["age"])
            .fit(&rows, &names, "buys", &types)
            .unwrap();
        assert!(
            model
                .root()
                .children()
                .iter()
                .all(|c| c.value() != Some(UNKNOWN_BRANCH))
        );
    }

    #[test]
    fn continuous_feature_can_be_reused_deeper() {
        // a a b b a a: needs two thresholds on the same feature.
        let labels = ["a", "a", "b", "b", "a", "a"];
        let rows: Vec<Instance> = labels
            .iter()
            .enumerate()
            .map(|(i, &y)| Instance::new().with("x", i as f64).with("y", y))
            .collect();
        let types: FeatureTypes = [
            ("x".to_string(), FeatureType::Numerical),
            ("y".to_string(), FeatureType::Categorical),
        ]
        .into_iter()
        .collect();
        let model = train(&rows, &names(&["x", "y"]), "y", &types, &[], 5).unwrap();
        assert_eq!(model.root().feature(), Some("x"));
        assert!(model.depth() >= 2);
        assert!(
            model
                .root()
                .children()
                .iter()
                .any(|c| c.feature() == Some("x"))
        );
    }
}
