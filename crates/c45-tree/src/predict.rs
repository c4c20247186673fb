//! Tree traversal and batch prediction.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::instrument;

use crate::model::Model;
use crate::node::{Node, UNKNOWN_BRANCH, UNKNOWN_CLASS};
use crate::value::Instance;

/// Predicted label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class label, or `"unknown"`.
    pub label: String,
    /// Share of the supporting distribution that carries `label`.
    pub confidence: f64,
}

impl Prediction {
    fn unknown() -> Self {
        Self {
            label: UNKNOWN_CLASS.to_owned(),
            confidence: 0.0,
        }
    }

    /// Score a leaf: `max_count / total` over its distribution.
    ///
    /// A leaf with no class or with a zero-total distribution is
    /// `"unknown"` at 0.
    fn from_leaf(node: &Node) -> Self {
        let (Some(class), Some(dist)) = (node.class(), node.distribution()) else {
            return Self::unknown();
        };
        if dist.values().sum::<usize>() == 0 {
            return Self::unknown();
        }
        Self {
            label: class.to_owned(),
            confidence: share(dist, |counts| counts.values().copied().max()),
        }
    }

    /// Majority class among the leaf children of `node`, one vote per leaf.
    ///
    /// Confidence is the label's share of the summed leaf distributions.
    /// Decision children are not descended into.
    fn from_leaf_children(node: &Node) -> Self {
        let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
        let mut merged: BTreeMap<&str, usize> = BTreeMap::new();
        for child in node.children().iter().filter(|c| c.is_leaf()) {
            let Some(class) = child.class() else {
                continue;
            };
            *votes.entry(class).or_insert(0) += 1;
            for (label, &count) in child.distribution().into_iter().flatten() {
                *merged.entry(label.as_str()).or_insert(0) += count;
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (&label, &n) in &votes {
            if best.is_none_or(|(_, b)| n > b) {
                best = Some((label, n));
            }
        }
        let Some((label, _)) = best else {
            return Self::unknown();
        };
        let confidence = share(&merged, |counts| counts.get(label).copied());
        Self {
            label: label.to_owned(),
            confidence,
        }
    }
}

fn share<K: Ord>(
    counts: &BTreeMap<K, usize>,
    pick: impl FnOnce(&BTreeMap<K, usize>) -> Option<usize>,
) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    pick(counts).unwrap_or(0) as f64 / total as f64
}

/// Where traversal of one row ended.
enum Outcome<'a> {
    /// Reached a leaf.
    Leaf(&'a Node),
    /// Could not route past this decision node.
    Fallback(&'a Node),
}

fn route<'a>(root: &'a Node, instance: &Instance) -> Outcome<'a> {
    let mut node = root;
    loop {
        let Node::Decision {
            feature,
            continuous,
            threshold,
            children,
            ..
        } = node
        else {
            return Outcome::Leaf(node);
        };

        let next = if *continuous {
            match (instance.numeric(feature), children.as_slice()) {
                (Some(v), [left, right]) => Some(if v <= *threshold { left } else { right }),
                _ => None,
            }
        } else {
            instance.category(feature).and_then(|value| {
                children
                    .iter()
                    .find(|c| c.value() == Some(value.as_str()))
                    .or_else(|| children.last().filter(|c| c.value() == Some(UNKNOWN_BRANCH)))
            })
        };

        match next {
            Some(child) => node = child,
            None => return Outcome::Fallback(node),
        }
    }
}

impl Model {
    /// Predict the class of one row with its confidence.
    ///
    /// Never fails: missing or uncoercible values and unseen categories
    /// degrade to the `unknown` branch or the majority of a node's leaf
    /// children, and to `"unknown"` when neither exists.
    #[must_use]
    pub fn predict(&self, instance: &Instance) -> Prediction {
        match route(self.root(), instance) {
            Outcome::Leaf(leaf) => Prediction::from_leaf(leaf),
            Outcome::Fallback(node) => Prediction::from_leaf_children(node),
        }
    }

    /// Predict only the class label of one row.
    #[must_use]
    pub fn predict_class(&self, instance: &Instance) -> String {
        self.predict(instance).label
    }

    /// Predict every row in parallel; output order matches input order.
    #[instrument(skip_all, fields(n_instances = instances.len()))]
    pub fn batch_predict(&self, instances: &[Instance]) -> Vec<Prediction> {
        instances
            .par_iter()
            .map(|instance| self.predict(instance))
            .collect()
    }
}

/// Predict every row of `instances` with `model`, preserving order.
#[must_use]
pub fn batch_predict(model: &Model, instances: &[Instance]) -> Vec<Prediction> {
    model.batch_predict(instances)
}
