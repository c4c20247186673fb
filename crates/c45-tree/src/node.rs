use std::collections::BTreeMap;

use crate::counter::ClassCounter;

/// Branch value of the synthetic child that serves unseen or missing categories.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Label returned when no class can be determined.
pub const UNKNOWN_CLASS: &str = "unknown";

/// A node in a decision tree.
///
/// Each decision node owns its children outright; traversal is always
/// root-to-leaf so no parent links are kept. `value` is the branch value a
/// categorical parent matched to reach this node, and is `None` for the root
/// and for the children of a continuous split.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(try_from = "crate::serialize::NodeRecord")]
pub enum Node {
    /// A terminal node.
    Leaf {
        /// Branch value leading here.
        value: Option<String>,
        /// Predicted class. `None` only for a leaf built from no instances.
        class: Option<String>,
        /// Label counts of the training subset this leaf was built from.
        distribution: BTreeMap<String, usize>,
    },
    /// An interior split node.
    Decision {
        /// Branch value leading here.
        value: Option<String>,
        /// Feature the node splits on.
        feature: String,
        /// Whether the split is a numeric threshold.
        continuous: bool,
        /// Threshold for continuous splits: values `<=` go to `children[0]`.
        threshold: f64,
        /// Two children `[<=, >]` for continuous splits, one per branch value otherwise.
        children: Vec<Node>,
    },
}

impl Node {
    /// Build a leaf labeled with the counter's majority class.
    #[must_use]
    pub fn leaf(counter: ClassCounter) -> Self {
        Node::Leaf {
            value: None,
            class: counter.majority_label().map(str::to_owned),
            distribution: counter.into_counts(),
        }
    }

    /// Build a leaf with no class and no distribution.
    #[must_use]
    pub fn empty_leaf() -> Self {
        Node::Leaf {
            value: None,
            class: None,
            distribution: BTreeMap::new(),
        }
    }

    /// Return the node with its branch value replaced.
    #[must_use]
    pub fn with_value(mut self, branch: impl Into<String>) -> Self {
        match &mut self {
            Node::Leaf { value, .. } | Node::Decision { value, .. } => {
                *value = Some(branch.into());
            }
        }
        self
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Branch value leading to this node.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Leaf { value, .. } | Node::Decision { value, .. } => value.as_deref(),
        }
    }

    /// Leaf class, `None` for decision nodes and unlabeled leaves.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        match self {
            Node::Leaf { class, .. } => class.as_deref(),
            Node::Decision { .. } => None,
        }
    }

    /// Splitting feature, `None` for leaves.
    #[must_use]
    pub fn feature(&self) -> Option<&str> {
        match self {
            Node::Decision { feature, .. } => Some(feature),
            Node::Leaf { .. } => None,
        }
    }

    /// Leaf label counts, `None` for decision nodes.
    #[must_use]
    pub fn distribution(&self) -> Option<&BTreeMap<String, usize>> {
        match self {
            Node::Leaf { distribution, .. } => Some(distribution),
            Node::Decision { .. } => None,
        }
    }

    /// Children of a decision node; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Decision { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    /// Total number of nodes in this subtree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        1 + self.children().iter().map(Node::n_nodes).sum::<usize>()
    }

    /// Number of leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Decision { children, .. } => children.iter().map(Node::n_leaves).sum(),
        }
    }

    /// Length of the longest root-to-leaf path; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }
}
