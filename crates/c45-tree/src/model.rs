use crate::node::Node;
use crate::value::FeatureTypes;

/// A trained C4.5 decision tree and the schema it was trained on.
///
/// This is the unit of persistence; see [`Model::save`] and [`Model::load`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Model {
    root: Node,
    feature_types: FeatureTypes,
    feature_names: Vec<String>,
    target_name: String,
}

impl Model {
    /// Assemble a model from a built tree and its training schema.
    #[must_use]
    pub fn new(
        root: Node,
        feature_types: FeatureTypes,
        feature_names: Vec<String>,
        target_name: String,
    ) -> Self {
        Self {
            root,
            feature_types,
            feature_names,
            target_name,
        }
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Return the feature types used at training time.
    #[must_use]
    pub fn feature_types(&self) -> &FeatureTypes {
        &self.feature_types
    }

    /// Return the training column names in input order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the target feature name.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Return the depth of the tree; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}
