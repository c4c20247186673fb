//! JSON model format and file persistence.
//!
//! Nodes are written as flat records in which every field that does not
//! apply is omitted: leaves carry `is_leaf`, `class` and `distribution`;
//! decision nodes carry `feature`, `children` and, for numeric splits,
//! `continuous` and `threshold`. A branch `value` appears on children of
//! categorical splits. Decoding validates the shape of each node.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::C45Error;
use crate::model::Model;
use crate::node::Node;

/// Branch value as found on disk. Files written by other tools may store
/// numeric branch values as JSON numbers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum BranchValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<BranchValue> for String {
    fn from(value: BranchValue) -> Self {
        match value {
            BranchValue::Text(s) => s,
            BranchValue::Number(v) => v.to_string(),
            BranchValue::Bool(b) => b.to_string(),
        }
    }
}

/// Wire representation of a [`Node`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<BranchValue>,
    is_leaf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeRecord>,
    #[serde(default, skip_serializing_if = "is_false")]
    continuous: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    threshold: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    distribution: BTreeMap<String, usize>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        match node {
            Node::Leaf {
                value,
                class,
                distribution,
            } => Self {
                feature: None,
                value: value.clone().map(BranchValue::Text),
                is_leaf: true,
                class: class.clone(),
                children: Vec::new(),
                continuous: false,
                threshold: 0.0,
                distribution: distribution.clone(),
            },
            Node::Decision {
                value,
                feature,
                continuous,
                threshold,
                children,
            } => Self {
                feature: Some(feature.clone()),
                value: value.clone().map(BranchValue::Text),
                is_leaf: false,
                class: None,
                children: children.iter().map(NodeRecord::from).collect(),
                continuous: *continuous,
                threshold: *threshold,
                distribution: BTreeMap::new(),
            },
        }
    }
}

/// Why a node record could not become a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeShapeError {
    MissingFeature,
    NoChildren { feature: String },
    ContinuousArity { feature: String, found: usize },
}

impl fmt::Display for NodeShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeShapeError::MissingFeature => f.write_str("decision node without a feature"),
            NodeShapeError::NoChildren { feature } => {
                write!(f, "decision node on \"{feature}\" has no children")
            }
            NodeShapeError::ContinuousArity { feature, found } => write!(
                f,
                "continuous node on \"{feature}\" has {found} children, expected 2"
            ),
        }
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = NodeShapeError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let value = record.value.map(String::from);
        if record.is_leaf {
            return Ok(Node::Leaf {
                value,
                class: record.class,
                distribution: record.distribution,
            });
        }

        let feature = record.feature.ok_or(NodeShapeError::MissingFeature)?;
        if record.children.is_empty() {
            return Err(NodeShapeError::NoChildren { feature });
        }
        if record.continuous && record.children.len() != 2 {
            return Err(NodeShapeError::ContinuousArity {
                feature,
                found: record.children.len(),
            });
        }
        let children = record
            .children
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Node::Decision {
            value,
            feature,
            continuous: record.continuous,
            threshold: record.threshold,
            children,
        })
    }
}

impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&NodeRecord::from(self), serializer)
    }
}

impl Model {
    /// Encode the model as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`C45Error::EncodeModel`] if serialization fails.
    pub fn to_json(&self) -> Result<String, C45Error> {
        serde_json::to_string_pretty(self).map_err(|source| C45Error::EncodeModel { source })
    }

    /// Decode a model from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`C45Error::DecodeModel`] for malformed JSON, unknown feature
    /// types, or decision nodes with an invalid shape.
    pub fn from_json(json: &str) -> Result<Self, C45Error> {
        serde_json::from_str(json).map_err(|source| C45Error::DecodeModel { source })
    }

    /// Save the model as a JSON file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`C45Error::EncodeModel`] | JSON encoding failed |
    /// | [`C45Error::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), C45Error> {
        let path = path.as_ref();
        let json = self.to_json()?;

        std::fs::write(path, json.as_bytes()).map_err(|e| C45Error::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = json.len(),
            n_nodes = self.n_nodes(),
            "model saved"
        );
        Ok(())
    }

    /// Load a model from a JSON file written by [`Model::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`C45Error::ReadModel`] | file read failed |
    /// | [`C45Error::DecodeModel`] | JSON decoding or validation failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, C45Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| C45Error::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let model = Self::from_json(&json)?;
        debug!(
            n_nodes = model.n_nodes(),
            n_features = model.feature_names().len(),
            target = model.target_name(),
            "model loaded"
        );
        Ok(model)
    }
}
