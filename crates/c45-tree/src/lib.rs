//! C4.5 decision-tree induction and prediction.
//!
//! Trains a single classification tree over rows of mixed numeric,
//! categorical, date and timestamp values using the gain-ratio criterion.
//! Per-feature statistics are precomputed once per run, candidate features
//! are scored in parallel via rayon, and prediction degrades gracefully on
//! missing values and unseen categories. Models persist as JSON.

mod cache;
mod counter;
mod error;
mod model;
mod node;
mod predict;
mod select;
mod serialize;
mod split;
mod tree;
mod value;

pub use cache::{FeatureCache, FeatureSummary, MAX_THRESHOLD_CANDIDATES};
pub use counter::ClassCounter;
pub use error::C45Error;
pub use model::Model;
pub use node::{Node, UNKNOWN_BRANCH, UNKNOWN_CLASS};
pub use predict::{Prediction, batch_predict};
pub use select::{evaluate_feature, find_best_split};
pub use split::{
    SPLIT_INFO_EPSILON, SplitContext, SplitResult, ThresholdScore, evaluate_categorical,
    evaluate_continuous, evaluate_threshold, gain_ratio, partition_gain,
};
pub use tree::{C45Config, train};
pub use value::{FeatureType, FeatureTypes, Instance, Value, feature_type};
