//! Parallel search for the best split at a tree node.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::split::{SplitContext, SplitResult, evaluate_categorical, evaluate_continuous};
use crate::value::feature_type;

/// Score one feature with the evaluator matching its declared type.
#[must_use]
pub fn evaluate_feature(feature: &str, ctx: &SplitContext<'_>) -> SplitResult {
    if feature_type(ctx.feature_types(), feature).is_continuous() {
        evaluate_continuous(feature, ctx)
    } else {
        evaluate_categorical(feature, ctx)
    }
}

/// Evaluate every candidate feature on the rayon pool and keep the best.
///
/// The target and excluded features are skipped. Returns `None` when no
/// feature reaches a positive gain ratio.
#[instrument(
    level = "debug",
    skip_all,
    fields(n_instances = ctx.instances().len(), n_features = ctx.features().len())
)]
pub fn find_best_split(ctx: &SplitContext<'_>) -> Option<SplitResult> {
    if ctx.instances().is_empty() || ctx.features().is_empty() {
        return None;
    }

    let results: Vec<SplitResult> = ctx
        .features()
        .par_iter()
        .filter(|feature| !ctx.is_excluded(feature))
        .map(|feature| evaluate_feature(feature, ctx))
        .collect();

    let best = reduce_best(results);
    debug!(
        feature = %best.feature,
        gain_ratio = best.gain_ratio,
        "split search complete"
    );
    (best.gain_ratio > 0.0).then_some(best)
}

/// Reduce per-feature results to the single best.
///
/// Starts from a gain ratio of -1 with an empty feature name. A strictly
/// greater gain ratio wins; equal gain ratios go to the lexicographically
/// smaller feature name so the outcome does not depend on worker scheduling.
pub(crate) fn reduce_best(results: impl IntoIterator<Item = SplitResult>) -> SplitResult {
    let mut best = SplitResult {
        feature: String::new(),
        gain_ratio: -1.0,
        continuous: false,
        threshold: None,
    };
    for result in results {
        let better = result.gain_ratio > best.gain_ratio
            || (result.gain_ratio == best.gain_ratio && result.feature < best.feature);
        if better {
            best = result;
        }
    }
    best
}
