//! Evaluation driver: batch recommendation and metric aggregation.
//!
//! `recommend` only reads immutable post-fit state, so scoring the held-out
//! population is an embarrassingly parallel batch.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::data::{IdMappings, InteractionLog};
use crate::metrics::{evaluate_recommendations, MetricReport};

/// A fitted model that can rank items for a user.
pub trait Recommender: Sync {
    /// Top-k item IDs for a user; empty for cold or untrained users.
    fn recommend(&self, user_id: i64, k: usize, exclude_items: &[i64]) -> Vec<i64>;

    /// The ID mappings the model was fitted with.
    fn mappings(&self) -> &IdMappings;
}

/// Held-out ground truth keyed by user, restricted to warm items.
///
/// Items absent from the training mapping cannot be recommended by any
/// model, so their test rows are filtered out rather than counted as
/// misses.
pub fn warm_test_pairs(
    test: &InteractionLog,
    mappings: &IdMappings,
) -> FxHashMap<i64, Vec<i64>> {
    let mut truth: FxHashMap<i64, Vec<i64>> = FxHashMap::default();
    for row in test.iter() {
        if mappings.items.index(row.item).is_some() {
            truth.entry(row.user).or_default().push(row.item);
        }
    }
    truth
}

/// Score a batch of users in parallel.
///
/// Users whose list comes back empty (cold or sampled-out) are omitted
/// entirely, keeping them out of downstream metric denominators.
pub fn generate_recommendations<R: Recommender>(
    model: &R,
    users: &[i64],
    k: usize,
    exclude_items: &[i64],
) -> FxHashMap<i64, Vec<i64>> {
    users
        .par_iter()
        .map(|u| (*u, model.recommend(*u, k, exclude_items)))
        .filter(|(_, recs)| !recs.is_empty())
        .collect()
}

/// Fit-once, score-once evaluation over held-out ground truth.
pub fn run_evaluation<R: Recommender>(
    model: &R,
    test_data: &FxHashMap<i64, Vec<i64>>,
    item_popularity: &FxHashMap<i64, f64>,
    k_list: &[usize],
) -> MetricReport {
    let k_max = k_list.iter().copied().max().unwrap_or(10);
    let mut users: Vec<i64> = test_data.keys().copied().collect();
    users.sort_unstable();

    let recommendations = generate_recommendations(model, &users, k_max, &[]);
    let all_items: FxHashSet<i64> = model.mappings().items.ids().iter().copied().collect();

    evaluate_recommendations(
        &recommendations,
        test_data,
        item_popularity,
        &all_items,
        k_list,
    )
}
