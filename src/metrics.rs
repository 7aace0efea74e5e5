//! Top-K ranking metrics.
//!
//! Pure functions over ranked recommendation lists and held-out ground
//! truth: Recall@K, NDCG@K (binary relevance), catalog Coverage@K, and
//! popularity-based Novelty@K, plus aggregate and per-partition evaluation.
//!
//! Degenerate inputs (empty ground truth, empty popularity table) produce
//! neutral values rather than errors; they are expected at evaluation
//! boundaries.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

/// Metric name (e.g. `"Recall@10"`) to scalar value.
pub type MetricReport = BTreeMap<String, f64>;

/// One held-out observation tagged with a partition label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedObservation {
    pub user: i64,
    pub item: i64,
    pub group: String,
}

/// Per-partition evaluation results.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionReport {
    pub n_users: usize,
    pub metrics: MetricReport,
}

/// Fraction of the ground-truth items found in the top `k` recommendations.
///
/// The denominator is the full ground-truth set, so recall can stay below
/// 1.0 even for a perfect top-k list when more than `k` items are relevant.
/// Empty ground truth scores 0.0 by convention.
pub fn recall_at_k(recommended: &[i64], actual: &[i64], k: usize) -> f64 {
    let actual_set: FxHashSet<i64> = actual.iter().copied().collect();
    if actual_set.is_empty() {
        return 0.0;
    }

    let hits = recommended
        .iter()
        .take(k)
        .filter(|item| actual_set.contains(item))
        .count();
    hits as f64 / actual_set.len() as f64
}

/// Normalized discounted cumulative gain with binary relevance.
///
/// Rank `i` (0-indexed) contributes `1/log2(i+2)`, so the first slot has
/// gain 1. The ideal DCG places all of `min(|actual|, k)` relevant items
/// first; an empty ground-truth set scores 0.0.
pub fn ndcg_at_k(recommended: &[i64], actual: &[i64], k: usize) -> f64 {
    let actual_set: FxHashSet<i64> = actual.iter().copied().collect();
    if actual_set.is_empty() {
        return 0.0;
    }

    let dcg: f64 = recommended
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, item)| actual_set.contains(item))
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum();

    let ideal_slots = actual_set.len().min(k);
    let idcg: f64 = (0..ideal_slots).map(|i| 1.0 / ((i + 2) as f64).log2()).sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Fraction of the catalog surfaced in any top-k list.
pub fn coverage_at_k(
    all_recommendations: &[Vec<i64>],
    all_items: &FxHashSet<i64>,
    k: usize,
) -> f64 {
    if all_items.is_empty() {
        return 0.0;
    }

    let mut recommended: FxHashSet<i64> = FxHashSet::default();
    for rec in all_recommendations {
        recommended.extend(rec.iter().take(k).copied());
    }
    recommended.len() as f64 / all_items.len() as f64
}

/// Mean unpopularity of recommended items, across every top-k slot.
///
/// Each recommended instance contributes `1 - pop/max_pop` (instances are
/// not deduplicated across lists). Items missing from the popularity table
/// count as popularity 0, i.e. maximally novel.
pub fn novelty_at_k(
    all_recommendations: &[Vec<i64>],
    item_popularity: &FxHashMap<i64, f64>,
    k: usize,
) -> f64 {
    let max_pop = item_popularity
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let max_pop = if max_pop.is_finite() && max_pop > 0.0 {
        max_pop
    } else {
        1.0
    };

    let mut total = 0.0;
    let mut count = 0usize;
    for rec in all_recommendations {
        for item in rec.iter().take(k) {
            let pop = item_popularity.get(item).copied().unwrap_or(0.0);
            total += 1.0 - pop / max_pop;
            count += 1;
        }
    }

    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

/// Evaluate a set of recommendation lists against held-out ground truth.
///
/// For each `k`, reports mean Recall@k and NDCG@k over users present in
/// both maps (others are skipped silently), plus Coverage@k and Novelty@k
/// over the evaluated lists. Users are visited in sorted order so the
/// report is deterministic.
pub fn evaluate_recommendations(
    recommendations: &FxHashMap<i64, Vec<i64>>,
    test_data: &FxHashMap<i64, Vec<i64>>,
    item_popularity: &FxHashMap<i64, f64>,
    all_items: &FxHashSet<i64>,
    k_list: &[usize],
) -> MetricReport {
    let mut users: Vec<i64> = recommendations
        .keys()
        .filter(|u| test_data.contains_key(*u))
        .copied()
        .collect();
    users.sort_unstable();

    let mut results = MetricReport::new();
    for &k in k_list {
        let mut recalls = Vec::with_capacity(users.len());
        let mut ndcgs = Vec::with_capacity(users.len());
        let mut all_recs = Vec::with_capacity(users.len());

        for user in &users {
            let rec = &recommendations[user];
            let actual = &test_data[user];
            recalls.push(recall_at_k(rec, actual, k));
            ndcgs.push(ndcg_at_k(rec, actual, k));
            all_recs.push(rec.clone());
        }

        results.insert(format!("Recall@{}", k), mean(&recalls));
        results.insert(format!("NDCG@{}", k), mean(&ndcgs));
        results.insert(
            format!("Coverage@{}", k),
            coverage_at_k(&all_recs, all_items, k),
        );
        results.insert(
            format!("Novelty@{}", k),
            novelty_at_k(&all_recs, item_popularity, k),
        );
    }

    results
}

/// Re-run evaluation per partition label attached to the test rows.
///
/// Partitions with zero evaluable users are skipped.
pub fn evaluate_by_partition(
    recommendations: &FxHashMap<i64, Vec<i64>>,
    test_rows: &[GroupedObservation],
    item_popularity: &FxHashMap<i64, f64>,
    all_items: &FxHashSet<i64>,
    k_list: &[usize],
) -> BTreeMap<String, PartitionReport> {
    let mut groups: BTreeMap<&str, FxHashMap<i64, Vec<i64>>> = BTreeMap::new();
    for row in test_rows {
        groups
            .entry(&row.group)
            .or_default()
            .entry(row.user)
            .or_default()
            .push(row.item);
    }

    let mut reports = BTreeMap::new();
    for (group, test_data) in groups {
        let group_recs: FxHashMap<i64, Vec<i64>> = recommendations
            .iter()
            .filter(|(u, _)| test_data.contains_key(*u))
            .map(|(u, r)| (*u, r.clone()))
            .collect();
        if group_recs.is_empty() {
            continue;
        }

        let n_users = group_recs.len();
        let metrics =
            evaluate_recommendations(&group_recs, &test_data, item_popularity, all_items, k_list);
        reports.insert(group.to_string(), PartitionReport { n_users, metrics });
    }

    reports
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
