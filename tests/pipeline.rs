//! End-to-end pipeline tests: split, fit, recommend, evaluate.

use reckit::als::{AlsConfig, AlsModel};
use reckit::data::{
    build_sparse_matrix, item_popularity, leave_one_out_split, Interaction, InteractionLog,
    WeightScheme,
};
use reckit::eval::{generate_recommendations, run_evaluation, warm_test_pairs};
use reckit::knn::{ItemKnnConfig, ItemKnnModel};

/// Two disjoint user/item clusters. Per-user timestamps rotate with the
/// user index so the LOO split holds out a different item per user and
/// every item stays warm in training.
fn clustered_log() -> InteractionLog {
    let mut log = InteractionLog::new();
    for u in 0..6i64 {
        for i in 0..4i64 {
            log.push(Interaction::new(u, i, 1.0 + i as f32, (i + u) % 4));
        }
    }
    for u in 6..12i64 {
        for i in 4..8i64 {
            log.push(Interaction::new(u, i, 1.0 + i as f32, (i - 4 + u) % 4));
        }
    }
    log
}

#[test]
fn loo_split_feeds_warm_evaluation() {
    let log = clustered_log();
    let (train, test) = leave_one_out_split(&log);
    assert_eq!(test.len(), 12); // one held-out row per user
    assert_eq!(train.len(), log.len() - 12);

    let (_matrix, mappings) = build_sparse_matrix(&train, WeightScheme::Binary).unwrap();
    let truth = warm_test_pairs(&test, &mappings);
    // every held-out item also appears in some other user's training rows
    assert_eq!(truth.len(), 12);
    for items in truth.values() {
        assert_eq!(items.len(), 1);
    }
}

#[test]
fn itemknn_pipeline_recovers_held_out_items() {
    let (train, test) = leave_one_out_split(&clustered_log());
    let (matrix, mappings) = build_sparse_matrix(&train, WeightScheme::Binary).unwrap();
    let popularity = item_popularity(&matrix, &mappings.items);

    let model = ItemKnnModel::fit(ItemKnnConfig::default(), matrix, mappings).unwrap();
    let truth = warm_test_pairs(&test, model.mappings());
    let report = run_evaluation(&model, &truth, &popularity, &[1, 5]);

    // each user's held-out item is the only unseen item in their cluster,
    // and cluster similarity dominates, so it must rank first
    assert!((report["Recall@1"] - 1.0).abs() < 1e-12);
    assert!((report["NDCG@1"] - 1.0).abs() < 1e-12);
    assert!(report["Coverage@5"] > 0.0 && report["Coverage@5"] <= 1.0);
    assert!(report["Novelty@5"] >= 0.0 && report["Novelty@5"] <= 1.0);
}

#[test]
fn als_pipeline_prefers_the_held_out_cluster() {
    let (train, test) = leave_one_out_split(&clustered_log());
    let (matrix, mappings) = build_sparse_matrix(&train, WeightScheme::Binary).unwrap();
    let popularity = item_popularity(&matrix, &mappings.items);

    let config = AlsConfig {
        factors: 8,
        iterations: 15,
        ..AlsConfig::default()
    };
    let model = AlsModel::fit(config, matrix, mappings).unwrap();
    let truth = warm_test_pairs(&test, model.mappings());
    let report = run_evaluation(&model, &truth, &popularity, &[1, 5]);

    // with strong planted structure ALS should place the held-out
    // same-cluster item into the top 5 for most users
    assert!(report["Recall@5"] > 0.5);
    assert!(report["NDCG@5"] > 0.5);
}

#[test]
fn toy_scenario_from_three_users() {
    // user 0: {0, 1}; user 1: {1, 2}; user 2: {2, 3}
    let log: InteractionLog = vec![
        Interaction::new(0, 0, 1.0, 1),
        Interaction::new(0, 1, 1.0, 2),
        Interaction::new(1, 1, 1.0, 3),
        Interaction::new(1, 2, 1.0, 4),
        Interaction::new(2, 2, 1.0, 5),
        Interaction::new(2, 3, 1.0, 6),
    ]
    .into();
    let (matrix, mappings) = build_sparse_matrix(&log, WeightScheme::Binary).unwrap();
    let config = ItemKnnConfig {
        k_neighbors: 3,
        ..ItemKnnConfig::default()
    };
    let model = ItemKnnModel::fit(config, matrix, mappings).unwrap();

    // items 1 and 2 co-occur through user 1
    let sims = model.similarity();
    let i1 = model.mappings().items.index(1).unwrap() as usize;
    let i2 = model.mappings().items.index(2).unwrap() as usize;
    assert!(sims.row_cols(i1).contains(&(i2 as i32)));
    assert!(sims.row_cols(i2).contains(&(i1 as i32)));

    let recs = model.recommend(0, 2, &[0, 1]);
    assert_eq!(recs, vec![2, 3]);
}

#[test]
fn both_models_round_trip_through_disk() {
    let (train, _) = leave_one_out_split(&clustered_log());
    let (matrix, mappings) = build_sparse_matrix(&train, WeightScheme::LogHours).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let knn = ItemKnnModel::fit(ItemKnnConfig::default(), matrix.clone(), mappings.clone()).unwrap();
    let knn_path = dir.path().join("knn.json");
    knn.save(&knn_path).unwrap();
    let knn2 = ItemKnnModel::load(&knn_path).unwrap();

    let als_config = AlsConfig {
        factors: 4,
        iterations: 5,
        ..AlsConfig::default()
    };
    let als = AlsModel::fit(als_config, matrix, mappings).unwrap();
    let als_path = dir.path().join("als.json");
    als.save(&als_path).unwrap();
    let als2 = AlsModel::load(&als_path).unwrap();

    for u in 0..12 {
        assert_eq!(knn.recommend(u, 5, &[]), knn2.recommend(u, 5, &[]));
        assert_eq!(als.recommend(u, 5, &[]), als2.recommend(u, 5, &[]));
    }
}

#[test]
fn cold_users_are_skipped_not_zeroed() {
    let (train, mut test) = leave_one_out_split(&clustered_log());
    // a user the models never saw
    test.push(Interaction::new(999, 0, 1.0, 1_000));

    let (matrix, mappings) = build_sparse_matrix(&train, WeightScheme::Binary).unwrap();
    let model = ItemKnnModel::fit(ItemKnnConfig::default(), matrix, mappings).unwrap();
    let truth = warm_test_pairs(&test, model.mappings());
    assert!(truth.contains_key(&999));

    let users: Vec<i64> = truth.keys().copied().collect();
    let recs = generate_recommendations(&model, &users, 5, &[]);
    assert!(!recs.contains_key(&999));
    assert_eq!(recs.len(), 12);
}
