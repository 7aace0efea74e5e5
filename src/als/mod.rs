//! Implicit-feedback matrix factorization via alternating least squares.
//!
//! Follows Hu, Koren, and Volinsky (2008), "Collaborative Filtering for
//! Implicit Feedback Datasets": interactions become confidence weights
//! `c = 1 + alpha * w` over a binary preference, and each half-iteration
//! solves one regularized f-by-f normal equation per row, in parallel.

mod solve;

pub use solve::SolveError;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::*;
use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut1, Axis};
use rand::prelude::*;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::data::IdMappings;
use crate::errors::{Error, Result};
use crate::eval::Recommender;
use crate::knn::top_k_items;
use crate::sparse::CsrMatrix;

/// ALS hyperparameters and resource bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlsConfig {
    /// Latent factor dimension.
    pub factors: usize,
    /// L2 regularization strength.
    pub regularization: f32,
    /// Number of alternating iterations.
    pub iterations: usize,
    /// Confidence scaling: `c = 1 + alpha * w`.
    pub alpha: f32,
    /// Subsample users above this population size to bound fit cost.
    pub max_users: usize,
    /// Optional cap on user rows updated per iteration.
    ///
    /// The reference implementation silently froze updates past a hard
    /// 10 000-row limit; here the cap is off unless explicitly requested.
    pub users_per_iter: Option<usize>,
    /// RNG seed for factor initialization and user subsampling.
    pub seed: u64,
    /// Log the observed-entry reconstruction loss every N iterations.
    pub loss_interval: Option<usize>,
}

impl Default for AlsConfig {
    fn default() -> AlsConfig {
        AlsConfig {
            factors: 32,
            regularization: 0.1,
            iterations: 10,
            alpha: 40.0,
            max_users: 100_000,
            users_per_iter: None,
            seed: 42,
            loss_interval: Some(5),
        }
    }
}

/// A fitted implicit-ALS model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlsModel {
    config: AlsConfig,
    user_factors: Array2<f32>,
    item_factors: Array2<f32>,
    mappings: IdMappings,
    train: CsrMatrix,
    /// Original user index to factor row, present only when subsampled.
    sampled_rows: Option<FxHashMap<i32, usize>>,
    n_users: usize,
    n_items: usize,
}

impl AlsModel {
    /// Fit factor matrices on a user-by-item interaction matrix.
    pub fn fit(config: AlsConfig, matrix: CsrMatrix, mappings: IdMappings) -> Result<AlsModel> {
        let (n_users, n_items) = (matrix.n_rows, matrix.n_cols);
        if n_users != mappings.users.len() || n_items != mappings.items.len() {
            return Err(Error::DimensionMismatch {
                n_rows: n_users,
                n_cols: n_items,
                n_users: mappings.users.len(),
                n_items: mappings.items.len(),
            });
        }

        info!(
            "fitting ALS: {} users x {} items, {} entries, {} factors, {} iterations",
            n_users,
            n_items,
            matrix.nnz(),
            config.factors,
            config.iterations
        );

        let mut rng = StdRng::seed_from_u64(config.seed);

        // bound fit cost on very large populations by training a user sample
        let (train_mat, sampled_rows) = if n_users > config.max_users {
            info!(
                "user population {} exceeds {}, subsampling",
                n_users, config.max_users
            );
            let mut sample = rand::seq::index::sample(&mut rng, n_users, config.max_users).into_vec();
            sample.sort_unstable();
            let sub = select_rows(&matrix, &sample);
            let map = sample
                .iter()
                .enumerate()
                .map(|(pos, u)| (*u as i32, pos))
                .collect();
            (sub, Some(map))
        } else {
            (matrix.clone(), None)
        };
        let item_mat = train_mat.transpose();

        let f = config.factors;
        let mut user_factors = gaussian_init(&mut rng, train_mat.n_rows, f);
        let mut item_factors = gaussian_init(&mut rng, n_items, f);

        for iteration in 0..config.iterations {
            let user_delta = train_half(
                &train_mat,
                &mut user_factors,
                &item_factors,
                config.alpha,
                config.regularization,
                config.users_per_iter,
            )?;
            let item_delta = train_half(
                &item_mat,
                &mut item_factors,
                &user_factors,
                config.alpha,
                config.regularization,
                None,
            )?;
            debug!(
                "iteration {}/{}: user delta {:.4}, item delta {:.4}",
                iteration + 1,
                config.iterations,
                user_delta,
                item_delta
            );

            if let Some(every) = config.loss_interval {
                if every > 0 && (iteration + 1) % every == 0 {
                    let loss = observed_loss(&train_mat, &user_factors, &item_factors, config.alpha);
                    info!("iteration {}: weighted loss {:.4}", iteration + 1, loss);
                }
            }
        }

        Ok(AlsModel {
            config,
            user_factors,
            item_factors,
            mappings,
            train: matrix,
            sampled_rows,
            n_users,
            n_items,
        })
    }

    /// Top-k recommendations for a user, as external item IDs.
    ///
    /// Returns an empty list for users unknown to the mapping or left out
    /// of the training sample; already-interacted and excluded items are
    /// never recommended.
    pub fn recommend(&self, user_id: i64, k: usize, exclude_items: &[i64]) -> Vec<i64> {
        let Some(uidx) = self.mappings.users.index(user_id) else {
            return Vec::new();
        };
        let row = match &self.sampled_rows {
            Some(map) => match map.get(&uidx) {
                Some(r) => *r,
                None => return Vec::new(),
            },
            None => uidx as usize,
        };
        if row >= self.user_factors.nrows() {
            return Vec::new();
        }

        let mut scores = self.item_factors.dot(&self.user_factors.row(row)).to_vec();
        for c in self.train.row_cols(uidx as usize) {
            scores[*c as usize] = f32::NEG_INFINITY;
        }
        for id in exclude_items {
            if let Some(i) = self.mappings.items.index(*id) {
                scores[i as usize] = f32::NEG_INFINITY;
            }
        }

        top_k_items(&scores, k)
            .into_iter()
            .filter_map(|(i, _)| self.mappings.items.id(i))
            .collect()
    }

    /// Persist the model as a single serialized bundle.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Restore a model saved with [`AlsModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AlsModel> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    pub fn user_factors(&self) -> &Array2<f32> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f32> {
        &self.item_factors
    }

    pub fn mappings(&self) -> &IdMappings {
        &self.mappings
    }
}

impl Recommender for AlsModel {
    fn recommend(&self, user_id: i64, k: usize, exclude_items: &[i64]) -> Vec<i64> {
        AlsModel::recommend(self, user_id, k, exclude_items)
    }

    fn mappings(&self) -> &IdMappings {
        &self.mappings
    }
}

fn gaussian_init<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_simple_fn((rows, cols), || {
        let z: f32 = rng.sample(StandardNormal);
        z * 0.01
    })
}

/// Extract a row subset of a CSR matrix; `rows` must be sorted.
fn select_rows(matrix: &CsrMatrix, rows: &[usize]) -> CsrMatrix {
    let mut row_ptrs = Vec::with_capacity(rows.len() + 1);
    let mut col_inds = Vec::new();
    let mut values = Vec::new();
    row_ptrs.push(0);
    for &r in rows {
        col_inds.extend_from_slice(matrix.row_cols(r));
        values.extend_from_slice(matrix.row_vals(r));
        row_ptrs.push(col_inds.len());
    }
    CsrMatrix::from_parts(rows.len(), matrix.n_cols, row_ptrs, col_inds, values)
}

/// Run one half-iteration: re-solve `this` with `other` held fixed.
///
/// Returns the root-sum-square factor change across updated rows.
fn train_half(
    matrix: &CsrMatrix,
    this: &mut Array2<f32>,
    other: &Array2<f32>,
    alpha: f32,
    regularization: f32,
    row_cap: Option<usize>,
) -> Result<f32> {
    let f = this.ncols();
    let mut otor = other.t().dot(other);
    for d in 0..f {
        otor[[d, d]] += regularization;
    }

    let n_update = row_cap.unwrap_or(this.nrows()).min(this.nrows());
    let other = other.view();
    let otor = otor.view();
    let frob: f32 = this
        .slice_mut(ndarray::s![..n_update, ..])
        .outer_iter_mut()
        .into_par_iter()
        .enumerate()
        .map(|(i, row)| train_row_solve(matrix, i, row, &other, &otor, alpha))
        .try_reduce(|| 0.0, |a, b| Ok(a + b))?;

    Ok(frob.sqrt())
}

fn train_row_solve(
    matrix: &CsrMatrix,
    row_num: usize,
    mut row_data: ArrayViewMut1<f32>,
    other: &ArrayView2<f32>,
    otor: &ArrayView2<f32>,
    alpha: f32,
) -> std::result::Result<f32, SolveError> {
    let cols = matrix.row_cols(row_num);
    let vals = matrix.row_vals(row_num);

    if cols.is_empty() {
        row_data.fill(0.0);
        return Ok(0.0);
    }

    let cols: Vec<usize> = cols.iter().map(|c| *c as usize).collect();
    // confidence above baseline: C - I entries
    let mut conf: Array1<f32> = vals.iter().map(|w| alpha * w).collect();

    let o_picked = other.select(Axis(0), &cols);
    let mt = o_picked.t();
    let mtl = &mt * &conf;
    let mtm = mtl.dot(&o_picked);

    let a = otor + &mtm;
    conf += 1.0;
    let y = mt.dot(&conf);

    let soln = solve::solve_spd(&a, &y)?;

    let mut delta = 0.0f32;
    for (out, v) in row_data.iter_mut().zip(soln.iter()) {
        let d = *v - *out;
        delta += d * d;
        *out = *v;
    }
    Ok(delta)
}

/// Confidence-weighted squared error over observed entries. Diagnostic only.
fn observed_loss(
    matrix: &CsrMatrix,
    user_factors: &Array2<f32>,
    item_factors: &Array2<f32>,
    alpha: f32,
) -> f64 {
    (0..matrix.n_rows)
        .into_par_iter()
        .map(|u| {
            let x = user_factors.row(u);
            matrix
                .row_cols(u)
                .iter()
                .zip(matrix.row_vals(u))
                .map(|(i, w)| {
                    let pred = x.dot(&item_factors.row(*i as usize));
                    let c = 1.0 + alpha * w;
                    (c * (1.0 - pred) * (1.0 - pred)) as f64
                })
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{build_sparse_matrix, Interaction, InteractionLog, WeightScheme};

    fn cluster_log() -> InteractionLog {
        // two disjoint user/item clusters
        let mut log = InteractionLog::new();
        for u in 0..4i64 {
            for i in 0..3i64 {
                log.push(Interaction::new(u, i, 1.0, u * 10 + i));
            }
        }
        for u in 4..8i64 {
            for i in 3..6i64 {
                log.push(Interaction::new(u, i, 1.0, u * 10 + i));
            }
        }
        log
    }

    fn small_config() -> AlsConfig {
        AlsConfig {
            factors: 8,
            iterations: 15,
            ..AlsConfig::default()
        }
    }

    #[test]
    fn dimension_mismatch_fails_fast() {
        let (matrix, mut mappings) = build_sparse_matrix(&cluster_log(), WeightScheme::Binary).unwrap();
        mappings.items.intern(999);
        let err = AlsModel::fit(AlsConfig::default(), matrix, mappings);
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn planted_cluster_item_ranks_first() {
        // drop (0, 2) from training so item 2 is recommendable to user 0
        let log: InteractionLog = cluster_log()
            .iter()
            .filter(|r| !(r.user == 0 && r.item == 2))
            .copied()
            .collect();
        let (matrix, mappings) = build_sparse_matrix(&log, WeightScheme::Binary).unwrap();
        let model = AlsModel::fit(small_config(), matrix, mappings).unwrap();

        let recs = model.recommend(0, 1, &[]);
        assert_eq!(recs, vec![2]);
    }

    #[test]
    fn cold_user_is_empty_not_error() {
        let (matrix, mappings) = build_sparse_matrix(&cluster_log(), WeightScheme::Binary).unwrap();
        let model = AlsModel::fit(small_config(), matrix, mappings).unwrap();
        assert!(model.recommend(12345, 5, &[]).is_empty());
    }

    #[test]
    fn excluded_items_never_appear() {
        let log: InteractionLog = cluster_log()
            .iter()
            .filter(|r| !(r.user == 0 && r.item == 2))
            .copied()
            .collect();
        let (matrix, mappings) = build_sparse_matrix(&log, WeightScheme::Binary).unwrap();
        let model = AlsModel::fit(small_config(), matrix, mappings).unwrap();
        let recs = model.recommend(0, 6, &[2]);
        assert!(!recs.contains(&2));
        // interacted items are excluded implicitly
        assert!(!recs.contains(&0));
        assert!(!recs.contains(&1));
    }

    #[test]
    fn fit_is_reproducible() {
        let (matrix, mappings) = build_sparse_matrix(&cluster_log(), WeightScheme::Binary).unwrap();
        let a = AlsModel::fit(small_config(), matrix.clone(), mappings.clone()).unwrap();
        let b = AlsModel::fit(small_config(), matrix, mappings).unwrap();
        assert_eq!(a.user_factors(), b.user_factors());
        assert_eq!(a.item_factors(), b.item_factors());
    }

    #[test]
    fn subsampling_bounds_trained_rows() {
        let (matrix, mappings) = build_sparse_matrix(&cluster_log(), WeightScheme::Binary).unwrap();
        let config = AlsConfig {
            max_users: 4,
            ..small_config()
        };
        let model = AlsModel::fit(config, matrix, mappings).unwrap();
        assert_eq!(model.user_factors().nrows(), 4);
        // sampled-out users yield empty lists, sampled ones do not
        let served: usize = (0..8)
            .filter(|u| !model.recommend(*u, 2, &[]).is_empty())
            .count();
        assert_eq!(served, 4);
    }

    #[test]
    fn save_load_round_trip() {
        let (matrix, mappings) = build_sparse_matrix(&cluster_log(), WeightScheme::Binary).unwrap();
        let model = AlsModel::fit(small_config(), matrix, mappings).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("als.json");
        model.save(&path).unwrap();
        let loaded = AlsModel::load(&path).unwrap();

        for u in 0..8 {
            assert_eq!(model.recommend(u, 5, &[]), loaded.recommend(u, 5, &[]));
        }
    }
}
