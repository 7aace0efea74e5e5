//! Item-based collaborative filtering over a top-K cosine similarity graph.

mod accum;

pub use accum::{top_k_items, ScoreAccumulator};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::IdMappings;
use crate::errors::{Error, Result};
use crate::eval::Recommender;
use crate::sparse::CsrMatrix;

/// ItemKNN hyperparameters and resource bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemKnnConfig {
    /// Neighbors retained per item row.
    pub k_neighbors: usize,
    /// Items per similarity batch; bounds live triple buffers during fit.
    pub batch_size: usize,
    /// Similarities at or below this threshold are discarded.
    pub min_sim: f32,
}

impl Default for ItemKnnConfig {
    fn default() -> ItemKnnConfig {
        ItemKnnConfig {
            k_neighbors: 50,
            batch_size: 1000,
            min_sim: 0.0,
        }
    }
}

/// A fitted item-to-item similarity model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemKnnModel {
    config: ItemKnnConfig,
    /// Sparse item-by-item cosine matrix; at most `k_neighbors` per row,
    /// zero diagonal.
    similarity: CsrMatrix,
    mappings: IdMappings,
    train: CsrMatrix,
    n_users: usize,
    n_items: usize,
}

impl ItemKnnModel {
    /// Build the top-K item similarity graph from a user-by-item matrix.
    pub fn fit(
        config: ItemKnnConfig,
        matrix: CsrMatrix,
        mappings: IdMappings,
    ) -> Result<ItemKnnModel> {
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
            "fitting ItemKNN: {} users x {} items, {} entries, k={}",
            n_users,
            n_items,
            matrix.nnz(),
            config.k_neighbors
        );

        let item_users = matrix.transpose();
        let norms = item_users.row_norms();

        let batch = config.batch_size.max(1);
        let mut rows: Vec<Vec<(i32, f32)>> = Vec::with_capacity(n_items);
        for batch_start in (0..n_items).step_by(batch) {
            let batch_end = (batch_start + batch).min(n_items);
            let mut chunk: Vec<Vec<(i32, f32)>> = (batch_start..batch_end)
                .into_par_iter()
                .map(|item| sim_row(item, &matrix, &item_users, &norms, &config))
                .collect();
            rows.append(&mut chunk);
            debug!("computed similarities for {}/{} items", batch_end, n_items);
        }

        let similarity = rows_to_csr(rows, n_items);
        info!("similarity graph holds {} entries", similarity.nnz());

        Ok(ItemKnnModel {
            config,
            similarity,
            mappings,
            train: matrix,
            n_users,
            n_items,
        })
    }

    /// Top-k recommendations for a user, as external item IDs.
    ///
    /// Scores every candidate by summing the similarity rows of the user's
    /// interacted items; the sum is deliberately unnormalized, so items
    /// similar to many of the user's interactions rank higher. Unknown
    /// users and users with no training interactions get an empty list.
    pub fn recommend(&self, user_id: i64, k: usize, exclude_items: &[i64]) -> Vec<i64> {
        let Some(uidx) = self.mappings.users.index(user_id) else {
            return Vec::new();
        };
        let user_items = self.train.row_cols(uidx as usize);
        if user_items.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; self.n_items];
        for item in user_items {
            let row = *item as usize;
            for (c, v) in self
                .similarity
                .row_cols(row)
                .iter()
                .zip(self.similarity.row_vals(row))
            {
                scores[*c as usize] += v;
            }
        }

        for item in user_items {
            scores[*item as usize] = f32::NEG_INFINITY;
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

    /// Restore a model saved with [`ItemKnnModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ItemKnnModel> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn config(&self) -> &ItemKnnConfig {
        &self.config
    }

    /// The fitted item-by-item similarity matrix.
    pub fn similarity(&self) -> &CsrMatrix {
        &self.similarity
    }

    pub fn mappings(&self) -> &IdMappings {
        &self.mappings
    }
}

impl Recommender for ItemKnnModel {
    fn recommend(&self, user_id: i64, k: usize, exclude_items: &[i64]) -> Vec<i64> {
        ItemKnnModel::recommend(self, user_id, k, exclude_items)
    }

    fn mappings(&self) -> &IdMappings {
        &self.mappings
    }
}

/// One item's top-K cosine similarity row.
///
/// Walks the item's users, then each user's items, accumulating dot
/// products in a dense scratch vector; this visits exactly the co-occurring
/// pairs instead of materializing a dense similarity block.
fn sim_row(
    item: usize,
    ui_mat: &CsrMatrix,
    iu_mat: &CsrMatrix,
    norms: &[f32],
    config: &ItemKnnConfig,
) -> Vec<(i32, f32)> {
    let norm = norms[item];
    if norm == 0.0 {
        return Vec::new();
    }

    let mut dots = vec![0.0f32; ui_mat.n_cols];
    let mut used = Vec::new();

    for (u, w) in iu_mat.row_cols(item).iter().zip(iu_mat.row_vals(item)) {
        let u = *u as usize;
        for (other, ow) in ui_mat.row_cols(u).iter().zip(ui_mat.row_vals(u)) {
            let other = *other as usize;
            if other == item {
                continue;
            }
            // weights are strictly positive, so zero means untouched
            if dots[other] == 0.0 {
                used.push(other);
            }
            dots[other] += w * ow;
        }
    }

    let mut acc = ScoreAccumulator::new();
    for &other in &used {
        let sim = dots[other] / (norm * norms[other]);
        if sim > config.min_sim {
            acc.add_value(config.k_neighbors, other as i32, sim);
        }
    }

    // store in column order
    let mut sims = acc.into_sorted();
    sims.sort_by_key(|(i, _)| *i);
    sims
}

fn rows_to_csr(rows: Vec<Vec<(i32, f32)>>, n: usize) -> CsrMatrix {
    let nnz = rows.iter().map(Vec::len).sum();
    let mut row_ptrs = Vec::with_capacity(n + 1);
    let mut col_inds = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    row_ptrs.push(0);
    for row in rows {
        for (c, v) in row {
            col_inds.push(c);
            values.push(v);
        }
        row_ptrs.push(col_inds.len());
    }
    CsrMatrix::from_parts(n, n, row_ptrs, col_inds, values)
}
