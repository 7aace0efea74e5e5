use log::*;
use rustc_hash::FxHashMap;

use super::{IdMappings, Interaction, InteractionLog};
use crate::errors::{Error, Result};
use crate::sparse::{CooBuilder, CsrMatrix};

/// How interaction rows become matrix weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WeightScheme {
    /// Every observed interaction weighs 1.
    Binary,
    /// `1 + ln(1 + hours)`, damping heavy-tailed playtime.
    LogHours,
}

impl WeightScheme {
    fn weight(&self, interaction: &Interaction) -> f32 {
        match self {
            WeightScheme::Binary => 1.0,
            WeightScheme::LogHours => 1.0 + interaction.hours.max(0.0).ln_1p(),
        }
    }
}

/// Split a log into train and leave-one-out test partitions.
///
/// For every user the chronologically latest interaction is held out (later
/// input position wins timestamp ties); the rest train. Users with fewer
/// than 2 interactions are dropped from both sides.
pub fn leave_one_out_split(log: &InteractionLog) -> (InteractionLog, InteractionLog) {
    let mut per_user: FxHashMap<i64, Vec<usize>> = FxHashMap::default();
    for (i, row) in log.iter().enumerate() {
        per_user.entry(row.user).or_default().push(i);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut dropped = 0usize;
    for rows in per_user.values() {
        if rows.len() < 2 {
            dropped += 1;
            continue;
        }
        let held = *rows
            .iter()
            .max_by_key(|i| (log.data()[**i].timestamp, **i))
            .unwrap();
        for &i in rows {
            if i == held {
                test.push(log.data()[i]);
            } else {
                train.push(log.data()[i]);
            }
        }
    }
    debug!(
        "LOO split: {} train rows, {} test rows, {} single-interaction users dropped",
        train.len(),
        test.len(),
        dropped
    );

    (train.into(), test.into())
}

/// Build the user-by-item CSR matrix and ID mappings from a training log.
///
/// Indices are dense and zero-based, assigned in first-appearance order;
/// duplicate (user, item) pairs sum their weights.
pub fn build_sparse_matrix(
    log: &InteractionLog,
    scheme: WeightScheme,
) -> Result<(CsrMatrix, IdMappings)> {
    if log.is_empty() {
        return Err(Error::EmptyInteractionLog);
    }

    let mut mappings = IdMappings::default();
    let mut coo = CooBuilder::with_capacity(log.len());
    for row in log.iter() {
        let u = mappings.users.intern(row.user);
        let i = mappings.items.intern(row.item);
        coo.add_entry(u, i, scheme.weight(row));
    }

    let matrix = coo.build(mappings.users.len(), mappings.items.len());
    info!(
        "built {}x{} interaction matrix with {} entries",
        matrix.n_rows,
        matrix.n_cols,
        matrix.nnz()
    );
    Ok((matrix, mappings))
}

/// Per-item interaction counts keyed by external item ID.
pub fn item_popularity(
    matrix: &CsrMatrix,
    items: &super::IdIndex,
) -> FxHashMap<i64, f64> {
    let mut counts = vec![0usize; matrix.n_cols];
    for row in 0..matrix.n_rows {
        for c in matrix.row_cols(row) {
            counts[*c as usize] += 1;
        }
    }
    counts
        .into_iter()
        .enumerate()
        .filter(|(_, n)| *n > 0)
        .filter_map(|(i, n)| items.id(i as i32).map(|id| (id, n as f64)))
        .collect()
}
