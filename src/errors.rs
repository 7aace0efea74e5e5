//! Crate-wide error types.

use thiserror::Error;

/// Errors surfaced by matrix construction, model fitting, and persistence.
#[derive(Error, Debug)]
pub enum Error {
    /// A supplied matrix disagrees with the ID mappings it is paired with.
    #[error(
        "dimension mismatch: matrix is {n_rows}x{n_cols}, mappings have {n_users} users and {n_items} items"
    )]
    DimensionMismatch {
        n_rows: usize,
        n_cols: usize,
        n_users: usize,
        n_items: usize,
    },

    /// An interaction log with no rows cannot produce a matrix.
    #[error("interaction log is empty")]
    EmptyInteractionLog,

    /// A per-row normal-equation solve failed during ALS training.
    #[error("linear solve failed: {0}")]
    Solve(#[from] crate::als::SolveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
