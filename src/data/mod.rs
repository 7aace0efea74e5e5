//! Interaction data: logs, ID interning, and train/test preparation.

mod index;
mod interactions;
mod split;

pub use index::{IdIndex, IdMappings};
pub use interactions::{Interaction, InteractionLog};
pub use split::{build_sparse_matrix, item_popularity, leave_one_out_split, WeightScheme};
