//! # reckit
//!
//! An offline evaluation harness for implicit-feedback recommenders: split
//! an interaction log with leave-one-out holdouts, build compact sparse
//! matrices, fit candidate models, and score them with top-K ranking
//! metrics.
//!
//! Two models are provided: implicit-feedback alternating least squares
//! ([`als::AlsModel`], after Hu/Koren/Volinsky 2008) and item-based
//! collaborative filtering over a top-K cosine graph ([`knn::ItemKnnModel`]).
//! Both expose the same lifecycle: `fit` constructs a model, `recommend`
//! ranks items per user, and `save`/`load` round-trip the fitted state.
//!
//! ## Example
//!
//! ```no_run
//! use reckit::data::{build_sparse_matrix, leave_one_out_split, item_popularity,
//!                    Interaction, InteractionLog, WeightScheme};
//! use reckit::eval::{run_evaluation, warm_test_pairs};
//! use reckit::knn::{ItemKnnConfig, ItemKnnModel};
//!
//! # fn main() -> reckit::Result<()> {
//! let log: InteractionLog = vec![
//!     Interaction::new(1, 10, 3.5, 100),
//!     Interaction::new(1, 11, 0.5, 200),
//!     Interaction::new(2, 10, 9.0, 150),
//!     Interaction::new(2, 12, 1.0, 300),
//! ]
//! .into();
//!
//! let (train, test) = leave_one_out_split(&log);
//! let (matrix, mappings) = build_sparse_matrix(&train, WeightScheme::Binary)?;
//! let popularity = item_popularity(&matrix, &mappings.items);
//!
//! let model = ItemKnnModel::fit(ItemKnnConfig::default(), matrix, mappings)?;
//! let truth = warm_test_pairs(&test, model.mappings());
//! let report = run_evaluation(&model, &truth, &popularity, &[5, 10, 20]);
//! for (metric, value) in &report {
//!     println!("{}: {:.4}", metric, value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod als;
pub mod data;
mod errors;
pub mod eval;
pub mod knn;
pub mod metrics;
pub mod sparse;

pub use errors::{Error, Result};
