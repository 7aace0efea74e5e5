//! Sparse matrix support.

mod coo;
mod csr;

pub use coo::CooBuilder;
pub use csr::CsrMatrix;
