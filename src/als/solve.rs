use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    #[error("system matrix is singular")]
    Singular,
}

/// Solve the symmetric positive-definite system `A x = b`.
///
/// `A` is an f-by-f regularized normal-equation matrix; with a positive
/// regularizer it is SPD and Cholesky succeeds. An LU pass backstops
/// numerically borderline systems.
pub fn solve_spd(a: &Array2<f32>, b: &Array1<f32>) -> Result<Array1<f32>, SolveError> {
    let n = b.len();
    debug_assert_eq!(a.shape(), &[n, n]);

    let m = DMatrix::from_fn(n, n, |r, c| a[[r, c]]);
    let v = DVector::from_fn(n, |r, _| b[r]);

    let soln = match Cholesky::new(m.clone()) {
        Some(chol) => chol.solve(&v),
        None => m.lu().solve(&v).ok_or(SolveError::Singular)?,
    };

    Ok(Array1::from_iter(soln.iter().copied()))
}
