pub mod cholesky;
pub mod eigen;
pub mod hessenberg;
pub mod lu;
pub mod qr;
pub mod schur;
pub mod svd;
pub mod symmetric_eigen;

pub use cholesky::{cholesky_factor, cholesky_solve, cholesky_solve_factored};
pub use eigen::{eigen_decomp, NonsymmetricEigen};
pub use lu::{
    lu_determinant, lu_factor, lu_inverse, lu_inverse_factored, lu_solve, lu_solve_factored,
};
pub use qr::{qr_factor, qr_solve, qr_solve_factored, thin_qr_factor, QrMethod};
pub use svd::{singular_value_decomposition, svd_solve, svd_solve_factored};

use thiserror::Error;

/// Errors from the linear algebra kernels.
///
/// Precondition violations (`DimensionMismatch`, `InnerDimensionMismatch`,
/// `RowsLessThanColumns`, `InvalidConfiguration`) are raised before any buffer
/// is touched. The numerical variants abort mid-computation and leave the
/// output buffers in an unspecified state.
///
/// ```
/// use managed_linalg::linalg::{cholesky_factor, LinalgError};
/// use managed_linalg::ParallelConfig;
///
/// let mut not_pd = [1.0_f64, 5.0, 5.0, 1.0];
/// let err = cholesky_factor(&mut not_pd, 2, &ParallelConfig::sequential()).unwrap_err();
/// assert_eq!(err, LinalgError::NotPositiveDefinite { pivot: 1 });
/// ```
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinalgError {
    /// A buffer length disagrees with the dimensions passed alongside it.
    #[error("buffer `{name}` has length {actual}, expected {expected}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Inner dimensions of a product do not agree.
    #[error("inner dimensions do not match: {left} columns against {right} rows")]
    InnerDimensionMismatch { left: usize, right: usize },

    /// The operation needs at least as many rows as columns.
    #[error("matrix has {rows} rows but {columns} columns, rows must not be fewer than columns")]
    RowsLessThanColumns { rows: usize, columns: usize },

    /// Matrix is not positive definite (required for Cholesky).
    #[error("matrix is not positive definite (failed at pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },

    /// Iterative algorithm did not converge within the iteration budget.
    #[error("iterative algorithm did not converge after {iterations} iterations")]
    ConvergenceFailure { iterations: usize },

    /// A pivot index does not name a row of the factored matrix.
    #[error("pivot {pivot} at step {index} is out of range for order {order}")]
    InvalidPivot {
        index: usize,
        pivot: usize,
        order: usize,
    },

    /// A parallel configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Fail unless `buf_len == rows * cols`.
#[inline]
pub(crate) fn check_len(
    name: &'static str,
    buf_len: usize,
    rows: usize,
    cols: usize,
) -> Result<(), LinalgError> {
    let expected = rows.checked_mul(cols).unwrap_or(usize::MAX);
    if buf_len != expected {
        return Err(LinalgError::DimensionMismatch {
            name,
            expected,
            actual: buf_len,
        });
    }
    Ok(())
}
