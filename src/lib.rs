//! # managed-linalg
//!
//! Pure-Rust dense linear algebra kernel over flat column-major buffers. No
//! BLAS or LAPACK is linked; the same algorithm bodies serve `f32`, `f64`,
//! `Complex<f32>` and `Complex<f64>`.
//!
//! ## Quick start
//!
//! ```
//! use managed_linalg::linalg::lu_solve;
//!
//! // [[2, 1, -1], [-3, -1, 2], [-2, 1, 2]] stored column by column
//! let a = [2.0_f64, -3.0, -2.0, 1.0, -1.0, 1.0, -1.0, 2.0, 2.0];
//! let mut b = [8.0, -11.0, -3.0];
//! lu_solve(1, &a, 3, &mut b).unwrap();
//! assert!((b[0] - 2.0).abs() < 1e-12);
//! assert!((b[1] - 3.0).abs() < 1e-12);
//! assert!((b[2] + 1.0).abs() < 1e-12);
//! ```
//!
//! ## Layout
//!
//! A matrix with `rows` rows is a slice where element `(i, j)` lives at
//! `j * rows + i`. Every entry point takes the dimensions next to the buffers
//! and checks the lengths before touching anything.
//!
//! ## Modules
//!
//! - [`kernel`]: elementwise array operations, matrix norms and the
//!   cache-oblivious matrix multiply `C = alpha op(A) op(B) + beta C`.
//!
//! - [`linalg`]: LU with partial pivoting, Cholesky, Householder QR (full and
//!   thin), SVD and eigendecomposition (symmetric QL, real and complex Schur
//!   for the general case), each with its solve routines.
//!
//! - [`parallel`]: [`ParallelConfig`] and the fork-join helpers. Parallel
//!   work runs on rayon's pool and only ever writes disjoint buffer regions.
//!
//! - [`provider`]: the [`Provider`] lifecycle and the
//!   [`LinearAlgebraProvider`] operation set, implemented by
//!   [`ManagedLinearAlgebraProvider`].
//!
//! - [`traits`]: element trait hierarchy:
//!   - [`Scalar`]: all buffer elements
//!   - [`FloatScalar`]: real floats
//!   - [`LinalgScalar`]: real floats and complex numbers
//!
//! ## Logging
//!
//! Diagnostics go through the `log` facade under the `managed_linalg` target:
//! `warn` for convergence failures and zero LU pivots, `debug` for provider
//! initialisation and rejected Cholesky pivots, `trace` for forks.

pub mod kernel;
pub mod linalg;
pub mod parallel;
pub mod provider;
pub mod traits;

pub use kernel::{Norm, Transpose};
pub use linalg::{LinalgError, NonsymmetricEigen, QrMethod};
pub use parallel::{ParallelConfig, Parallelism};
pub use provider::{LinearAlgebraProvider, ManagedLinearAlgebraProvider, Provider, ProviderKind};
pub use traits::{FloatScalar, LinalgScalar, Scalar};

pub use num_complex::Complex;
