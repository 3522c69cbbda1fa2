//! The provider surface: a lifecycle contract shared with native backends and
//! the typed operation set, implemented here by the managed kernels.

use core::fmt;

use num_complex::Complex;

use crate::kernel::{self, Norm, Transpose};
use crate::linalg::{self, LinalgError, NonsymmetricEigen, QrMethod};
use crate::parallel::{ParallelConfig, Parallelism};

/// Backend families a provider can stand for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Pure Rust kernels of this crate.
    Managed,
    NativeMkl,
    NativeOpenBlas,
    NativeCuda,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Managed => "Managed",
            ProviderKind::NativeMkl => "Intel MKL",
            ProviderKind::NativeOpenBlas => "OpenBLAS",
            ProviderKind::NativeCuda => "CUDA",
        };
        f.write_str(name)
    }
}

/// Lifecycle every provider implements so callers can select and install it.
pub trait Provider {
    fn kind(&self) -> ProviderKind;

    /// Whether the backend can be used in this process.
    fn is_available(&self) -> bool;

    /// Prepare the backend and check it is usable.
    fn initialize_verify(&self) -> Result<(), LinalgError>;

    /// Release any external handles held by the backend.
    fn free_resources(&self);
}

/// Dense linear algebra over column-major buffers of `T`.
///
/// Each method has the contract of the free function of the same name in
/// [`kernel`] or [`linalg`]; parallel thresholds come from the provider.
pub trait LinearAlgebraProvider<T: NonsymmetricEigen>: Provider {
    fn add_vector_to_scaled_vector(
        &self,
        y: &[T],
        alpha: T,
        x: &[T],
        result: &mut [T],
    ) -> Result<(), LinalgError>;

    fn scale_array(&self, alpha: T, x: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn conjugate_array(&self, x: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn dot_product(&self, x: &[T], y: &[T]) -> Result<T, LinalgError>;

    fn add_arrays(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn subtract_arrays(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn pointwise_multiply(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn pointwise_divide(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn pointwise_power(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError>;

    fn matrix_norm(
        &self,
        norm: Norm,
        rows: usize,
        columns: usize,
        matrix: &[T],
    ) -> Result<T::Real, LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn matrix_multiply(
        &self,
        x: &[T],
        rows_x: usize,
        cols_x: usize,
        y: &[T],
        rows_y: usize,
        cols_y: usize,
        result: &mut [T],
    ) -> Result<(), LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn matrix_multiply_with_update(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        alpha: T,
        a: &[T],
        rows_a: usize,
        cols_a: usize,
        b: &[T],
        rows_b: usize,
        cols_b: usize,
        beta: T,
        c: &mut [T],
    ) -> Result<(), LinalgError>;

    fn lu_factor(&self, data: &mut [T], order: usize, ipiv: &mut [usize])
        -> Result<(), LinalgError>;

    fn lu_solve_factored(
        &self,
        columns_of_b: usize,
        a: &[T],
        order: usize,
        ipiv: &[usize],
        b: &mut [T],
    ) -> Result<(), LinalgError>;

    fn lu_solve(&self, columns_of_b: usize, a: &[T], order: usize, b: &mut [T])
        -> Result<(), LinalgError>;

    fn lu_inverse_factored(&self, a: &mut [T], order: usize, ipiv: &[usize])
        -> Result<(), LinalgError>;

    fn lu_inverse(&self, a: &mut [T], order: usize) -> Result<(), LinalgError>;

    fn lu_determinant(&self, a: &[T], order: usize, ipiv: &[usize]) -> Result<T, LinalgError>;

    fn cholesky_factor(&self, a: &mut [T], order: usize) -> Result<(), LinalgError>;

    fn cholesky_solve_factored(
        &self,
        a: &[T],
        order: usize,
        b: &mut [T],
        columns_b: usize,
    ) -> Result<(), LinalgError>;

    fn cholesky_solve(
        &self,
        a: &[T],
        order: usize,
        b: &mut [T],
        columns_b: usize,
    ) -> Result<(), LinalgError>;

    fn qr_factor(
        &self,
        r: &mut [T],
        rows: usize,
        cols: usize,
        q: &mut [T],
        tau: &mut [T],
    ) -> Result<(), LinalgError>;

    fn thin_qr_factor(
        &self,
        a: &mut [T],
        rows: usize,
        cols: usize,
        r: &mut [T],
        tau: &mut [T],
    ) -> Result<(), LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn qr_solve_factored(
        &self,
        q: &[T],
        r: &[T],
        rows: usize,
        cols: usize,
        tau: &[T],
        b: &[T],
        columns_b: usize,
        x: &mut [T],
        method: QrMethod,
    ) -> Result<(), LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn qr_solve(
        &self,
        a: &[T],
        rows: usize,
        cols: usize,
        b: &[T],
        columns_b: usize,
        x: &mut [T],
        method: QrMethod,
    ) -> Result<(), LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn singular_value_decomposition(
        &self,
        compute_vectors: bool,
        a: &mut [T],
        rows: usize,
        cols: usize,
        s: &mut [T::Real],
        u: &mut [T],
        vt: &mut [T],
    ) -> Result<(), LinalgError>;

    #[allow(clippy::too_many_arguments)]
    fn svd_solve_factored(
        &self,
        rows: usize,
        cols: usize,
        s: &[T::Real],
        u: &[T],
        vt: &[T],
        b: &[T],
        columns_b: usize,
        x: &mut [T],
    ) -> Result<(), LinalgError>;

    fn svd_solve(
        &self,
        a: &[T],
        rows: usize,
        cols: usize,
        b: &[T],
        columns_b: usize,
        x: &mut [T],
    ) -> Result<(), LinalgError>;

    fn eigen_decomp(
        &self,
        is_symmetric: bool,
        order: usize,
        matrix: &[T],
        eigenvectors: &mut [T],
        eigenvalues: &mut [Complex<T::Real>],
        block_diagonal: &mut [T],
    ) -> Result<(), LinalgError>;
}

/// Provider backed by the pure Rust kernels.
///
/// Always available. The only state is the parallel configuration handed to
/// every kernel call.
///
/// ```
/// use managed_linalg::{LinearAlgebraProvider, ManagedLinearAlgebraProvider, Provider};
///
/// let provider = ManagedLinearAlgebraProvider::default();
/// provider.initialize_verify().unwrap();
///
/// let mut a = [4.0_f64, 6.0, 3.0, 3.0];
/// let mut ipiv = [0; 2];
/// provider.lu_factor(&mut a, 2, &mut ipiv).unwrap();
/// assert_eq!(ipiv, [1, 1]);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagedLinearAlgebraProvider {
    pub config: ParallelConfig,
}

impl ManagedLinearAlgebraProvider {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Provider that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self::new(ParallelConfig::sequential())
    }
}

impl fmt::Display for ManagedLinearAlgebraProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.config.parallelism {
            Parallelism::None => write!(f, "Managed (sequential)"),
            Parallelism::Rayon(0) => write!(f, "Managed (rayon, {} threads)", self.config.degree()),
            Parallelism::Rayon(n) => write!(f, "Managed (rayon, {n} threads)"),
        }
    }
}

impl Provider for ManagedLinearAlgebraProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Managed
    }

    fn is_available(&self) -> bool {
        true
    }

    fn initialize_verify(&self) -> Result<(), LinalgError> {
        self.config.validate()?;
        log::debug!(
            target: "managed_linalg",
            "initialized {}: block size {}, parallelize order {}, parallelize elements {}",
            self,
            self.config.block_size,
            self.config.parallelize_order,
            self.config.parallelize_elements,
        );
        Ok(())
    }

    fn free_resources(&self) {}
}

impl<T: NonsymmetricEigen> LinearAlgebraProvider<T> for ManagedLinearAlgebraProvider {
    fn add_vector_to_scaled_vector(
        &self,
        y: &[T],
        alpha: T,
        x: &[T],
        result: &mut [T],
    ) -> Result<(), LinalgError> {
        kernel::add_vector_to_scaled_vector(y, alpha, x, result)
    }

    fn scale_array(&self, alpha: T, x: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::scale_array(alpha, x, result)
    }

    fn conjugate_array(&self, x: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::conjugate_array(x, result)
    }

    fn dot_product(&self, x: &[T], y: &[T]) -> Result<T, LinalgError> {
        kernel::dot_product(x, y)
    }

    fn add_arrays(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::add_arrays(x, y, result)
    }

    fn subtract_arrays(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::subtract_arrays(x, y, result)
    }

    fn pointwise_multiply(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::pointwise_multiply(x, y, result)
    }

    fn pointwise_divide(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::pointwise_divide(x, y, result)
    }

    fn pointwise_power(&self, x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
        kernel::pointwise_power(x, y, result)
    }

    fn matrix_norm(
        &self,
        norm: Norm,
        rows: usize,
        columns: usize,
        matrix: &[T],
    ) -> Result<T::Real, LinalgError> {
        kernel::matrix_norm(norm, rows, columns, matrix)
    }

    fn matrix_multiply(
        &self,
        x: &[T],
        rows_x: usize,
        cols_x: usize,
        y: &[T],
        rows_y: usize,
        cols_y: usize,
        result: &mut [T],
    ) -> Result<(), LinalgError> {
        kernel::matrix_multiply(x, rows_x, cols_x, y, rows_y, cols_y, result, &self.config)
    }

    fn matrix_multiply_with_update(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        alpha: T,
        a: &[T],
        rows_a: usize,
        cols_a: usize,
        b: &[T],
        rows_b: usize,
        cols_b: usize,
        beta: T,
        c: &mut [T],
    ) -> Result<(), LinalgError> {
        kernel::matrix_multiply_with_update(
            trans_a,
            trans_b,
            alpha,
            a,
            rows_a,
            cols_a,
            b,
            rows_b,
            cols_b,
            beta,
            c,
            &self.config,
        )
    }

    fn lu_factor(
        &self,
        data: &mut [T],
        order: usize,
        ipiv: &mut [usize],
    ) -> Result<(), LinalgError> {
        linalg::lu_factor(data, order, ipiv)
    }

    fn lu_solve_factored(
        &self,
        columns_of_b: usize,
        a: &[T],
        order: usize,
        ipiv: &[usize],
        b: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::lu_solve_factored(columns_of_b, a, order, ipiv, b)
    }

    fn lu_solve(
        &self,
        columns_of_b: usize,
        a: &[T],
        order: usize,
        b: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::lu_solve(columns_of_b, a, order, b)
    }

    fn lu_inverse_factored(
        &self,
        a: &mut [T],
        order: usize,
        ipiv: &[usize],
    ) -> Result<(), LinalgError> {
        linalg::lu_inverse_factored(a, order, ipiv)
    }

    fn lu_inverse(&self, a: &mut [T], order: usize) -> Result<(), LinalgError> {
        linalg::lu_inverse(a, order)
    }

    fn lu_determinant(&self, a: &[T], order: usize, ipiv: &[usize]) -> Result<T, LinalgError> {
        linalg::lu_determinant(a, order, ipiv)
    }

    fn cholesky_factor(&self, a: &mut [T], order: usize) -> Result<(), LinalgError> {
        linalg::cholesky_factor(a, order, &self.config)
    }

    fn cholesky_solve_factored(
        &self,
        a: &[T],
        order: usize,
        b: &mut [T],
        columns_b: usize,
    ) -> Result<(), LinalgError> {
        linalg::cholesky_solve_factored(a, order, b, columns_b, &self.config)
    }

    fn cholesky_solve(
        &self,
        a: &[T],
        order: usize,
        b: &mut [T],
        columns_b: usize,
    ) -> Result<(), LinalgError> {
        linalg::cholesky_solve(a, order, b, columns_b, &self.config)
    }

    fn qr_factor(
        &self,
        r: &mut [T],
        rows: usize,
        cols: usize,
        q: &mut [T],
        tau: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::qr_factor(r, rows, cols, q, tau, &self.config)
    }

    fn thin_qr_factor(
        &self,
        a: &mut [T],
        rows: usize,
        cols: usize,
        r: &mut [T],
        tau: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::thin_qr_factor(a, rows, cols, r, tau, &self.config)
    }

    fn qr_solve_factored(
        &self,
        q: &[T],
        r: &[T],
        rows: usize,
        cols: usize,
        tau: &[T],
        b: &[T],
        columns_b: usize,
        x: &mut [T],
        method: QrMethod,
    ) -> Result<(), LinalgError> {
        linalg::qr_solve_factored(q, r, rows, cols, tau, b, columns_b, x, method)
    }

    fn qr_solve(
        &self,
        a: &[T],
        rows: usize,
        cols: usize,
        b: &[T],
        columns_b: usize,
        x: &mut [T],
        method: QrMethod,
    ) -> Result<(), LinalgError> {
        linalg::qr_solve(a, rows, cols, b, columns_b, x, method, &self.config)
    }

    fn singular_value_decomposition(
        &self,
        compute_vectors: bool,
        a: &mut [T],
        rows: usize,
        cols: usize,
        s: &mut [T::Real],
        u: &mut [T],
        vt: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::singular_value_decomposition(compute_vectors, a, rows, cols, s, u, vt)
    }

    fn svd_solve_factored(
        &self,
        rows: usize,
        cols: usize,
        s: &[T::Real],
        u: &[T],
        vt: &[T],
        b: &[T],
        columns_b: usize,
        x: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::svd_solve_factored(rows, cols, s, u, vt, b, columns_b, x)
    }

    fn svd_solve(
        &self,
        a: &[T],
        rows: usize,
        cols: usize,
        b: &[T],
        columns_b: usize,
        x: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::svd_solve(a, rows, cols, b, columns_b, x)
    }

    fn eigen_decomp(
        &self,
        is_symmetric: bool,
        order: usize,
        matrix: &[T],
        eigenvectors: &mut [T],
        eigenvalues: &mut [Complex<T::Real>],
        block_diagonal: &mut [T],
    ) -> Result<(), LinalgError> {
        linalg::eigen_decomp(
            is_symmetric,
            order,
            matrix,
            eigenvectors,
            eigenvalues,
            block_diagonal,
        )
    }
}
