use num_complex::Complex;
use num_traits::Zero;

use crate::linalg::hessenberg::reduce_to_hessenberg;
use crate::linalg::schur::{
    complex_schur_eigenvectors, hessenberg_to_complex_schur, hessenberg_to_real_schur,
};
use crate::linalg::symmetric_eigen::{symmetric_diagonalize, symmetric_tridiagonalize};
use crate::linalg::{check_len, LinalgError};
use crate::traits::{FloatScalar, LinalgScalar};

/// Element types with a nonsymmetric eigen solver.
///
/// Real types go through the real Schur form and report complex-conjugate
/// pairs as 2x2 blocks. Complex types reduce to a triangular Schur form and
/// have a purely diagonal eigenvalue matrix.
pub trait NonsymmetricEigen: LinalgScalar {
    /// Finish an eigendecomposition from a Hessenberg matrix.
    ///
    /// `hessenberg` is the `order x order` upper Hessenberg matrix (destroyed)
    /// and `vectors` the unitary transform that produced it; on return
    /// `vectors` holds the eigenvectors of the original matrix.
    fn hessenberg_eigen(
        order: usize,
        hessenberg: &mut [Self],
        vectors: &mut [Self],
        eigenvalues: &mut [Complex<Self::Real>],
        block_diagonal: &mut [Self],
    ) -> Result<(), LinalgError>;
}

macro_rules! impl_nonsymmetric_eigen_real {
    ($($t:ty),*) => {
        $(
            impl NonsymmetricEigen for $t {
                fn hessenberg_eigen(
                    order: usize,
                    hessenberg: &mut [$t],
                    vectors: &mut [$t],
                    eigenvalues: &mut [Complex<$t>],
                    block_diagonal: &mut [$t],
                ) -> Result<(), LinalgError> {
                    let mut d = vec![0.0; order];
                    let mut e = vec![0.0; order];
                    hessenberg_to_real_schur(hessenberg, vectors, order, &mut d, &mut e)?;
                    fill_real_block_diagonal(order, &d, &e, eigenvalues, block_diagonal);
                    Ok(())
                }
            }
        )*
    };
}

impl_nonsymmetric_eigen_real!(f32, f64);

impl<T: FloatScalar> NonsymmetricEigen for Complex<T> {
    fn hessenberg_eigen(
        order: usize,
        hessenberg: &mut [Self],
        vectors: &mut [Self],
        eigenvalues: &mut [Complex<T>],
        block_diagonal: &mut [Self],
    ) -> Result<(), LinalgError> {
        hessenberg_to_complex_schur(hessenberg, vectors, order)?;

        let mut x = vec![Complex::zero(); order * order];
        complex_schur_eigenvectors(hessenberg, vectors, order, &mut x)?;
        vectors.copy_from_slice(&x);

        block_diagonal.fill(Complex::zero());
        for i in 0..order {
            let lambda = hessenberg[i * order + i];
            eigenvalues[i] = lambda;
            block_diagonal[i * order + i] = lambda;
        }
        Ok(())
    }
}

/// Real eigenvalues on the diagonal, `[[re, im], [-im, re]]` for each pair.
fn fill_real_block_diagonal<T: FloatScalar>(
    order: usize,
    d: &[T],
    e: &[T],
    eigenvalues: &mut [Complex<T>],
    block_diagonal: &mut [T],
) {
    block_diagonal.fill(T::zero());
    for i in 0..order {
        eigenvalues[i] = Complex::new(d[i], e[i]);
        block_diagonal[i * order + i] = d[i];
        if e[i] > T::zero() {
            block_diagonal[(i + 1) * order + i] = e[i];
        } else if e[i] < T::zero() {
            block_diagonal[(i - 1) * order + i] = e[i];
        }
    }
}

/// Eigendecomposition `A V = V D` of an `order x order` matrix.
///
/// With `is_symmetric` the matrix is taken as symmetric (Hermitian for
/// complex types) and only that path's guarantees hold: eigenvalues are real
/// and ascending, `eigenvectors` is orthonormal and `block_diagonal` is
/// diagonal. Otherwise the general solver of [`NonsymmetricEigen`] runs;
/// complex-conjugate pairs of a real matrix are adjacent with the positive
/// imaginary part first.
///
/// `matrix` is left untouched. Fails with
/// [`LinalgError::ConvergenceFailure`] when the iteration budget runs out.
pub fn eigen_decomp<T: NonsymmetricEigen>(
    is_symmetric: bool,
    order: usize,
    matrix: &[T],
    eigenvectors: &mut [T],
    eigenvalues: &mut [Complex<T::Real>],
    block_diagonal: &mut [T],
) -> Result<(), LinalgError> {
    check_len("matrix", matrix.len(), order, order)?;
    check_len("eigenvectors", eigenvectors.len(), order, order)?;
    check_len("eigenvalues", eigenvalues.len(), order, 1)?;
    check_len("block_diagonal", block_diagonal.len(), order, order)?;

    let mut work = matrix.to_vec();
    if is_symmetric {
        let mut d = vec![<T::Real as Zero>::zero(); order];
        let mut e = vec![<T::Real as Zero>::zero(); order];
        symmetric_tridiagonalize(&mut work, order, &mut d, &mut e, eigenvectors)?;
        symmetric_diagonalize::<T>(&mut d, &mut e, eigenvectors, order)?;

        block_diagonal.fill(T::zero());
        for (i, &lambda) in d.iter().enumerate() {
            eigenvalues[i] = Complex::new(lambda, <T::Real as Zero>::zero());
            block_diagonal[i * order + i] = T::from_real(lambda);
        }
        Ok(())
    } else {
        reduce_to_hessenberg(&mut work, order, eigenvectors)?;
        T::hessenberg_eigen(order, &mut work, eigenvectors, eigenvalues, block_diagonal)
    }
}
