//! Elementwise operations over flat buffers.
//!
//! Every function checks that all slices share one length before touching
//! the output.

use num_traits::{Float, Zero};

use crate::linalg::LinalgError;
use crate::traits::LinalgScalar;

#[inline]
fn same_len(name: &'static str, expected: usize, actual: usize) -> Result<(), LinalgError> {
    if expected != actual {
        return Err(LinalgError::DimensionMismatch {
            name,
            expected,
            actual,
        });
    }
    Ok(())
}

/// `result = y + alpha * x`.
pub fn add_vector_to_scaled_vector<T: LinalgScalar>(
    y: &[T],
    alpha: T,
    x: &[T],
    result: &mut [T],
) -> Result<(), LinalgError> {
    same_len("x", y.len(), x.len())?;
    same_len("result", y.len(), result.len())?;

    if alpha.is_zero() {
        result.copy_from_slice(y);
    } else if alpha == T::one() {
        for ((r, &yi), &xi) in result.iter_mut().zip(y).zip(x) {
            *r = yi + xi;
        }
    } else {
        for ((r, &yi), &xi) in result.iter_mut().zip(y).zip(x) {
            *r = yi + alpha * xi;
        }
    }
    Ok(())
}

/// `result = alpha * x`.
pub fn scale_array<T: LinalgScalar>(alpha: T, x: &[T], result: &mut [T]) -> Result<(), LinalgError> {
    same_len("result", x.len(), result.len())?;

    if alpha.is_zero() {
        result.fill(T::zero());
    } else if alpha == T::one() {
        result.copy_from_slice(x);
    } else {
        for (r, &xi) in result.iter_mut().zip(x) {
            *r = alpha * xi;
        }
    }
    Ok(())
}

/// `result = conj(x)`.
pub fn conjugate_array<T: LinalgScalar>(x: &[T], result: &mut [T]) -> Result<(), LinalgError> {
    same_len("result", x.len(), result.len())?;
    for (r, &xi) in result.iter_mut().zip(x) {
        *r = xi.conj();
    }
    Ok(())
}

/// Unconjugated dot product `sum(x[i] * y[i])`.
pub fn dot_product<T: LinalgScalar>(x: &[T], y: &[T]) -> Result<T, LinalgError> {
    same_len("y", x.len(), y.len())?;
    Ok(dot(x, y))
}

#[inline]
fn dot<T: LinalgScalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = T::zero();
    for i in 0..a.len() {
        sum = sum + a[i] * b[i];
    }
    sum
}

macro_rules! pointwise {
    ($(#[$doc:meta])* $name:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$doc])*
        pub fn $name<T: LinalgScalar>(x: &[T], y: &[T], result: &mut [T]) -> Result<(), LinalgError> {
            same_len("y", x.len(), y.len())?;
            same_len("result", x.len(), result.len())?;
            for ((r, &$a), &$b) in result.iter_mut().zip(x).zip(y) {
                *r = $body;
            }
            Ok(())
        }
    };
}

pointwise!(
    /// `result = x + y`.
    add_arrays, |a, b| a + b
);
pointwise!(
    /// `result = x - y`.
    subtract_arrays, |a, b| a - b
);
pointwise!(
    /// `result = x .* y`.
    pointwise_multiply, |a, b| a * b
);
pointwise!(
    /// `result = x ./ y`. Division by zero follows IEEE semantics.
    pointwise_divide, |a, b| a / b
);
pointwise!(
    /// `result = x .^ y`.
    pointwise_power, |a, b| a.lpow(b)
);

/// Matrix norm selector for [`matrix_norm`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Norm {
    /// Maximum absolute column sum.
    OneNorm,
    /// Largest modulus of any element.
    LargestAbsoluteValue,
    /// Maximum absolute row sum.
    InfinityNorm,
    /// Square root of the sum of squared moduli.
    FrobeniusNorm,
}

/// Norm of a `rows x columns` column-major matrix.
pub fn matrix_norm<T: LinalgScalar>(
    norm: Norm,
    rows: usize,
    columns: usize,
    matrix: &[T],
) -> Result<T::Real, LinalgError> {
    crate::linalg::check_len("matrix", matrix.len(), rows, columns)?;
    let zero = <T::Real as Zero>::zero();

    let value = match norm {
        Norm::OneNorm => matrix
            .chunks_exact(rows.max(1))
            .take(columns)
            .map(|col| col.iter().fold(zero, |s, v| s + v.modulus()))
            .fold(zero, Float::max),
        Norm::LargestAbsoluteValue => matrix.iter().fold(zero, |m, v| m.max(v.modulus())),
        Norm::InfinityNorm => {
            let mut row_sums = vec![zero; rows];
            for col in matrix.chunks_exact(rows.max(1)).take(columns) {
                for (s, v) in row_sums.iter_mut().zip(col) {
                    *s = *s + v.modulus();
                }
            }
            row_sums.into_iter().fold(zero, Float::max)
        }
        Norm::FrobeniusNorm => matrix
            .iter()
            .fold(zero, |s, v| s + v.modulus_sqr())
            .sqrt(),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn scaled_add_special_cases() {
        let y = [1.0_f64, 2.0, 3.0];
        let x = [10.0, 20.0, 30.0];
        let mut r = [0.0; 3];

        add_vector_to_scaled_vector(&y, 0.0, &x, &mut r).unwrap();
        assert_eq!(r, y);
        add_vector_to_scaled_vector(&y, 1.0, &x, &mut r).unwrap();
        assert_eq!(r, [11.0, 22.0, 33.0]);
        add_vector_to_scaled_vector(&y, -0.5, &x, &mut r).unwrap();
        assert_eq!(r, [-4.0, -8.0, -12.0]);
    }

    #[test]
    fn scale_zero_discards_nan() {
        let x = [f64::NAN, 1.0];
        let mut r = [5.0; 2];
        scale_array(0.0, &x, &mut r).unwrap();
        assert_eq!(r, [0.0, 0.0]);
        scale_array(2.0, &[1.0, -3.0], &mut r).unwrap();
        assert_eq!(r, [2.0, -6.0]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut r = [0.0_f32; 2];
        let err = add_arrays(&[1.0, 2.0], &[1.0], &mut r).unwrap_err();
        assert_eq!(
            err,
            LinalgError::DimensionMismatch {
                name: "y",
                expected: 2,
                actual: 1
            }
        );
        assert!(dot_product(&[1.0_f32], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn complex_dot_is_unconjugated() {
        let x = [Complex::new(0.0_f64, 1.0)];
        let d = dot_product(&x, &x).unwrap();
        assert_eq!(d, Complex::new(-1.0, 0.0));

        let mut c = [Complex::new(0.0, 0.0)];
        conjugate_array(&x, &mut c).unwrap();
        assert_eq!(c[0], Complex::new(0.0, -1.0));
    }

    #[test]
    fn pointwise_ops() {
        let x = [2.0_f64, 9.0];
        let y = [3.0, 0.5];
        let mut r = [0.0; 2];
        pointwise_multiply(&x, &y, &mut r).unwrap();
        assert_eq!(r, [6.0, 4.5]);
        pointwise_divide(&x, &y, &mut r).unwrap();
        assert_eq!(r[1], 18.0);
        pointwise_power(&x, &y, &mut r).unwrap();
        assert!((r[0] - 8.0).abs() < 1e-12);
        assert!((r[1] - 3.0).abs() < 1e-12);
        subtract_arrays(&x, &y, &mut r).unwrap();
        assert_eq!(r, [-1.0, 8.5]);
    }

    #[test]
    fn norms() {
        // [[1, -2], [3, 4]] column-major
        let m = [1.0_f64, 3.0, -2.0, 4.0];
        assert_eq!(matrix_norm(Norm::OneNorm, 2, 2, &m).unwrap(), 6.0);
        assert_eq!(matrix_norm(Norm::InfinityNorm, 2, 2, &m).unwrap(), 7.0);
        assert_eq!(matrix_norm(Norm::LargestAbsoluteValue, 2, 2, &m).unwrap(), 4.0);
        let f = matrix_norm(Norm::FrobeniusNorm, 2, 2, &m).unwrap();
        assert!((f - 30.0_f64.sqrt()).abs() < 1e-14);
        assert!(matrix_norm(Norm::OneNorm, 3, 2, &m).is_err());
    }
}
