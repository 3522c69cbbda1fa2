use num_traits::{Float, Zero};
use rayon::prelude::*;

use crate::linalg::{check_len, LinalgError};
use crate::parallel::{degree, join, ParallelConfig, Parallelism};
use crate::traits::LinalgScalar;

/// Cholesky decomposition in place: `A = L * L^H`.
///
/// `a` is an `order x order` Hermitian (symmetric for reals) positive
/// definite matrix in column-major order. Only the lower triangle is read.
/// On return the lower triangle holds L and the strict upper triangle is
/// zeroed.
///
/// Fails at the first pivot whose real part is not strictly positive.
pub fn cholesky_factor<T: LinalgScalar>(
    a: &mut [T],
    order: usize,
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    config.validate()?;

    let n = order;
    let mut multipliers = vec![T::zero(); n];

    for ij in 0..n {
        let col_start = ij * n;
        let d = a[col_start + ij].re();
        if !(d > <T::Real as Zero>::zero()) {
            log::debug!(target: "managed_linalg", "Cholesky pivot {ij} is not positive: {d:?}");
            return Err(LinalgError::NotPositiveDefinite { pivot: ij });
        }

        let pivot = T::from_real(d.sqrt());
        a[col_start + ij] = pivot;
        multipliers[ij] = pivot;
        let inv_pivot = T::one() / pivot;
        for i in (ij + 1)..n {
            let l = a[col_start + i] * inv_pivot;
            a[col_start + i] = l;
            multipliers[i] = l;
        }

        let first = ij + 1;
        let (_, trailing) = a.split_at_mut(first * n);
        update_columns(trailing, n, first, &multipliers, config, config.parallelism);

        for i in first..n {
            a[i * n + ij] = T::zero();
        }
    }

    Ok(())
}

/// Rank-1 update `a[i, j] -= m[i] * conj(m[j])` over the lower part of the
/// columns held in `columns`, the first of which is column `first`.
///
/// The workload per column shrinks with `j`, so ranges are split at one third.
fn update_columns<T: LinalgScalar>(
    columns: &mut [T],
    n: usize,
    first: usize,
    multipliers: &[T],
    config: &ParallelConfig,
    parallelism: Parallelism,
) {
    let count = columns.len() / n.max(1);
    let split = count / 3;
    if degree(parallelism) > 1 && count > config.parallelize_elements && split > 0 {
        let (left, right) = columns.split_at_mut(split * n);
        join(
            |par| update_columns(left, n, first, multipliers, config, par),
            |par| update_columns(right, n, first + split, multipliers, config, par),
            parallelism,
        );
        return;
    }

    for (offset, column) in columns.chunks_exact_mut(n).enumerate() {
        let j = first + offset;
        let mj = multipliers[j].conj();
        for (x, &mi) in column[j..].iter_mut().zip(&multipliers[j..]) {
            *x = *x - mi * mj;
        }
    }
}

/// Solve `A X = B` given the lower factor from [`cholesky_factor`].
///
/// `b` is `order x columns_b` and is overwritten with `X`. Each right-hand
/// side is an independent task.
pub fn cholesky_solve_factored<T: LinalgScalar>(
    a: &[T],
    order: usize,
    b: &mut [T],
    columns_b: usize,
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_len("b", b.len(), order, columns_b)?;
    config.validate()?;
    if order == 0 {
        return Ok(());
    }

    if degree(config.parallelism) > 1 && columns_b > 1 {
        b.par_chunks_mut(order)
            .for_each(|col| substitute(a, order, col));
    } else {
        for col in b.chunks_exact_mut(order) {
            substitute(a, order, col);
        }
    }
    Ok(())
}

/// Forward substitution with L, then back substitution with L^H.
fn substitute<T: LinalgScalar>(a: &[T], n: usize, b: &mut [T]) {
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum = sum - a[k * n + i] * b[k];
        }
        b[i] = sum / a[i * n + i];
    }

    for i in (0..n).rev() {
        let mut sum = b[i];
        for k in (i + 1)..n {
            sum = sum - a[i * n + k].conj() * b[k];
        }
        b[i] = sum / a[i * n + i].conj();
    }
}

/// Solve `A X = B`, factoring a scratch copy of `a`.
pub fn cholesky_solve<T: LinalgScalar>(
    a: &[T],
    order: usize,
    b: &mut [T],
    columns_b: usize,
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_len("b", b.len(), order, columns_b)?;

    let mut factor = a.to_vec();
    cholesky_factor(&mut factor, order, config)?;
    cholesky_solve_factored(&factor, order, b, columns_b, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::test_util::{adjoint, assert_near, assert_slices_near, mul};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_spd(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let m: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut a = mul(&m, &adjoint(&m, n, n), n, n, n);
        for i in 0..n {
            a[i * n + i] += n as f64;
        }
        a
    }

    #[test]
    fn known_factor_3x3() {
        // [[4, 12, -16], [12, 37, -43], [-16, -43, 98]]
        let mut a = [4.0_f64, 12.0, -16.0, 12.0, 37.0, -43.0, -16.0, -43.0, 98.0];
        cholesky_factor(&mut a, 3, &ParallelConfig::sequential()).unwrap();
        // L = [[2, 0, 0], [6, 1, 0], [-8, 5, 3]]
        let expected = [2.0, 6.0, -8.0, 0.0, 1.0, 5.0, 0.0, 0.0, 3.0];
        assert_slices_near(&a, &expected, 1e-12, "L");
    }

    #[test]
    fn negative_diagonal_is_not_positive_definite() {
        let n = 4;
        let mut a = vec![0.0_f64; n * n];
        for i in 0..n {
            a[i * n + i] = 1.0;
        }
        a[2 * n + 2] = -4.0;
        let err = cholesky_factor(&mut a, n, &ParallelConfig::sequential()).unwrap_err();
        assert_eq!(err, LinalgError::NotPositiveDefinite { pivot: 2 });
    }

    #[test]
    fn nan_pivot_is_not_positive_definite() {
        let mut a = [f64::NAN];
        assert!(cholesky_factor(&mut a, 1, &ParallelConfig::sequential()).is_err());
    }

    #[test]
    fn reconstruct_and_solve() {
        let n = 9;
        let a = random_spd(n, 0);
        let mut l = a.clone();
        cholesky_factor(&mut l, n, &ParallelConfig::sequential()).unwrap();
        assert_slices_near(&mul(&l, &adjoint(&l, n, n), n, n, n), &a, 1e-12, "L L^T");

        let x_true: Vec<f64> = (0..2 * n).map(|i| i as f64 - 3.0).collect();
        let mut b = mul(&a, &x_true, n, n, 2);
        cholesky_solve(&a, n, &mut b, 2, &ParallelConfig::sequential()).unwrap();
        for (i, (&x, &t)) in b.iter().zip(&x_true).enumerate() {
            assert_near(x, t, 1e-10, &format!("x[{}]", i));
        }
    }

    #[test]
    fn parallel_update_matches_sequential() {
        let n = 40;
        let a = random_spd(n, 1);
        let seq = ParallelConfig::sequential();
        let par = ParallelConfig::default()
            .with_parallelism(Parallelism::Rayon(4))
            .with_parallelize_elements(4);

        let mut l_seq = a.clone();
        let mut l_par = a.clone();
        cholesky_factor(&mut l_seq, n, &seq).unwrap();
        cholesky_factor(&mut l_par, n, &par).unwrap();
        assert_eq!(l_seq, l_par);

        let mut b_seq: Vec<f64> = (0..n * 3).map(|i| (i % 7) as f64).collect();
        let mut b_par = b_seq.clone();
        cholesky_solve_factored(&l_seq, n, &mut b_seq, 3, &seq).unwrap();
        cholesky_solve_factored(&l_par, n, &mut b_par, 3, &par).unwrap();
        assert_eq!(b_seq, b_par);
    }

    #[test]
    fn zero_element_threshold_still_factors() {
        let n = 5;
        let a = random_spd(n, 2);
        let par = ParallelConfig::default()
            .with_parallelism(Parallelism::Rayon(8))
            .with_parallelize_elements(0);

        let mut l_seq = a.clone();
        let mut l_par = a.clone();
        cholesky_factor(&mut l_seq, n, &ParallelConfig::sequential()).unwrap();
        cholesky_factor(&mut l_par, n, &par).unwrap();
        assert_eq!(l_seq, l_par);

        // two trailing columns: no one-third split exists
        let multipliers = [1.0, 2.0, 3.0];
        let mut columns = vec![1.0_f64; 2 * 3];
        update_columns(&mut columns, 3, 1, &multipliers, &par, par.parallelism);
        assert_eq!(columns, [1.0, -3.0, -5.0, 1.0, 1.0, -8.0]);
    }
}
