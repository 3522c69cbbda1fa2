use num_traits::{Float, Zero};

use crate::linalg::{check_len, LinalgError};
use crate::traits::LinalgScalar;

/// Reduce a square matrix to upper Hessenberg form via Householder similarity
/// transforms: `Q^H A Q = H`.
///
/// `a` is an `n x n` column-major matrix. On return:
/// - `a` is overwritten with the upper Hessenberg matrix H
/// - `q` holds the orthogonal/unitary transform Q
///
/// The result satisfies `A = Q H Q^H`.
pub fn reduce_to_hessenberg<T: LinalgScalar>(
    a: &mut [T],
    n: usize,
    q: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), n, n)?;
    check_len("q", q.len(), n, n)?;

    q.fill(T::zero());
    for i in 0..n {
        q[i * n + i] = T::one();
    }

    for k in 0..n.saturating_sub(2) {
        // Form Householder vector from a[k+1:n, k] (contiguous column data)
        let col_k = k * n;
        let mut norm_sq = <T::Real as Zero>::zero();
        for &v in &a[col_k + k + 1..col_k + n] {
            norm_sq = norm_sq + v.modulus_sqr();
        }
        if norm_sq.is_zero() {
            continue;
        }

        let norm = norm_sq.sqrt();
        let ak1k = a[col_k + k + 1];
        let sigma = T::from_real(norm) * ak1k.phase();
        let v0 = ak1k + sigma;

        // Store normalized Householder vector in a[k+2:n, k] (v[0] = 1 implicit)
        let inv_v0 = T::one() / v0;
        for x in a[col_k + k + 2..col_k + n].iter_mut() {
            *x = *x * inv_v0;
        }

        // H = I - tau v v^H with real tau = 1 + |a[k+1,k]| / norm
        let tau = v0 / sigma;

        // Apply from the left to columns k+1..n
        let (head, tail) = a.split_at_mut((k + 1) * n);
        let v_tail = &head[col_k + k + 2..col_k + n];
        for column in tail.chunks_exact_mut(n) {
            let mut dot = column[k + 1];
            for (&vi, &x) in v_tail.iter().zip(&column[k + 2..]) {
                dot = dot + vi.conj() * x;
            }
            dot = dot * tau;
            column[k + 1] = column[k + 1] - dot;
            for (x, &vi) in column[k + 2..].iter_mut().zip(v_tail) {
                *x = *x - dot * vi;
            }
        }

        // Apply from the right: A[:, k+1:n] = A[:, k+1:n] (I - tau v v^H)
        apply_right(a, n, k, tau, None);

        // Accumulate Q: Q = Q (I - tau v v^H)
        apply_right(q, n, k, tau, Some(&*a));

        a[col_k + k + 1] = T::zero() - sigma;
        a[col_k + k + 2..col_k + n].fill(T::zero());
    }
    Ok(())
}

/// `m[:, k+1:n] -= tau * (m[:, k+1:n] v) v^H`, with `v = [1, h[k+2:n, k]]`
/// read from `reflector` or, when `None`, from `m` itself.
fn apply_right<T: LinalgScalar>(m: &mut [T], n: usize, k: usize, tau: T, reflector: Option<&[T]>) {
    let v: Vec<T> = {
        let src = reflector.unwrap_or(m);
        src[k * n + k + 2..(k + 1) * n].to_vec()
    };
    let mut w = m[(k + 1) * n..(k + 2) * n].to_vec();
    for (jj, &vj) in v.iter().enumerate() {
        let col = &m[(k + 2 + jj) * n..(k + 3 + jj) * n];
        for (wi, &x) in w.iter_mut().zip(col) {
            *wi = *wi + x * vj;
        }
    }
    for wi in w.iter_mut() {
        *wi = *wi * tau;
    }

    for (x, &wi) in m[(k + 1) * n..(k + 2) * n].iter_mut().zip(&w) {
        *x = *x - wi;
    }
    for (jj, &vj) in v.iter().enumerate() {
        let vc = vj.conj();
        for (x, &wi) in m[(k + 2 + jj) * n..(k + 3 + jj) * n].iter_mut().zip(&w) {
            *x = *x - wi * vc;
        }
    }
}
