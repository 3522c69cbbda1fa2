use num_traits::{Float, One, Zero};

use crate::linalg::{check_len, LinalgError};
use crate::traits::LinalgScalar;

/// Iteration budget per eigenvalue of the QL sweep.
const MAX_ITERATIONS: usize = 1000;

/// Householder tridiagonalization: reduce a symmetric (Hermitian) matrix to
/// real tridiagonal form via unitary similarity transforms.
///
/// `a` is the `n x n` column-major input and is used as workspace. On return:
/// - `d[0..n]` contains the diagonal of the tridiagonal matrix
/// - `e[0..n-1]` contains the subdiagonal (`e[k] = T[k+1, k]`), `e[n-1] = 0`
/// - `q` holds the unitary Q such that `Q^H A Q = T`
///
/// For complex input the Householder steps leave a complex subdiagonal; its
/// phases are moved into the columns of Q so that T is real.
pub fn symmetric_tridiagonalize<T: LinalgScalar>(
    a: &mut [T],
    n: usize,
    d: &mut [T::Real],
    e: &mut [T::Real],
    q: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), n, n)?;
    check_len("d", d.len(), n, 1)?;
    check_len("e", e.len(), n, 1)?;
    check_len("q", q.len(), n, n)?;

    let ix = |i: usize, j: usize| j * n + i;

    q.fill(T::zero());
    for i in 0..n {
        q[ix(i, i)] = T::one();
    }
    if n == 0 {
        return Ok(());
    }

    let mut sub = vec![T::zero(); n];
    let mut p = vec![T::zero(); n];
    let mut w = vec![T::zero(); n];

    for k in 0..n.saturating_sub(2) {
        // Form Householder vector from a[k+1:n, k]
        let mut norm_sq = <T::Real as Zero>::zero();
        for i in (k + 1)..n {
            norm_sq = norm_sq + a[ix(i, k)].modulus_sqr();
        }

        if norm_sq.is_zero() {
            sub[k] = T::zero();
            continue;
        }

        let norm = norm_sq.sqrt();
        let ak1k = a[ix(k + 1, k)];
        let sigma = T::from_real(norm) * ak1k.phase();

        // v = [ak1k + sigma, a[k+2, k], ..., a[n-1, k]], stored in place
        a[ix(k + 1, k)] = ak1k + sigma;
        let sub_n = n - k - 1;
        let v = |a: &[T], i: usize| a[ix(k + 1 + i, k)];

        let mut v_norm_sq = <T::Real as Zero>::zero();
        for i in 0..sub_n {
            v_norm_sq = v_norm_sq + v(a, i).modulus_sqr();
        }
        let two = <T::Real as One>::one() + <T::Real as One>::one();
        let tau_real = two / v_norm_sq;
        let tau = T::from_real(tau_real);

        // p = tau * A_sub * v, where A_sub = a[k+1:n, k+1:n]
        p[..sub_n].fill(T::zero());
        for jj in 0..sub_n {
            let vj = v(a, jj);
            let col = &a[ix(k + 1, k + 1 + jj)..ix(n, k + 1 + jj)];
            for (pi, &aij) in p[..sub_n].iter_mut().zip(col) {
                *pi = *pi + aij * vj;
            }
        }
        for pi in p[..sub_n].iter_mut() {
            *pi = tau * *pi;
        }

        // w = p - (tau/2)(v^H p) v
        let mut vhp = T::zero();
        for i in 0..sub_n {
            vhp = vhp + v(a, i).conj() * p[i];
        }
        let half_tau_vhp = T::from_real(tau_real / two) * vhp;
        for i in 0..sub_n {
            w[i] = p[i] - half_tau_vhp * v(a, i);
        }

        // Rank-2 update: A_sub -= v w^H + w v^H
        for jj in 0..sub_n {
            let vj = v(a, jj).conj();
            let wj = w[jj].conj();
            for i in 0..sub_n {
                let vi = v(a, i);
                let idx = ix(k + 1 + i, k + 1 + jj);
                a[idx] = a[idx] - vi * wj - w[i] * vj;
            }
        }

        sub[k] = T::zero() - sigma;

        // Accumulate Q: Q = Q (I - tau v v^H)
        for row in 0..n {
            let mut s = T::zero();
            for m in 0..sub_n {
                s = s + q[ix(row, k + 1 + m)] * v(a, m);
            }
            s = tau * s;
            for m in 0..sub_n {
                let idx = ix(row, k + 1 + m);
                q[idx] = q[idx] - s * v(a, m).conj();
            }
        }
    }

    for i in 0..n {
        d[i] = a[ix(i, i)].re();
    }
    if n >= 2 {
        sub[n - 2] = a[ix(n - 1, n - 2)];
    }

    // Absorb the subdiagonal phases: with D = diag(phase products),
    // D^H T D is real and Q D replaces Q.
    let mut phase = T::one();
    for k in 0..n - 1 {
        let s = sub[k];
        e[k] = s.modulus();
        if !s.is_zero() {
            phase = phase * s.phase();
        }
        if phase != T::one() {
            for x in q[(k + 1) * n..(k + 2) * n].iter_mut() {
                *x = *x * phase;
            }
        }
    }
    e[n - 1] = <T::Real as Zero>::zero();
    Ok(())
}

/// Implicit QL iteration on a real symmetric tridiagonal matrix.
///
/// - `d[0..n]`: diagonal entries, overwritten with eigenvalues sorted ascending
/// - `e[0..n]`: subdiagonal with `e[k] = T[k+1, k]` and `e[n-1] = 0` (destroyed)
/// - `q`: `n x n` eigenvector matrix the rotations are accumulated into; its
///   columns are permuted along with the eigenvalues
///
/// Fails with [`LinalgError::ConvergenceFailure`] when an eigenvalue does not
/// converge within 1000 sweeps.
pub fn symmetric_diagonalize<T: LinalgScalar>(
    d: &mut [T::Real],
    e: &mut [T::Real],
    q: &mut [T],
    n: usize,
) -> Result<(), LinalgError> {
    check_len("d", d.len(), n, 1)?;
    check_len("e", e.len(), n, 1)?;
    check_len("q", q.len(), n, n)?;
    if n == 0 {
        return Ok(());
    }

    let zero = <T::Real as Zero>::zero();
    let one = <T::Real as One>::one();
    let two = one + one;
    let eps = T::lepsilon();

    let mut f = zero;
    let mut tst1 = zero;
    for l in 0..n {
        // Find a small subdiagonal element
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 {
            if e[m].abs() <= eps * tst1 {
                break;
            }
            m += 1;
        }

        // If m == l, d[l] is already an eigenvalue, otherwise iterate
        if m > l {
            let mut iter = 0;
            loop {
                iter += 1;
                if iter > MAX_ITERATIONS {
                    log::warn!(
                        target: "managed_linalg",
                        "symmetric eigenvalue {l} did not converge after {MAX_ITERATIONS} iterations"
                    );
                    return Err(LinalgError::ConvergenceFailure {
                        iterations: MAX_ITERATIONS,
                    });
                }

                // Compute implicit shift
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (two * e[l]);
                let mut r = p.hypot(one);
                if p < zero {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d[l + 2..n].iter_mut() {
                    *di = *di - h;
                }
                f = f + h;

                // Implicit QL transformation
                p = d[m];
                let mut c = one;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = zero;
                let mut s2 = zero;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    // Accumulate transformation
                    let (cs, sn) = (T::from_real(c), T::from_real(s));
                    for k in 0..n {
                        let qi = q[i * n + k];
                        let qi1 = q[(i + 1) * n + k];
                        q[(i + 1) * n + k] = sn * qi + cs * qi1;
                        q[i * n + k] = cs * qi - sn * qi1;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                // Check for convergence
                if e[l].abs() <= eps * tst1 {
                    break;
                }
            }
        }
        d[l] = d[l] + f;
        e[l] = zero;
    }

    sort_ascending(d, q, n);
    Ok(())
}

/// Selection sort of eigenvalues, permuting eigenvector columns to match.
fn sort_ascending<T: LinalgScalar>(d: &mut [T::Real], q: &mut [T], n: usize) {
    for i in 0..n.saturating_sub(1) {
        let mut k = i;
        let mut p = d[i];
        for (j, &dj) in d.iter().enumerate().take(n).skip(i + 1) {
            if dj < p {
                k = j;
                p = dj;
            }
        }
        if k != i {
            d.swap(i, k);
            for r in 0..n {
                q.swap(i * n + r, k * n + r);
            }
        }
    }
}
