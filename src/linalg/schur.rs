use num_complex::Complex;
use num_traits::{Float, One, Zero};

use crate::linalg::{check_len, LinalgError};
use crate::traits::{FloatScalar, LinalgScalar};

/// Sweeps allowed per matrix order before the Schur iteration gives up.
const SWEEPS_PER_ORDER: usize = 30;

#[inline]
fn lit<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

/// Smith's complex division `(xr + i xi) / (yr + i yi)`.
#[inline]
fn cdiv<T: Float>(xr: T, xi: T, yr: T, yi: T) -> (T, T) {
    if yr.abs() > yi.abs() {
        let r = yi / yr;
        let d = yr + r * yi;
        ((xr + r * xi) / d, (xi - r * xr) / d)
    } else {
        let r = yr / yi;
        let d = yi + r * yr;
        ((r * xr + xi) / d, (r * xi - xr) / d)
    }
}

fn convergence_failure(n: usize, pending: usize) -> LinalgError {
    let iterations = SWEEPS_PER_ORDER * n;
    log::warn!(
        target: "managed_linalg",
        "Schur iteration did not converge after {iterations} sweeps ({pending} eigenvalues pending)"
    );
    LinalgError::ConvergenceFailure { iterations }
}

/// Francis double-shift QR on a real upper Hessenberg matrix, followed by
/// eigenvector recovery.
///
/// `h` is the `n x n` Hessenberg matrix and `v` the transform from the
/// Hessenberg reduction. On return `d[i] + i e[i]` are the eigenvalues
/// (complex-conjugate pairs adjacent, positive imaginary part first) and `v`
/// holds the eigenvectors: a real eigenvalue owns one real column, a pair
/// `(i, i+1)` stores the real part of its vector in column `i` and the
/// imaginary part in column `i+1`. `h` is destroyed.
///
/// Exceptional shifts are taken at the 10th and 30th sweep spent on one
/// root; more than `30 * n` sweeps in total fail with
/// [`LinalgError::ConvergenceFailure`].
pub fn hessenberg_to_real_schur<T: FloatScalar>(
    h: &mut [T],
    v: &mut [T],
    order: usize,
    d: &mut [T],
    e: &mut [T],
) -> Result<(), LinalgError> {
    check_len("h", h.len(), order, order)?;
    check_len("v", v.len(), order, order)?;
    check_len("d", d.len(), order, 1)?;
    check_len("e", e.len(), order, 1)?;
    let nn = order;
    let ix = |i: usize, j: usize| j * nn + i;

    let zero = T::zero();
    let one = T::one();
    let two = one + one;
    let eps = T::epsilon();
    let mut exshift = zero;
    let (mut r, mut s, mut z) = (zero, zero, zero);
    let mut p: T;
    let mut q: T;
    let mut w: T;
    let mut x: T;
    let mut y: T;

    // Matrix norm for the small-element tests
    let mut norm = zero;
    for j in 0..nn {
        for i in 0..(j + 2).min(nn) {
            norm = norm + h[ix(i, j)].abs();
        }
    }

    // Outer loop over eigenvalue index; `end - 1` is the active last row
    let mut end = nn;
    let mut iter = 0;
    let mut total = 0;
    while end > 0 {
        let n = end - 1;

        // Look for single small sub-diagonal element
        let mut l = n;
        while l > 0 {
            s = h[ix(l - 1, l - 1)].abs() + h[ix(l, l)].abs();
            if s.is_zero() {
                s = norm;
            }
            if h[ix(l, l - 1)].abs() < eps * s {
                break;
            }
            l -= 1;
        }

        if l == n {
            // One root found
            h[ix(n, n)] = h[ix(n, n)] + exshift;
            d[n] = h[ix(n, n)];
            e[n] = zero;
            end -= 1;
            iter = 0;
        } else if l + 1 == n {
            // Two roots found
            w = h[ix(n, n - 1)] * h[ix(n - 1, n)];
            p = (h[ix(n - 1, n - 1)] - h[ix(n, n)]) / two;
            q = p * p + w;
            z = q.abs().sqrt();
            h[ix(n, n)] = h[ix(n, n)] + exshift;
            h[ix(n - 1, n - 1)] = h[ix(n - 1, n - 1)] + exshift;
            x = h[ix(n, n)];

            if q >= zero {
                // Real pair
                z = if p >= zero { p + z } else { p - z };
                d[n - 1] = x + z;
                d[n] = d[n - 1];
                if !z.is_zero() {
                    d[n] = x - w / z;
                }
                e[n - 1] = zero;
                e[n] = zero;
                x = h[ix(n, n - 1)];
                s = x.abs() + z.abs();
                p = x / s;
                q = z / s;
                r = (p * p + q * q).sqrt();
                p = p / r;
                q = q / r;

                // Row modification
                for j in (n - 1)..nn {
                    z = h[ix(n - 1, j)];
                    h[ix(n - 1, j)] = q * z + p * h[ix(n, j)];
                    h[ix(n, j)] = q * h[ix(n, j)] - p * z;
                }
                // Column modification
                for i in 0..=n {
                    z = h[ix(i, n - 1)];
                    h[ix(i, n - 1)] = q * z + p * h[ix(i, n)];
                    h[ix(i, n)] = q * h[ix(i, n)] - p * z;
                }
                // Accumulate transformations
                for i in 0..nn {
                    z = v[ix(i, n - 1)];
                    v[ix(i, n - 1)] = q * z + p * v[ix(i, n)];
                    v[ix(i, n)] = q * v[ix(i, n)] - p * z;
                }
            } else {
                // Complex pair
                d[n - 1] = x + p;
                d[n] = x + p;
                e[n - 1] = z;
                e[n] = -z;
            }
            end -= 2;
            iter = 0;
        } else {
            // No convergence yet
            total += 1;
            if total > SWEEPS_PER_ORDER * nn {
                return Err(convergence_failure(nn, end));
            }

            // Form shift
            x = h[ix(n, n)];
            y = h[ix(n - 1, n - 1)];
            w = h[ix(n, n - 1)] * h[ix(n - 1, n)];

            // Wilkinson's ad hoc shift
            if iter == 10 {
                exshift = exshift + x;
                for i in 0..=n {
                    h[ix(i, i)] = h[ix(i, i)] - x;
                }
                s = h[ix(n, n - 1)].abs() + h[ix(n - 1, n - 2)].abs();
                x = lit::<T>(0.75) * s;
                y = x;
                w = lit::<T>(-0.4375) * s * s;
            }

            // MATLAB's ad hoc shift
            if iter == 30 {
                s = (y - x) / two;
                s = s * s + w;
                if s > zero {
                    s = s.sqrt();
                    if y < x {
                        s = -s;
                    }
                    s = x - w / ((y - x) / two + s);
                    for i in 0..=n {
                        h[ix(i, i)] = h[ix(i, i)] - s;
                    }
                    exshift = exshift + s;
                    x = lit::<T>(0.964);
                    y = x;
                    w = x;
                }
            }

            iter += 1;

            // Look for two consecutive small sub-diagonal elements
            let mut m = n - 2;
            loop {
                z = h[ix(m, m)];
                r = x - z;
                s = y - z;
                p = (r * s - w) / h[ix(m + 1, m)] + h[ix(m, m + 1)];
                q = h[ix(m + 1, m + 1)] - z - r - s;
                r = h[ix(m + 2, m + 1)];
                s = p.abs() + q.abs() + r.abs();
                p = p / s;
                q = q / s;
                r = r / s;
                if m == l {
                    break;
                }
                let lhs = h[ix(m, m - 1)].abs() * (q.abs() + r.abs());
                let rhs = eps
                    * (p.abs()
                        * (h[ix(m - 1, m - 1)].abs() + z.abs() + h[ix(m + 1, m + 1)].abs()));
                if lhs < rhs {
                    break;
                }
                m -= 1;
            }

            for i in (m + 2)..=n {
                h[ix(i, i - 2)] = zero;
                if i > m + 2 {
                    h[ix(i, i - 3)] = zero;
                }
            }

            // Double QR step involving rows l..=n and columns m..=n
            for k in m..n {
                let notlast = k != n - 1;
                if k != m {
                    p = h[ix(k, k - 1)];
                    q = h[ix(k + 1, k - 1)];
                    r = if notlast { h[ix(k + 2, k - 1)] } else { zero };
                    x = p.abs() + q.abs() + r.abs();
                    if !x.is_zero() {
                        p = p / x;
                        q = q / x;
                        r = r / x;
                    }
                }
                if x.is_zero() {
                    break;
                }

                s = (p * p + q * q + r * r).sqrt();
                if p < zero {
                    s = -s;
                }
                if s.is_zero() {
                    continue;
                }

                if k != m {
                    h[ix(k, k - 1)] = -s * x;
                } else if l != m {
                    h[ix(k, k - 1)] = -h[ix(k, k - 1)];
                }

                p = p + s;
                x = p / s;
                y = q / s;
                z = r / s;
                q = q / p;
                r = r / p;

                // Row modification
                for j in k..nn {
                    p = h[ix(k, j)] + q * h[ix(k + 1, j)];
                    if notlast {
                        p = p + r * h[ix(k + 2, j)];
                        h[ix(k + 2, j)] = h[ix(k + 2, j)] - p * z;
                    }
                    h[ix(k, j)] = h[ix(k, j)] - p * x;
                    h[ix(k + 1, j)] = h[ix(k + 1, j)] - p * y;
                }

                // Column modification
                for i in 0..=n.min(k + 3) {
                    p = x * h[ix(i, k)] + y * h[ix(i, k + 1)];
                    if notlast {
                        p = p + z * h[ix(i, k + 2)];
                        h[ix(i, k + 2)] = h[ix(i, k + 2)] - p * r;
                    }
                    h[ix(i, k)] = h[ix(i, k)] - p;
                    h[ix(i, k + 1)] = h[ix(i, k + 1)] - p * q;
                }

                // Accumulate transformations
                for i in 0..nn {
                    p = x * v[ix(i, k)] + y * v[ix(i, k + 1)];
                    if notlast {
                        p = p + z * v[ix(i, k + 2)];
                        v[ix(i, k + 2)] = v[ix(i, k + 2)] - p * r;
                    }
                    v[ix(i, k)] = v[ix(i, k)] - p;
                    v[ix(i, k + 1)] = v[ix(i, k + 1)] - p * q;
                }
            }
        }
    }

    if norm.is_zero() {
        return Ok(());
    }

    // Backsubstitute to find vectors of upper triangular form
    for n in (0..nn).rev() {
        p = d[n];
        q = e[n];

        if q.is_zero() {
            // Real vector
            let mut l = n;
            h[ix(n, n)] = one;
            for i in (0..n).rev() {
                w = h[ix(i, i)] - p;
                r = zero;
                for j in l..=n {
                    r = r + h[ix(i, j)] * h[ix(j, n)];
                }
                if e[i] < zero {
                    z = w;
                    s = r;
                    continue;
                }
                l = i;
                if e[i].is_zero() {
                    h[ix(i, n)] = if !w.is_zero() { -r / w } else { -r / (eps * norm) };
                } else {
                    // Solve real equations
                    x = h[ix(i, i + 1)];
                    y = h[ix(i + 1, i)];
                    q = (d[i] - p) * (d[i] - p) + e[i] * e[i];
                    let t = (x * s - z * r) / q;
                    h[ix(i, n)] = t;
                    h[ix(i + 1, n)] = if x.abs() > z.abs() {
                        (-r - w * t) / x
                    } else {
                        (-s - y * t) / z
                    };
                }

                // Overflow control
                let t = h[ix(i, n)].abs();
                if (eps * t) * t > one {
                    for j in i..=n {
                        h[ix(j, n)] = h[ix(j, n)] / t;
                    }
                }
            }
        } else if q < zero {
            // Complex vector, stored in columns n-1 (real) and n (imaginary)
            let mut l = n - 1;

            // Last vector component imaginary so matrix is triangular
            if h[ix(n, n - 1)].abs() > h[ix(n - 1, n)].abs() {
                h[ix(n - 1, n - 1)] = q / h[ix(n, n - 1)];
                h[ix(n - 1, n)] = -(h[ix(n, n)] - p) / h[ix(n, n - 1)];
            } else {
                let (cr, ci) = cdiv(zero, -h[ix(n - 1, n)], h[ix(n - 1, n - 1)] - p, q);
                h[ix(n - 1, n - 1)] = cr;
                h[ix(n - 1, n)] = ci;
            }
            h[ix(n, n - 1)] = zero;
            h[ix(n, n)] = one;

            for i in (0..n - 1).rev() {
                let mut ra = zero;
                let mut sa = zero;
                for j in l..=n {
                    ra = ra + h[ix(i, j)] * h[ix(j, n - 1)];
                    sa = sa + h[ix(i, j)] * h[ix(j, n)];
                }
                w = h[ix(i, i)] - p;

                if e[i] < zero {
                    z = w;
                    r = ra;
                    s = sa;
                    continue;
                }
                l = i;
                if e[i].is_zero() {
                    let (cr, ci) = cdiv(-ra, -sa, w, q);
                    h[ix(i, n - 1)] = cr;
                    h[ix(i, n)] = ci;
                } else {
                    // Solve complex equations
                    x = h[ix(i, i + 1)];
                    y = h[ix(i + 1, i)];
                    let mut vr = (d[i] - p) * (d[i] - p) + e[i] * e[i] - q * q;
                    let vi = (d[i] - p) * two * q;
                    if vr.is_zero() && vi.is_zero() {
                        vr = eps * norm * (w.abs() + q.abs() + x.abs() + y.abs() + z.abs());
                    }
                    let (cr, ci) = cdiv(
                        x * r - z * ra + q * sa,
                        x * s - z * sa - q * ra,
                        vr,
                        vi,
                    );
                    h[ix(i, n - 1)] = cr;
                    h[ix(i, n)] = ci;
                    if x.abs() > z.abs() + q.abs() {
                        h[ix(i + 1, n - 1)] = (-ra - w * h[ix(i, n - 1)] + q * h[ix(i, n)]) / x;
                        h[ix(i + 1, n)] = (-sa - w * h[ix(i, n)] - q * h[ix(i, n - 1)]) / x;
                    } else {
                        let (cr, ci) = cdiv(
                            -r - y * h[ix(i, n - 1)],
                            -s - y * h[ix(i, n)],
                            z,
                            q,
                        );
                        h[ix(i + 1, n - 1)] = cr;
                        h[ix(i + 1, n)] = ci;
                    }
                }

                // Overflow control
                let t = h[ix(i, n - 1)].abs().max(h[ix(i, n)].abs());
                if (eps * t) * t > one {
                    for j in i..=n {
                        h[ix(j, n - 1)] = h[ix(j, n - 1)] / t;
                        h[ix(j, n)] = h[ix(j, n)] / t;
                    }
                }
            }
        }
    }

    // Back transformation to get eigenvectors of the original matrix
    for j in (0..nn).rev() {
        for i in 0..nn {
            let mut acc = zero;
            for k in 0..=j {
                acc = acc + v[ix(i, k)] * h[ix(k, j)];
            }
            v[ix(i, j)] = acc;
        }
    }

    Ok(())
}

/// Complex Givens rotation `G = [[c, s], [-conj(s), c]]` with real `c` such
/// that `G [a; b] = [r; 0]`.
#[inline]
fn complex_givens<T: FloatScalar>(a: Complex<T>, b: Complex<T>) -> (T, Complex<T>) {
    let abs_a = a.norm();
    let abs_b = b.norm();
    let norm = abs_a.hypot(abs_b);
    if norm.is_zero() {
        return (T::one(), Complex::zero());
    }
    if abs_a.is_zero() {
        return (T::zero(), Complex::one());
    }
    let c = abs_a / norm;
    let s = (a / abs_a) * b.conj() / norm;
    (c, s)
}

/// Single-shift QR on a complex upper Hessenberg matrix.
///
/// `h` is reduced in place to upper triangular Schur form `T` and the unitary
/// transforms are accumulated into `q`, which holds the Hessenberg transform
/// on entry, so that `A = Q T Q^H` on return.
///
/// Uses the same exceptional-shift schedule and sweep budget as
/// [`hessenberg_to_real_schur`].
pub fn hessenberg_to_complex_schur<T: FloatScalar>(
    h: &mut [Complex<T>],
    q: &mut [Complex<T>],
    order: usize,
) -> Result<(), LinalgError> {
    check_len("h", h.len(), order, order)?;
    check_len("q", q.len(), order, order)?;
    let nn = order;
    let ix = |i: usize, j: usize| j * nn + i;

    let eps = T::epsilon();
    let two = T::one() + T::one();
    let mut norm = T::zero();
    for j in 0..nn {
        for i in 0..(j + 2).min(nn) {
            norm = norm + h[ix(i, j)].norm();
        }
    }

    let mut rotations: Vec<(T, Complex<T>)> = Vec::with_capacity(nn);
    let mut end = nn;
    let mut iter = 0;
    let mut total = 0;
    while end > 0 {
        let n = end - 1;

        let mut l = n;
        while l > 0 {
            let mut s = h[ix(l - 1, l - 1)].norm() + h[ix(l, l)].norm();
            if s.is_zero() {
                s = norm;
            }
            if h[ix(l, l - 1)].norm() < eps * s {
                h[ix(l, l - 1)] = Complex::zero();
                break;
            }
            l -= 1;
        }

        if l == n {
            end -= 1;
            iter = 0;
            continue;
        }

        total += 1;
        if total > SWEEPS_PER_ORDER * nn {
            return Err(convergence_failure(nn, end));
        }

        let shift = if iter == 10 || iter == 30 {
            let mut s = h[ix(n, n - 1)].re.abs();
            if n >= 2 {
                s = s + h[ix(n - 1, n - 2)].re.abs();
            }
            h[ix(n, n)] + Complex::<T>::from_real(s)
        } else {
            // Eigenvalue of the trailing 2x2 closest to its last diagonal entry
            let a = h[ix(n - 1, n - 1)];
            let b = h[ix(n - 1, n)];
            let c = h[ix(n, n - 1)];
            let dd = h[ix(n, n)];
            let half = (a - dd) / Complex::<T>::from_real(two);
            let disc = (half * half + b * c).lsqrt();
            let mid = (a + dd) / Complex::<T>::from_real(two);
            let mu1 = mid + disc;
            let mu2 = mid - disc;
            if (mu1 - dd).norm() <= (mu2 - dd).norm() {
                mu1
            } else {
                mu2
            }
        };
        iter += 1;

        for i in l..=n {
            h[ix(i, i)] = h[ix(i, i)] - shift;
        }

        // H - mu I = G^H R: left rotations over the active block
        rotations.clear();
        for k in l..n {
            let (c, s) = complex_givens(h[ix(k, k)], h[ix(k + 1, k)]);
            let cc = Complex::<T>::from_real(c);
            for j in k..nn {
                let x = h[ix(k, j)];
                let y = h[ix(k + 1, j)];
                h[ix(k, j)] = cc * x + s * y;
                h[ix(k + 1, j)] = cc * y - s.conj() * x;
            }
            h[ix(k + 1, k)] = Complex::zero();
            rotations.push((c, s));
        }

        // R G^H, accumulated into Q as well
        for (offset, &(c, s)) in rotations.iter().enumerate() {
            let k = l + offset;
            let cc = Complex::<T>::from_real(c);
            let sc = s.conj();
            for i in 0..=(k + 1) {
                let x = h[ix(i, k)];
                let y = h[ix(i, k + 1)];
                h[ix(i, k)] = cc * x + sc * y;
                h[ix(i, k + 1)] = cc * y - s * x;
            }
            for i in 0..nn {
                let x = q[ix(i, k)];
                let y = q[ix(i, k + 1)];
                q[ix(i, k)] = cc * x + sc * y;
                q[ix(i, k + 1)] = cc * y - s * x;
            }
        }

        for i in l..=n {
            h[ix(i, i)] = h[ix(i, i)] + shift;
        }
    }

    Ok(())
}

/// Eigenvectors from a complex Schur form `A = Q T Q^H`.
///
/// Solves `(T - t_kk I) x = 0` with `x_k = 1` by back-substitution for each
/// `k`, maps `x` through Q and normalises to unit length.
pub fn complex_schur_eigenvectors<T: FloatScalar>(
    t: &[Complex<T>],
    q: &[Complex<T>],
    order: usize,
    vectors: &mut [Complex<T>],
) -> Result<(), LinalgError> {
    check_len("t", t.len(), order, order)?;
    check_len("q", q.len(), order, order)?;
    check_len("vectors", vectors.len(), order, order)?;
    let nn = order;
    let ix = |i: usize, j: usize| j * nn + i;

    let mut norm = T::zero();
    for j in 0..nn {
        for i in 0..=j {
            norm = norm + t[ix(i, j)].norm();
        }
    }
    let tiny = if norm.is_zero() {
        T::one()
    } else {
        T::epsilon() * norm
    };

    let mut x = vec![Complex::<T>::zero(); nn];
    for k in 0..nn {
        x.fill(Complex::zero());
        x[k] = Complex::one();
        let lambda = t[ix(k, k)];
        for i in (0..k).rev() {
            let mut sum: Complex<T> = Complex::zero();
            for j in (i + 1)..=k {
                sum = sum + t[ix(i, j)] * x[j];
            }
            let mut denom = t[ix(i, i)] - lambda;
            if denom.norm() == T::zero() {
                denom = Complex::<T>::from_real(tiny);
            }
            x[i] = -sum / denom;
        }

        let col = &mut vectors[k * nn..(k + 1) * nn];
        for (row, out) in col.iter_mut().enumerate() {
            let mut acc: Complex<T> = Complex::zero();
            for j in 0..=k {
                acc = acc + q[ix(row, j)] * x[j];
            }
            *out = acc;
        }

        let len = col.iter().fold(T::zero(), |s, v| s + v.norm_sqr()).sqrt();
        if len > T::zero() {
            let inv = Complex::<T>::from_real(T::one() / len);
            for v in col.iter_mut() {
                *v = *v * inv;
            }
        }
    }
    Ok(())
}
