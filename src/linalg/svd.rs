use num_traits::{Float, One, Zero};

use crate::linalg::{check_len, LinalgError};
use crate::traits::LinalgScalar;

/// Iteration budget per singular value.
const MAX_ITERATIONS: usize = 1000;

/// Action chosen for the active block of the bidiagonal.
enum Step {
    /// Trailing diagonal entry is negligible.
    DeflateTrailing,
    /// An interior diagonal entry is negligible.
    Split,
    /// No negligible entries: shifted QR sweep.
    QrSweep,
    /// Trailing superdiagonal entry is negligible.
    Converged,
}

/// Construct a Givens rotation that zeroes `b` against `a`.
///
/// Returns `(c, s)`; on return `a` holds `r` and `b` the reconstruction
/// value `z`.
fn rotg<R: Float>(a: &mut R, b: &mut R) -> (R, R) {
    let abs_a = a.abs();
    let abs_b = b.abs();
    let roe = if abs_a > abs_b { *a } else { *b };
    let scale = abs_a + abs_b;
    if scale.is_zero() {
        *a = R::zero();
        *b = R::zero();
        return (R::one(), R::zero());
    }
    let sa = *a / scale;
    let sb = *b / scale;
    let mut r = scale * (sa * sa + sb * sb).sqrt();
    if roe < R::zero() {
        r = -r;
    }
    let c = *a / r;
    let s = *b / r;
    let mut z = R::one();
    if abs_a > abs_b {
        z = s;
    }
    if abs_b >= abs_a && !c.is_zero() {
        z = R::one() / c;
    }
    *a = r;
    *b = z;
    (c, s)
}

/// Rotate columns `x` and `y` of a column-major matrix with leading
/// dimension `ld`: `x' = c x + s y`, `y' = c y - s x`.
fn rot_columns<T: LinalgScalar>(m: &mut [T], ld: usize, x: usize, y: usize, c: T::Real, s: T::Real) {
    let (c, s) = (T::from_real(c), T::from_real(s));
    for i in 0..ld {
        let xi = m[x * ld + i];
        let yi = m[y * ld + i];
        m[x * ld + i] = c * xi + s * yi;
        m[y * ld + i] = c * yi - s * xi;
    }
}

fn swap_columns<T>(m: &mut [T], ld: usize, x: usize, y: usize) {
    for i in 0..ld {
        m.swap(x * ld + i, y * ld + i);
    }
}

fn set_unit_column<T: LinalgScalar>(m: &mut [T], ld: usize, col: usize) {
    m[col * ld..(col + 1) * ld].fill(T::zero());
    m[col * ld + col] = T::one();
}

/// Euclidean norm of a slice.
fn norm2<T: LinalgScalar>(x: &[T]) -> T::Real {
    x.iter()
        .fold(<T::Real as Zero>::zero(), |s, v| s + v.modulus_sqr())
        .sqrt()
}

/// `|z| * z2 / |z2|`, or `z` unchanged when `z2` is zero.
fn with_phase_of<T: LinalgScalar>(z: T, z2: T) -> T {
    if z2.is_zero() {
        z
    } else {
        T::from_real(z.modulus()) * z2.phase()
    }
}

/// Singular value decomposition `A = U * diag(s) * V^H`.
///
/// `a` is the `rows x cols` input and is destroyed. `s` receives the
/// `min(rows, cols)` singular values in descending order. When
/// `compute_vectors` is set, `u` receives the `rows x rows` left singular
/// vectors and `vt` the `cols x cols` matrix `V^H`; otherwise both are left
/// untouched.
///
/// Fails with [`LinalgError::ConvergenceFailure`] when a singular value does
/// not converge within 1000 QR sweeps.
pub fn singular_value_decomposition<T: LinalgScalar>(
    compute_vectors: bool,
    a: &mut [T],
    rows: usize,
    cols: usize,
    s: &mut [T::Real],
    u: &mut [T],
    vt: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), rows, cols)?;
    check_len("s", s.len(), rows.min(cols), 1)?;
    check_len("u", u.len(), rows, rows)?;
    check_len("vt", vt.len(), cols, cols)?;

    if rows == 0 || cols == 0 {
        if compute_vectors {
            for j in 0..rows {
                set_unit_column(u, rows, j);
            }
            for j in 0..cols {
                set_unit_column(vt, cols, j);
            }
        }
        return Ok(());
    }

    let zero = <T::Real as Zero>::zero();
    let one = <T::Real as One>::one();
    let eps = T::lepsilon();

    // vt holds V until the final conjugate transpose
    let v = vt;
    if compute_vectors {
        v.fill(T::zero());
    }

    let mut work = vec![T::zero(); rows];
    let mut e = vec![T::zero(); cols];
    let mut stemp = vec![T::zero(); (rows + 1).min(cols)];

    // Reduce to bidiagonal form, diagonal in stemp and superdiagonal in e
    let nct = (rows - 1).min(cols);
    let nrt = if cols >= 2 { (cols - 2).min(rows) } else { 0 };
    let lu = nct.max(nrt);

    for l in 0..lu {
        let lp1 = l + 1;
        let lc = l * rows;

        if l < nct {
            // Column transformation, diagonal goes to stemp[l]
            let mut sl = T::from_real(norm2(&a[lc + l..lc + rows]));
            if !sl.is_zero() {
                sl = with_phase_of(sl, a[lc + l]);
                let inv = T::one() / sl;
                for x in a[lc + l..lc + rows].iter_mut() {
                    *x = *x * inv;
                }
                a[lc + l] = T::one() + a[lc + l];
            }
            stemp[l] = T::zero() - sl;
        }

        for j in lp1..cols {
            let jc = j * rows;
            if l < nct && !stemp[l].is_zero() {
                let mut t = T::zero();
                for i in l..rows {
                    t = t + a[lc + i].conj() * a[jc + i];
                }
                t = (T::zero() - t) / a[lc + l];
                for i in l..rows {
                    a[jc + i] = a[jc + i] + t * a[lc + i];
                }
            }
            // Row l of the trailing columns feeds the row transformation
            e[j] = a[jc + l].conj();
        }

        if compute_vectors && l < nct {
            u[lc + l..lc + rows].copy_from_slice(&a[lc + l..lc + rows]);
        }

        if l >= nrt {
            continue;
        }

        // Row transformation, superdiagonal goes to e[l]
        let mut el = T::from_real(norm2(&e[lp1..]));
        if !el.is_zero() {
            el = with_phase_of(el, e[lp1]);
            let inv = T::one() / el;
            for x in e[lp1..].iter_mut() {
                *x = *x * inv;
            }
            e[lp1] = T::one() + e[lp1];
        }
        e[l] = T::zero() - el.conj();

        if lp1 < rows && !e[l].is_zero() {
            work[lp1..].fill(T::zero());
            for j in lp1..cols {
                let ej = e[j];
                let jc = j * rows;
                for i in lp1..rows {
                    work[i] = work[i] + ej * a[jc + i];
                }
            }
            for j in lp1..cols {
                let ww = ((T::zero() - e[j]) / e[lp1]).conj();
                let jc = j * rows;
                for i in lp1..rows {
                    a[jc + i] = a[jc + i] + ww * work[i];
                }
            }
        }

        if compute_vectors {
            v[l * cols + lp1..(l + 1) * cols].copy_from_slice(&e[lp1..]);
        }
    }

    // Final bidiagonal of order m
    let mut m = cols.min(rows + 1);
    if nct < cols {
        stemp[nct] = a[nct * rows + nct];
    }
    if rows < m {
        stemp[m - 1] = T::zero();
    }
    if nrt + 1 < m {
        e[nrt] = a[(m - 1) * rows + nrt];
    }
    e[m - 1] = T::zero();

    if compute_vectors {
        // Generate U
        for j in nct..rows {
            set_unit_column(u, rows, j);
        }
        for l in (0..nct).rev() {
            let lc = l * rows;
            if !stemp[l].is_zero() {
                for j in (l + 1)..rows {
                    let jc = j * rows;
                    let mut t = T::zero();
                    for i in l..rows {
                        t = t + u[lc + i].conj() * u[jc + i];
                    }
                    t = (T::zero() - t) / u[lc + l];
                    for i in l..rows {
                        u[jc + i] = u[jc + i] + t * u[lc + i];
                    }
                }
                for x in u[lc + l..lc + rows].iter_mut() {
                    *x = T::zero() - *x;
                }
                u[lc + l] = T::one() + u[lc + l];
                u[lc..lc + l].fill(T::zero());
            } else {
                set_unit_column(u, rows, l);
            }
        }

        // Generate V
        for l in (0..cols).rev() {
            let lp1 = l + 1;
            let lc = l * cols;
            if l < nrt && !e[l].is_zero() {
                for j in lp1..cols {
                    let jc = j * cols;
                    let mut t = T::zero();
                    for i in lp1..cols {
                        t = t + v[lc + i].conj() * v[jc + i];
                    }
                    t = (T::zero() - t) / v[lc + lp1];
                    for i in lp1..cols {
                        v[jc + i] = v[jc + i] + t * v[lc + i];
                    }
                }
            }
            set_unit_column(v, cols, l);
        }
    }

    // Rotate phases so the bidiagonal is real and non-negative
    for i in 0..m {
        if !stemp[i].is_zero() {
            let t = stemp[i].modulus();
            let r = stemp[i] / T::from_real(t);
            stemp[i] = T::from_real(t);
            if i + 1 < m {
                e[i] = e[i] / r;
            }
            if compute_vectors && i < rows {
                for x in u[i * rows..(i + 1) * rows].iter_mut() {
                    *x = *x * r;
                }
            }
        }
        if i + 1 == m {
            break;
        }
        if !e[i].is_zero() {
            let t = e[i].modulus();
            let r = T::from_real(t) / e[i];
            e[i] = T::from_real(t);
            stemp[i + 1] = stemp[i + 1] * r;
            if compute_vectors {
                for x in v[(i + 1) * cols..(i + 2) * cols].iter_mut() {
                    *x = *x * r;
                }
            }
        }
    }

    let mut sv: Vec<T::Real> = stemp.iter().map(|x| x.re()).collect();
    let mut ev: Vec<T::Real> = e.iter().map(|x| x.re()).collect();

    let negligible = |ztest: T::Real, test: T::Real| ztest - test <= eps * test;

    // Implicit-shift QR on the real bidiagonal
    let mn = m;
    let mut iter = 0;
    while m > 0 {
        if iter >= MAX_ITERATIONS {
            log::warn!(
                target: "managed_linalg",
                "SVD did not converge after {MAX_ITERATIONS} iterations ({m} values pending)"
            );
            return Err(LinalgError::ConvergenceFailure {
                iterations: MAX_ITERATIONS,
            });
        }

        // lo is the first index of the active block: one past the last
        // negligible superdiagonal entry.
        let mut lo = 0;
        for l in (0..m - 1).rev() {
            let test = sv[l].abs() + sv[l + 1].abs();
            let ztest = test + ev[l].abs();
            if negligible(ztest, test) {
                ev[l] = zero;
                lo = l + 1;
                break;
            }
        }

        let mut l = lo;
        let step = if lo == m - 1 {
            Step::Converged
        } else {
            let mut found = None;
            for ls in (lo..m).rev() {
                let mut test = zero;
                if ls != m - 1 {
                    test = test + ev[ls].abs();
                }
                if ls != lo {
                    test = test + ev[ls - 1].abs();
                }
                let ztest = test + sv[ls].abs();
                if negligible(ztest, test) {
                    sv[ls] = zero;
                    found = Some(ls);
                    break;
                }
            }
            match found {
                None => Step::QrSweep,
                Some(ls) if ls == m - 1 => Step::DeflateTrailing,
                Some(ls) => {
                    l = ls + 1;
                    Step::Split
                }
            }
        };

        match step {
            // Deflate negligible sv[m-1]
            Step::DeflateTrailing => {
                let mut f = ev[m - 2];
                ev[m - 2] = zero;
                for k in (l..m - 1).rev() {
                    let mut t1 = sv[k];
                    let (cs, sn) = rotg(&mut t1, &mut f);
                    sv[k] = t1;
                    if k != l {
                        f = -sn * ev[k - 1];
                        ev[k - 1] = cs * ev[k - 1];
                    }
                    if compute_vectors {
                        rot_columns(v, cols, k, m - 1, cs, sn);
                    }
                }
            }
            // Split at negligible sv[l-1]
            Step::Split => {
                let mut f = ev[l - 1];
                ev[l - 1] = zero;
                for k in l..m {
                    let mut t1 = sv[k];
                    let (cs, sn) = rotg(&mut t1, &mut f);
                    sv[k] = t1;
                    f = -sn * ev[k];
                    ev[k] = cs * ev[k];
                    if compute_vectors && k < rows {
                        rot_columns(u, rows, k, l - 1, cs, sn);
                    }
                }
            }
            // One QR sweep with a shift from the trailing 2x2
            Step::QrSweep => {
                let scale = sv[m - 1]
                    .abs()
                    .max(sv[m - 2].abs())
                    .max(ev[m - 2].abs())
                    .max(sv[l].abs())
                    .max(ev[l].abs());
                let sm = sv[m - 1] / scale;
                let smm1 = sv[m - 2] / scale;
                let emm1 = ev[m - 2] / scale;
                let sl = sv[l] / scale;
                let el = ev[l] / scale;
                let two = one + one;
                let b = ((smm1 + sm) * (smm1 - sm) + emm1 * emm1) / two;
                let c = (sm * emm1) * (sm * emm1);
                let mut shift = zero;
                if !b.is_zero() || !c.is_zero() {
                    shift = (b * b + c).sqrt();
                    if b < zero {
                        shift = -shift;
                    }
                    shift = c / (b + shift);
                }
                let mut f = (sl + sm) * (sl - sm) + shift;
                let mut g = sl * el;

                // Chase the bulge
                for k in l..m - 1 {
                    let (cs, sn) = rotg(&mut f, &mut g);
                    if k != l {
                        ev[k - 1] = f;
                    }
                    f = cs * sv[k] + sn * ev[k];
                    ev[k] = cs * ev[k] - sn * sv[k];
                    g = sn * sv[k + 1];
                    sv[k + 1] = cs * sv[k + 1];
                    if compute_vectors {
                        rot_columns(v, cols, k, k + 1, cs, sn);
                    }

                    let (cs, sn) = rotg(&mut f, &mut g);
                    sv[k] = f;
                    f = cs * ev[k] + sn * sv[k + 1];
                    sv[k + 1] = -sn * ev[k] + cs * sv[k + 1];
                    g = sn * ev[k + 1];
                    ev[k + 1] = cs * ev[k + 1];
                    if compute_vectors && k + 1 < rows {
                        rot_columns(u, rows, k, k + 1, cs, sn);
                    }
                }
                ev[m - 2] = f;
                iter += 1;
            }
            Step::Converged => {
                if sv[l] < zero {
                    sv[l] = -sv[l];
                    if compute_vectors {
                        for x in v[l * cols..(l + 1) * cols].iter_mut() {
                            *x = T::zero() - *x;
                        }
                    }
                }

                // Bubble into descending order
                while l + 1 < mn && sv[l] < sv[l + 1] {
                    sv.swap(l, l + 1);
                    if compute_vectors {
                        if l + 1 < cols {
                            swap_columns(v, cols, l, l + 1);
                        }
                        if l + 1 < rows {
                            swap_columns(u, rows, l, l + 1);
                        }
                    }
                    l += 1;
                }
                iter = 0;
                m -= 1;
            }
        }
    }

    if compute_vectors {
        // vt = V^H in place
        for j in 0..cols {
            v[j * cols + j] = v[j * cols + j].conj();
            for i in (j + 1)..cols {
                let upper = v[i * cols + j];
                v[i * cols + j] = v[j * cols + i].conj();
                v[j * cols + i] = upper.conj();
            }
        }
    }

    let k = rows.min(cols);
    s.copy_from_slice(&sv[..k]);
    Ok(())
}

/// Solve `A X = B` in the least-squares sense from an existing SVD:
/// `X = V * diag(1/s) * U^H * B`.
///
/// `b` is `rows x columns_b` and `x` receives the `cols x columns_b`
/// solution. Slots `j >= min(rows, cols)` contribute zero.
#[allow(clippy::too_many_arguments)]
pub fn svd_solve_factored<T: LinalgScalar>(
    rows: usize,
    cols: usize,
    s: &[T::Real],
    u: &[T],
    vt: &[T],
    b: &[T],
    columns_b: usize,
    x: &mut [T],
) -> Result<(), LinalgError> {
    let mn = rows.min(cols);
    check_len("s", s.len(), mn, 1)?;
    check_len("u", u.len(), rows, rows)?;
    check_len("vt", vt.len(), cols, cols)?;
    check_len("b", b.len(), rows, columns_b)?;
    check_len("x", x.len(), cols, columns_b)?;
    if cols == 0 {
        return Ok(());
    }
    if rows == 0 {
        x.fill(T::zero());
        return Ok(());
    }

    let mut tmp = vec![T::zero(); cols];
    for (bc, xc) in b.chunks_exact(rows).zip(x.chunks_exact_mut(cols)) {
        for (j, t) in tmp.iter_mut().enumerate() {
            *t = if j < mn {
                let uj = &u[j * rows..(j + 1) * rows];
                let mut sum = T::zero();
                for (&uij, &bi) in uj.iter().zip(bc) {
                    sum = sum + uij.conj() * bi;
                }
                sum / T::from_real(s[j])
            } else {
                T::zero()
            };
        }

        for (j, xj) in xc.iter_mut().enumerate() {
            let vj = &vt[j * cols..(j + 1) * cols];
            let mut sum = T::zero();
            for (&vji, &ti) in vj.iter().zip(&tmp) {
                sum = sum + vji.conj() * ti;
            }
            *xj = sum;
        }
    }
    Ok(())
}

/// Solve `A X = B` in the least-squares sense, decomposing a scratch copy
/// of `a`.
pub fn svd_solve<T: LinalgScalar>(
    a: &[T],
    rows: usize,
    cols: usize,
    b: &[T],
    columns_b: usize,
    x: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), rows, cols)?;
    check_len("b", b.len(), rows, columns_b)?;
    check_len("x", x.len(), cols, columns_b)?;

    let mut work = a.to_vec();
    let mut s = vec![<T::Real as Zero>::zero(); rows.min(cols)];
    let mut u = vec![T::zero(); rows * rows];
    let mut vt = vec![T::zero(); cols * cols];
    singular_value_decomposition(true, &mut work, rows, cols, &mut s, &mut u, &mut vt)?;
    svd_solve_factored(rows, cols, &s, &u, &vt, b, columns_b, x)
}
