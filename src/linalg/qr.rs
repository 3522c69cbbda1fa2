use num_traits::{Float, One, Zero};

use crate::linalg::{check_len, LinalgError};
use crate::parallel::{degree, join, ParallelConfig, Parallelism};
use crate::traits::LinalgScalar;

/// Shape of the orthogonal factor produced by the QR routines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum QrMethod {
    /// `rows x rows` Q and `rows x cols` R.
    #[default]
    Full,
    /// `rows x cols` Q and `cols x cols` R.
    Thin,
}

fn check_tau<T>(tau: &[T], expected: usize) -> Result<(), LinalgError> {
    if tau.len() != expected {
        return Err(LinalgError::DimensionMismatch {
            name: "tau",
            expected,
            actual: tau.len(),
        });
    }
    Ok(())
}

/// Build the Householder vector for column `col` of `a`, starting at row `col`.
///
/// The column below the diagonal is moved into `u` (length `rows - col`) and
/// zeroed in `a`; the diagonal receives `-sigma` where `sigma` carries the
/// phase of the leading entry. `u` is scaled so that `H = I - u u^H` with
/// `||u||^2 = 2`. Returns `tau` such that `H = I - tau v v^H`, `v[0] = 1`.
fn generate_column<T: LinalgScalar>(u: &mut [T], a: &mut [T], rows: usize, col: usize) -> T {
    let start = col * rows + col;
    let column = &mut a[start..(col + 1) * rows];
    u.copy_from_slice(column);
    column.fill(T::zero());

    let norm = u
        .iter()
        .fold(<T::Real as Zero>::zero(), |s, v| s + v.modulus_sqr())
        .sqrt();

    if col == rows - 1 || norm.is_zero() {
        a[start] = T::zero() - u[0];
        let two = <T::Real as One>::one() + <T::Real as One>::one();
        u[0] = T::from_real(two.sqrt());
        return T::from_real(two);
    }

    let sigma = u[0].phase() * T::from_real(norm);
    a[start] = T::zero() - sigma;

    let inv_sigma = T::one() / sigma;
    for v in u.iter_mut() {
        *v = *v * inv_sigma;
    }
    // u[0] = 1 + |x0| / norm is real and at least one
    u[0] = u[0] + T::one();
    let tau = u[0];
    let s = T::from_real((<T::Real as One>::one() / u[0].re()).sqrt());
    for v in u.iter_mut() {
        *v = *v * s;
    }
    tau
}

/// Apply `H = I - u u^H` to rows `row_start..` of every column in `columns`.
///
/// `columns` holds whole columns of height `rows`. Column ranges are halved
/// recursively while workers remain and the range is wide enough.
fn apply_reflector<T: LinalgScalar>(
    u: &[T],
    row_start: usize,
    columns: &mut [T],
    rows: usize,
    config: &ParallelConfig,
    parallelism: Parallelism,
) {
    let count = columns.len() / rows;
    if degree(parallelism) > 1 && count > config.parallelize_elements {
        let (left, right) = columns.split_at_mut((count / 2) * rows);
        join(
            |par| apply_reflector(u, row_start, left, rows, config, par),
            |par| apply_reflector(u, row_start, right, rows, config, par),
            parallelism,
        );
        return;
    }

    for column in columns.chunks_exact_mut(rows) {
        let tail = &mut column[row_start..];
        let mut scale = T::zero();
        for (&ui, &x) in u.iter().zip(tail.iter()) {
            scale = scale + ui.conj() * x;
        }
        if scale.is_zero() {
            continue;
        }
        for (x, &ui) in tail.iter_mut().zip(u) {
            *x = *x - ui * scale;
        }
    }
}

/// Reduce `a` (`rows x cols`) to upper trapezoidal form, storing reflector `i`
/// in `reflectors[i * rows..][..rows - i]`.
fn householder_reduce<T: LinalgScalar>(
    a: &mut [T],
    rows: usize,
    cols: usize,
    reflectors: &mut [T],
    tau: &mut [T],
    config: &ParallelConfig,
) {
    let minmn = rows.min(cols);
    for i in 0..minmn {
        let u = &mut reflectors[i * rows..i * rows + rows - i];
        tau[i] = generate_column(u, a, rows, i);
        let u = &reflectors[i * rows..i * rows + rows - i];
        apply_reflector(u, i, &mut a[(i + 1) * rows..], rows, config, config.parallelism);
    }
}

/// Multiply the identity-seeded `q` (`rows x q_cols`) by the stored
/// reflectors in reverse order.
fn accumulate_q<T: LinalgScalar>(
    q: &mut [T],
    rows: usize,
    q_cols: usize,
    reflectors: &[T],
    minmn: usize,
    config: &ParallelConfig,
) {
    q.fill(T::zero());
    for i in 0..q_cols.min(rows) {
        q[i * rows + i] = T::one();
    }
    for i in (0..minmn).rev() {
        let u = &reflectors[i * rows..i * rows + rows - i];
        apply_reflector(u, i, &mut q[i * rows..], rows, config, config.parallelism);
    }
}

/// Full Householder QR decomposition.
///
/// On entry `r` is the `rows x cols` matrix A. On return `r` holds R (zero
/// below the diagonal), `q` the `rows x rows` unitary Q and `tau[i]` the
/// scalar of reflector `i` (`H_i = I - tau_i v_i v_i^H`, `v_i[0] = 1`).
pub fn qr_factor<T: LinalgScalar>(
    r: &mut [T],
    rows: usize,
    cols: usize,
    q: &mut [T],
    tau: &mut [T],
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    check_len("r", r.len(), rows, cols)?;
    check_len("q", q.len(), rows, rows)?;
    let minmn = rows.min(cols);
    check_tau(tau, minmn)?;
    config.validate()?;

    let mut reflectors = vec![T::zero(); rows * minmn];
    householder_reduce(r, rows, cols, &mut reflectors, tau, config);
    accumulate_q(q, rows, rows, &reflectors, minmn, config);
    Ok(())
}

/// Thin Householder QR decomposition. Requires `rows >= cols`.
///
/// On entry `a` is the `rows x cols` matrix A. On return `a` holds the
/// `rows x cols` Q with orthonormal columns and `r` the `cols x cols` R.
pub fn thin_qr_factor<T: LinalgScalar>(
    a: &mut [T],
    rows: usize,
    cols: usize,
    r: &mut [T],
    tau: &mut [T],
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    if rows < cols {
        return Err(LinalgError::RowsLessThanColumns {
            rows,
            columns: cols,
        });
    }
    check_len("a", a.len(), rows, cols)?;
    check_len("r", r.len(), cols, cols)?;
    check_tau(tau, cols)?;
    config.validate()?;

    let mut reflectors = vec![T::zero(); rows * cols];
    householder_reduce(a, rows, cols, &mut reflectors, tau, config);

    r.fill(T::zero());
    for j in 0..cols {
        r[j * cols..j * cols + j + 1].copy_from_slice(&a[j * rows..j * rows + j + 1]);
    }

    accumulate_q(a, rows, cols, &reflectors, cols, config);
    Ok(())
}

/// Solve the least-squares problem `min ||A X - B||` from factors produced
/// by [`qr_factor`] (`method == Full`) or [`thin_qr_factor`] (`Thin`).
///
/// `b` is `rows x columns_b`, `x` receives the `cols x columns_b` solution.
#[allow(clippy::too_many_arguments)]
pub fn qr_solve_factored<T: LinalgScalar>(
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
    if rows < cols {
        return Err(LinalgError::RowsLessThanColumns {
            rows,
            columns: cols,
        });
    }
    let r_rows = match method {
        QrMethod::Full => {
            check_len("q", q.len(), rows, rows)?;
            check_len("r", r.len(), rows, cols)?;
            rows
        }
        QrMethod::Thin => {
            check_len("q", q.len(), rows, cols)?;
            check_len("r", r.len(), cols, cols)?;
            cols
        }
    };
    check_tau(tau, cols)?;
    check_len("b", b.len(), rows, columns_b)?;
    check_len("x", x.len(), cols, columns_b)?;
    if cols == 0 {
        return Ok(());
    }

    for (bc, xc) in b.chunks_exact(rows).zip(x.chunks_exact_mut(cols)) {
        // y = Q^H b, leading cols entries only
        for (i, y) in xc.iter_mut().enumerate() {
            let qi = &q[i * rows..(i + 1) * rows];
            let mut sum = T::zero();
            for (&qk, &bk) in qi.iter().zip(bc) {
                sum = sum + qk.conj() * bk;
            }
            *y = sum;
        }

        // Back substitution with R
        for k in (0..cols).rev() {
            xc[k] = xc[k] / r[k * r_rows + k];
            let xk = xc[k];
            for i in 0..k {
                xc[i] = xc[i] - xk * r[k * r_rows + i];
            }
        }
    }
    Ok(())
}

/// Solve `min ||A X - B||` by factoring a scratch copy of `a`.
#[allow(clippy::too_many_arguments)]
pub fn qr_solve<T: LinalgScalar>(
    a: &[T],
    rows: usize,
    cols: usize,
    b: &[T],
    columns_b: usize,
    x: &mut [T],
    method: QrMethod,
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    if rows < cols {
        return Err(LinalgError::RowsLessThanColumns {
            rows,
            columns: cols,
        });
    }
    check_len("a", a.len(), rows, cols)?;
    check_len("b", b.len(), rows, columns_b)?;
    check_len("x", x.len(), cols, columns_b)?;

    let mut tau = vec![T::zero(); cols];
    match method {
        QrMethod::Full => {
            let mut r = a.to_vec();
            let mut q = vec![T::zero(); rows * rows];
            qr_factor(&mut r, rows, cols, &mut q, &mut tau, config)?;
            qr_solve_factored(&q, &r, rows, cols, &tau, b, columns_b, x, method)
        }
        QrMethod::Thin => {
            let mut q = a.to_vec();
            let mut r = vec![T::zero(); cols * cols];
            thin_qr_factor(&mut q, rows, cols, &mut r, &mut tau, config)?;
            qr_solve_factored(&q, &r, rows, cols, &tau, b, columns_b, x, method)
        }
    }
}
