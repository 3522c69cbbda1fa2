use crate::linalg::{check_len, LinalgError};
use crate::traits::LinalgScalar;

fn check_pivots(ipiv: &[usize], order: usize) -> Result<(), LinalgError> {
    if ipiv.len() != order {
        return Err(LinalgError::DimensionMismatch {
            name: "ipiv",
            expected: order,
            actual: ipiv.len(),
        });
    }
    Ok(())
}

/// Length check plus every entry naming a row below `order`.
fn check_pivot_rows(ipiv: &[usize], order: usize) -> Result<(), LinalgError> {
    check_pivots(ipiv, order)?;
    match ipiv.iter().enumerate().find(|&(_, &p)| p >= order) {
        Some((index, &pivot)) => Err(LinalgError::InvalidPivot {
            index,
            pivot,
            order,
        }),
        None => Ok(()),
    }
}

/// Perform LU decomposition with partial pivoting, in place.
///
/// `data` is an `order x order` column-major matrix. On return it holds both
/// factors packed together:
/// - Upper triangle (including diagonal): U
/// - Lower triangle (excluding diagonal): L (diagonal of L is implicitly 1)
///
/// `ipiv[k]` is the row swapped with row `k` at step `k`. An exactly zero
/// pivot column is left as is; later solves then divide by zero and yield
/// non-finite values instead of an error.
pub fn lu_factor<T: LinalgScalar>(
    data: &mut [T],
    order: usize,
    ipiv: &mut [usize],
) -> Result<(), LinalgError> {
    check_len("data", data.len(), order, order)?;
    check_pivots(ipiv, order)?;

    let n = order;
    for (i, p) in ipiv.iter_mut().enumerate() {
        *p = i;
    }

    for col in 0..n {
        // Partial pivoting: find row with largest modulus in this column
        let col_start = col * n;
        let mut max_row = col;
        let mut max_val = data[col_start + col].modulus();
        for row in (col + 1)..n {
            let val = data[col_start + row].modulus();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        ipiv[col] = max_row;

        if max_row != col {
            for j in 0..n {
                data.swap(j * n + col, j * n + max_row);
            }
        }

        let pivot = data[col_start + col];
        if pivot.is_zero() {
            log::warn!(target: "managed_linalg", "LU factorization hit an exact zero pivot in column {col}");
            continue;
        }

        // Scale sub-column: a[col+1:n, col] /= pivot
        let inv_pivot = T::one() / pivot;
        for x in data[col_start + col + 1..col_start + n].iter_mut() {
            *x = *x * inv_pivot;
        }

        // Rank-1 update: a[col+1:n, j] -= a[col, j] * a[col+1:n, col]
        let (head, tail) = data.split_at_mut(col_start + n);
        let multipliers = &head[col_start + col + 1..];
        for column in tail.chunks_exact_mut(n) {
            let factor = column[col];
            if factor.is_zero() {
                continue;
            }
            for (x, &l) in column[col + 1..].iter_mut().zip(multipliers) {
                *x = *x - factor * l;
            }
        }
    }

    Ok(())
}

/// Solve `A X = B` given the packed factors from [`lu_factor`].
///
/// `b` is `order x columns_of_b` and is overwritten with `X`.
pub fn lu_solve_factored<T: LinalgScalar>(
    columns_of_b: usize,
    a: &[T],
    order: usize,
    ipiv: &[usize],
    b: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_pivot_rows(ipiv, order)?;
    check_len("b", b.len(), order, columns_of_b)?;
    if order == 0 {
        return Ok(());
    }

    let n = order;
    for col in b.chunks_exact_mut(n) {
        for (i, &p) in ipiv.iter().enumerate() {
            if p != i {
                col.swap(i, p);
            }
        }

        // Forward substitution with the unit lower factor
        for k in 0..n {
            let bk = col[k];
            if bk.is_zero() {
                continue;
            }
            let l = &a[k * n + k + 1..(k + 1) * n];
            for (x, &lik) in col[k + 1..].iter_mut().zip(l) {
                *x = *x - bk * lik;
            }
        }

        // Back substitution with the upper factor
        for k in (0..n).rev() {
            col[k] = col[k] / a[k * n + k];
            let bk = col[k];
            let u = &a[k * n..k * n + k];
            for (x, &uik) in col[..k].iter_mut().zip(u) {
                *x = *x - bk * uik;
            }
        }
    }
    Ok(())
}

/// Solve `A X = B`, factoring a scratch copy of `a`.
pub fn lu_solve<T: LinalgScalar>(
    columns_of_b: usize,
    a: &[T],
    order: usize,
    b: &mut [T],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_len("b", b.len(), order, columns_of_b)?;

    let mut lu = a.to_vec();
    let mut ipiv = vec![0usize; order];
    lu_factor(&mut lu, order, &mut ipiv)?;
    lu_solve_factored(columns_of_b, &lu, order, &ipiv, b)
}

/// Replace the packed factors in `a` with the inverse of the original matrix.
pub fn lu_inverse_factored<T: LinalgScalar>(
    a: &mut [T],
    order: usize,
    ipiv: &[usize],
) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_pivot_rows(ipiv, order)?;

    let mut inverse = vec![T::zero(); order * order];
    for i in 0..order {
        inverse[i * order + i] = T::one();
    }
    lu_solve_factored(order, a, order, ipiv, &mut inverse)?;
    a.copy_from_slice(&inverse);
    Ok(())
}

/// Invert `a` in place.
pub fn lu_inverse<T: LinalgScalar>(a: &mut [T], order: usize) -> Result<(), LinalgError> {
    check_len("a", a.len(), order, order)?;
    let mut ipiv = vec![0usize; order];
    lu_factor(a, order, &mut ipiv)?;
    lu_inverse_factored(a, order, &ipiv)
}

/// Determinant from the packed factors: product of U's diagonal, negated
/// once per recorded row swap.
pub fn lu_determinant<T: LinalgScalar>(
    a: &[T],
    order: usize,
    ipiv: &[usize],
) -> Result<T, LinalgError> {
    check_len("a", a.len(), order, order)?;
    check_pivot_rows(ipiv, order)?;

    let mut det = T::one();
    for (i, &p) in ipiv.iter().enumerate() {
        det = det * a[i * order + i];
        if p != i {
            det = T::zero() - det;
        }
    }
    Ok(det)
}
