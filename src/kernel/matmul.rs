//! Cache-oblivious dense matrix multiply.
//!
//! `C = alpha * op(A) * op(B) + beta * C` on column-major buffers. The
//! recursion halves the largest of `m`, `n`, `k` until every dimension fits
//! in `block_size`, then runs a column-oriented triple loop. Only the first
//! split along `m` or `n` may fork; splits along `k` always run in order
//! since both halves accumulate into the same block of `C`.

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::linalg::{check_len, LinalgError};
use crate::parallel::{degree, join, ParallelConfig, Parallelism};
use crate::traits::LinalgScalar;

/// Operation applied to an operand before multiplication.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    DontTranspose,
    Transpose,
    ConjugateTranspose,
}

/// Read-only strided view into a column-major buffer.
#[derive(Copy, Clone)]
struct MatRef<'a, T> {
    data: &'a [T],
    offset: usize,
    rows: usize,
    cols: usize,
    ld: usize,
}

impl<'a, T: Copy> MatRef<'a, T> {
    fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self {
            data,
            offset: 0,
            rows,
            cols,
            ld: rows,
        }
    }

    #[inline]
    fn col(&self, j: usize) -> &'a [T] {
        let start = self.offset + j * self.ld;
        &self.data[start..start + self.rows]
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> T {
        self.data[self.offset + j * self.ld + i]
    }

    fn split_at_row(self, at: usize) -> (Self, Self) {
        assert!(at <= self.rows);
        let top = Self { rows: at, ..self };
        let bottom = Self {
            offset: self.offset + at,
            rows: self.rows - at,
            ..self
        };
        (top, bottom)
    }

    fn split_at_col(self, at: usize) -> (Self, Self) {
        assert!(at <= self.cols);
        let left = Self { cols: at, ..self };
        let right = Self {
            offset: self.offset + at * self.ld,
            cols: self.cols - at,
            ..self
        };
        (left, right)
    }
}

/// Mutable strided view. Row and column splits hand out disjoint regions, so
/// the halves may be written from different threads.
struct MatMut<'a, T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    ld: usize,
    _marker: PhantomData<&'a mut T>,
}

unsafe impl<T: Send> Send for MatMut<'_, T> {}

impl<'a, T> MatMut<'a, T> {
    fn new(data: &'a mut [T], rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self {
            ptr: data.as_mut_ptr(),
            rows,
            cols,
            ld: rows,
            _marker: PhantomData,
        }
    }

    /// Reborrow with a shorter lifetime.
    #[inline]
    fn rb(&mut self) -> MatMut<'_, T> {
        MatMut {
            ptr: self.ptr,
            rows: self.rows,
            cols: self.cols,
            ld: self.ld,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn col_mut(&mut self, j: usize) -> &mut [T] {
        assert!(j < self.cols);
        // Safety: column j spans ld*j .. ld*j + rows inside the original
        // allocation, and `&mut self` prevents a second live borrow.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.add(j * self.ld), self.rows) }
    }

    fn split_at_row(self, at: usize) -> (Self, Self) {
        assert!(at <= self.rows);
        let top = MatMut {
            ptr: self.ptr,
            rows: at,
            cols: self.cols,
            ld: self.ld,
            _marker: PhantomData,
        };
        let bottom = MatMut {
            // Safety: at <= rows <= ld keeps the pointer inside column 0.
            ptr: unsafe { self.ptr.add(at) },
            rows: self.rows - at,
            cols: self.cols,
            ld: self.ld,
            _marker: PhantomData,
        };
        (top, bottom)
    }

    fn split_at_col(self, at: usize) -> (Self, Self) {
        assert!(at <= self.cols);
        let left = MatMut {
            ptr: self.ptr,
            rows: self.rows,
            cols: at,
            ld: self.ld,
            _marker: PhantomData,
        };
        let right = MatMut {
            // Safety: at <= cols, so the offset stays within (or one past) the buffer.
            ptr: unsafe { self.ptr.add(at * self.ld) },
            rows: self.rows,
            cols: self.cols - at,
            ld: self.ld,
            _marker: PhantomData,
        };
        (left, right)
    }
}

/// Copy `op(x)` into a fresh column-major buffer, or borrow `x` untouched.
fn materialize<T: LinalgScalar>(
    trans: Transpose,
    x: &[T],
    rows: usize,
    cols: usize,
) -> Cow<'_, [T]> {
    match trans {
        Transpose::DontTranspose => Cow::Borrowed(x),
        Transpose::Transpose | Transpose::ConjugateTranspose => {
            let conj = trans == Transpose::ConjugateTranspose;
            let mut t = vec![T::zero(); x.len()];
            for j in 0..cols {
                for i in 0..rows {
                    let v = x[j * rows + i];
                    t[i * cols + j] = if conj { v.conj() } else { v };
                }
            }
            Cow::Owned(t)
        }
    }
}

#[inline]
fn op_shape(trans: Transpose, rows: usize, cols: usize) -> (usize, usize) {
    match trans {
        Transpose::DontTranspose => (rows, cols),
        _ => (cols, rows),
    }
}

/// `C = alpha * op(A) * op(B) + beta * C`.
///
/// `a` is `rows_a x cols_a`, `b` is `rows_b x cols_b` and `c` must hold the
/// product shape. `beta == 0` overwrites `C` without reading it, so NaN or
/// infinity already present in `C` does not propagate.
#[allow(clippy::too_many_arguments)]
pub fn matrix_multiply_with_update<T: LinalgScalar>(
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
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    check_len("a", a.len(), rows_a, cols_a)?;
    check_len("b", b.len(), rows_b, cols_b)?;
    config.validate()?;

    let (m, k) = op_shape(trans_a, rows_a, cols_a);
    let (kb, n) = op_shape(trans_b, rows_b, cols_b);
    if k != kb {
        return Err(LinalgError::InnerDimensionMismatch { left: k, right: kb });
    }
    check_len("c", c.len(), m, n)?;

    if beta.is_zero() {
        c.fill(T::zero());
    } else if beta != T::one() {
        for v in c.iter_mut() {
            *v = *v * beta;
        }
    }

    if alpha.is_zero() || k == 0 || m == 0 || n == 0 {
        return Ok(());
    }

    let a = materialize(trans_a, a, rows_a, cols_a);
    let b = materialize(trans_b, b, rows_b, cols_b);

    multiply_block(
        alpha,
        MatRef::new(&a, m, k),
        MatRef::new(&b, k, n),
        MatMut::new(c, m, n),
        config,
        config.parallelism,
        true,
    );
    Ok(())
}

/// `result = x * y`.
#[allow(clippy::too_many_arguments)]
pub fn matrix_multiply<T: LinalgScalar>(
    x: &[T],
    rows_x: usize,
    cols_x: usize,
    y: &[T],
    rows_y: usize,
    cols_y: usize,
    result: &mut [T],
    config: &ParallelConfig,
) -> Result<(), LinalgError> {
    matrix_multiply_with_update(
        Transpose::DontTranspose,
        Transpose::DontTranspose,
        T::one(),
        x,
        rows_x,
        cols_x,
        y,
        rows_y,
        cols_y,
        T::zero(),
        result,
        config,
    )
}

fn multiply_block<T: LinalgScalar>(
    alpha: T,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    mut c: MatMut<'_, T>,
    config: &ParallelConfig,
    parallelism: Parallelism,
    first: bool,
) {
    let (m, n, k) = (c.rows, c.cols, a.cols);
    if m == 0 || n == 0 || k == 0 {
        return;
    }

    let largest = m.max(n).max(k);
    if largest <= config.block_size {
        multiply_direct(alpha, a, b, c);
        return;
    }

    let fork = first && degree(parallelism) > 1 && largest >= config.parallelize_order;

    if k >= m && k >= n {
        let h = k / 2;
        let (a0, a1) = a.split_at_col(h);
        let (b0, b1) = b.split_at_row(h);
        multiply_block(alpha, a0, b0, c.rb(), config, parallelism, first);
        multiply_block(alpha, a1, b1, c, config, parallelism, first);
    } else if m >= n {
        let h = m / 2;
        let (a0, a1) = a.split_at_row(h);
        let (c0, c1) = c.split_at_row(h);
        if fork {
            join(
                |par| multiply_block(alpha, a0, b, c0, config, par, false),
                |par| multiply_block(alpha, a1, b, c1, config, par, false),
                parallelism,
            );
        } else {
            multiply_block(alpha, a0, b, c0, config, parallelism, false);
            multiply_block(alpha, a1, b, c1, config, parallelism, false);
        }
    } else {
        let h = n / 2;
        let (b0, b1) = b.split_at_col(h);
        let (c0, c1) = c.split_at_col(h);
        if fork {
            join(
                |par| multiply_block(alpha, a, b0, c0, config, par, false),
                |par| multiply_block(alpha, a, b1, c1, config, par, false),
                parallelism,
            );
        } else {
            multiply_block(alpha, a, b0, c0, config, parallelism, false);
            multiply_block(alpha, a, b1, c1, config, parallelism, false);
        }
    }
}

/// `C += alpha * A * B` for a block that fits in cache.
fn multiply_direct<T: LinalgScalar>(alpha: T, a: MatRef<'_, T>, b: MatRef<'_, T>, mut c: MatMut<'_, T>) {
    for j in 0..c.cols {
        let c_col = c.col_mut(j);
        for p in 0..a.cols {
            let t = alpha * b.get(p, j);
            let a_col = a.col(p);
            for (ci, &ai) in c_col.iter_mut().zip(a_col) {
                *ci = *ci + ai * t;
            }
        }
    }
}
