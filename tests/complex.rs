use managed_linalg::kernel::{conjugate_array, dot_product, matrix_multiply_with_update, Transpose};
use managed_linalg::linalg::{
    cholesky_factor, cholesky_solve, eigen_decomp, lu_determinant, lu_factor, lu_inverse,
    lu_solve, qr_factor, qr_solve, singular_value_decomposition, QrMethod,
};
use managed_linalg::{Complex, ParallelConfig};

type C = Complex<f64>;

fn c(re: f64, im: f64) -> C {
    Complex::new(re, im)
}

const TOL: f64 = 1e-10;

fn assert_complex_near(a: C, b: C, tol: f64, msg: &str) {
    assert!(
        (a.re - b.re).abs() < tol && (a.im - b.im).abs() < tol,
        "{}: {:?} vs {:?}",
        msg,
        a,
        b
    );
}

fn assert_all_near(a: &[C], b: &[C], tol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length", msg);
    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        assert_complex_near(x, y, tol, &format!("{} [{}]", msg, i));
    }
}

/// Column-major `m x k` times `k x n`.
fn mul(a: &[C], b: &[C], m: usize, k: usize, n: usize) -> Vec<C> {
    let mut out = vec![C::default(); m * n];
    for j in 0..n {
        for p in 0..k {
            for i in 0..m {
                out[j * m + i] += a[p * m + i] * b[j * k + p];
            }
        }
    }
    out
}

fn adjoint(a: &[C], m: usize, n: usize) -> Vec<C> {
    let mut t = vec![C::default(); m * n];
    for j in 0..n {
        for i in 0..m {
            t[i * n + j] = a[j * m + i].conj();
        }
    }
    t
}

fn identity(n: usize) -> Vec<C> {
    let mut id = vec![C::default(); n * n];
    for i in 0..n {
        id[i * n + i] = c(1.0, 0.0);
    }
    id
}

// ── Array kernel ─────────────────────────────────────────────────────

#[test]
fn complex_dot_is_unconjugated() {
    let x = [c(1.0, 1.0), c(0.0, 2.0)];
    let y = [c(1.0, -1.0), c(0.0, 1.0)];
    // (1+i)(1-i) + (2i)(i) = 2 - 2
    assert_complex_near(dot_product(&x, &y).unwrap(), c(0.0, 0.0), TOL, "dot");

    let mut conj = [C::default(); 2];
    conjugate_array(&x, &mut conj).unwrap();
    assert_eq!(conj, [c(1.0, -1.0), c(0.0, -2.0)]);
}

#[test]
fn complex_gram_matrix_is_hermitian() {
    let a = [c(1.0, 2.0), c(0.0, -1.0), c(3.0, 0.5), c(2.0, 1.0), c(-1.0, 0.0), c(0.5, 0.5)];
    let mut g = vec![C::default(); 4];
    matrix_multiply_with_update(
        Transpose::ConjugateTranspose,
        Transpose::DontTranspose,
        c(1.0, 0.0),
        &a,
        3,
        2,
        &a,
        3,
        2,
        c(0.0, 0.0),
        &mut g,
        &ParallelConfig::sequential(),
    )
    .unwrap();
    assert_all_near(&g, &mul(&adjoint(&a, 3, 2), &a, 2, 3, 2), TOL, "A^H A");
    assert_complex_near(g[2], g[1].conj(), TOL, "hermitian");
    assert!(g[0].im.abs() < TOL && g[3].im.abs() < TOL);
}

// ── LU tests ─────────────────────────────────────────────────────────

#[test]
fn complex_lu_solve() {
    // [[2+i, 1-i], [1, 3+2i]]
    let a = [c(2.0, 1.0), c(1.0, 0.0), c(1.0, -1.0), c(3.0, 2.0)];
    let b = [c(5.0, 3.0), c(7.0, 4.0)];
    let mut x = b;
    lu_solve(1, &a, 2, &mut x).unwrap();
    assert_all_near(&mul(&a, &x, 2, 2, 1), &b, TOL, "A x");
}

#[test]
fn complex_lu_det() {
    // [[1+i, 2], [i, 1-i]]: (1+i)(1-i) - 2i = 2 - 2i
    let mut a = [c(1.0, 1.0), c(0.0, 1.0), c(2.0, 0.0), c(1.0, -1.0)];
    let mut ipiv = [0; 2];
    lu_factor(&mut a, 2, &mut ipiv).unwrap();
    assert_complex_near(lu_determinant(&a, 2, &ipiv).unwrap(), c(2.0, -2.0), TOL, "det");
}

#[test]
fn complex_lu_inverse() {
    let a = [
        c(4.0, 1.0),
        c(1.0, -2.0),
        c(0.0, 1.0),
        c(2.0, 0.0),
        c(5.0, 1.0),
        c(1.0, 1.0),
        c(-1.0, 0.5),
        c(0.0, -1.0),
        c(3.0, 0.0),
    ];
    let mut inv = a;
    lu_inverse(&mut inv, 3).unwrap();
    assert_all_near(&mul(&a, &inv, 3, 3, 3), &identity(3), TOL, "A A^-1");
}

// ── Cholesky tests ───────────────────────────────────────────────────

#[test]
fn complex_cholesky() {
    // Hermitian positive definite [[4, 1+i], [1-i, 3]]
    let a = [c(4.0, 0.0), c(1.0, -1.0), c(1.0, 1.0), c(3.0, 0.0)];
    let mut l = a;
    cholesky_factor(&mut l, 2, &ParallelConfig::sequential()).unwrap();
    assert_eq!(l[2], C::default());
    assert_all_near(&mul(&l, &adjoint(&l, 2, 2), 2, 2, 2), &a, TOL, "L L^H");

    let b = [c(1.0, 0.0), c(0.0, 1.0)];
    let mut x = b;
    cholesky_solve(&a, 2, &mut x, 1, &ParallelConfig::sequential()).unwrap();
    assert_all_near(&mul(&a, &x, 2, 2, 1), &b, TOL, "A x");
}

// ── QR tests ─────────────────────────────────────────────────────────

#[test]
fn complex_full_qr() {
    let a = [c(1.0, 1.0), c(2.0, 0.0), c(0.0, -1.0), c(0.0, 2.0), c(1.0, 1.0), c(3.0, 0.0)];
    let mut r = a;
    let mut q = vec![C::default(); 9];
    let mut tau = [C::default(); 2];
    qr_factor(&mut r, 3, 2, &mut q, &mut tau, &ParallelConfig::sequential()).unwrap();

    assert_all_near(&mul(&adjoint(&q, 3, 3), &q, 3, 3, 3), &identity(3), TOL, "Q^H Q");
    assert_all_near(&mul(&q, &r, 3, 3, 2), &a, TOL, "Q R");
    assert_eq!(r[1], C::default());
    assert_eq!(r[2], C::default());
    assert_eq!(r[5], C::default());
}

#[test]
fn complex_least_squares_residual_is_orthogonal() {
    let a = [c(1.0, 1.0), c(2.0, 0.0), c(0.0, -1.0), c(0.0, 2.0), c(1.0, 1.0), c(3.0, 0.0)];
    let b = [c(1.0, 0.0), c(0.0, 1.0), c(2.0, -1.0)];
    for method in [QrMethod::Full, QrMethod::Thin] {
        let mut x = [C::default(); 2];
        qr_solve(&a, 3, 2, &b, 1, &mut x, method, &ParallelConfig::sequential()).unwrap();
        let ax = mul(&a, &x, 3, 2, 1);
        let resid: Vec<C> = b.iter().zip(&ax).map(|(&bi, &yi)| bi - yi).collect();
        let normal = mul(&adjoint(&a, 3, 2), &resid, 2, 3, 1);
        assert_all_near(&normal, &[C::default(); 2], TOL, "A^H r");
    }
}

// ── SVD tests ────────────────────────────────────────────────────────

#[test]
fn complex_svd_reconstructs() {
    let a = [c(1.0, 2.0), c(0.0, -1.0), c(3.0, 0.5), c(2.0, 1.0), c(-1.0, 0.0), c(0.5, 0.5)];
    let mut work = a;
    let mut s = [0.0; 2];
    let mut u = vec![C::default(); 9];
    let mut vt = vec![C::default(); 4];
    singular_value_decomposition(true, &mut work, 3, 2, &mut s, &mut u, &mut vt).unwrap();

    assert!(s[0] >= s[1] && s[1] >= 0.0);
    let mut sigma = vec![C::default(); 6];
    sigma[0] = c(s[0], 0.0);
    sigma[4] = c(s[1], 0.0);
    let rebuilt = mul(&mul(&u, &sigma, 3, 3, 2), &vt, 3, 2, 2);
    assert_all_near(&rebuilt, &a, TOL, "U S Vt");
}

// ── Eigen tests ──────────────────────────────────────────────────────

#[test]
fn complex_hermitian_eigen() {
    let a = [c(2.0, 0.0), c(1.0, 1.0), c(1.0, -1.0), c(3.0, 0.0)];
    let mut v = vec![C::default(); 4];
    let mut w = vec![C::default(); 2];
    let mut d = vec![C::default(); 4];
    eigen_decomp(true, 2, &a, &mut v, &mut w, &mut d).unwrap();
    assert_complex_near(w[0], c(1.0, 0.0), TOL, "lambda0");
    assert_complex_near(w[1], c(4.0, 0.0), TOL, "lambda1");
    assert_all_near(&mul(&a, &v, 2, 2, 2), &mul(&v, &d, 2, 2, 2), TOL, "A V = V D");
}

#[test]
fn complex_general_eigen() {
    // upper triangular: eigenvalues are the diagonal
    let a = [
        c(1.0, 1.0),
        C::default(),
        C::default(),
        c(2.0, 0.0),
        c(3.0, -1.0),
        C::default(),
        c(0.0, 1.0),
        c(1.0, 1.0),
        c(-2.0, 0.0),
    ];
    let mut v = vec![C::default(); 9];
    let mut w = vec![C::default(); 3];
    let mut d = vec![C::default(); 9];
    eigen_decomp(false, 3, &a, &mut v, &mut w, &mut d).unwrap();

    let mut got: Vec<C> = w.clone();
    got.sort_by(|x, y| x.re.partial_cmp(&y.re).unwrap());
    assert_all_near(&got, &[c(-2.0, 0.0), c(1.0, 1.0), c(3.0, -1.0)], TOL, "eigenvalues");
    assert_all_near(&mul(&a, &v, 3, 3, 3), &mul(&v, &d, 3, 3, 3), TOL, "A V = V D");
    for k in 0..3 {
        let len: f64 = v[k * 3..k * 3 + 3].iter().map(|z| z.norm_sqr()).sum();
        assert!((len - 1.0).abs() < TOL, "column {} not unit length", k);
    }
}
