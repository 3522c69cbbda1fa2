use managed_linalg::{
    Complex, LinalgError, LinearAlgebraProvider, ManagedLinearAlgebraProvider, ParallelConfig,
    Parallelism, Provider, QrMethod, Transpose,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-9;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// `M M^T + n I`, symmetric positive definite.
fn random_spd(n: usize, seed: u64) -> Vec<f64> {
    let m = random_matrix(n, n, seed);
    let mut a = mul(&m, &transpose(&m, n, n), n, n, n);
    for i in 0..n {
        a[i * n + i] += n as f64;
    }
    a
}

fn mul(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    for j in 0..n {
        for p in 0..k {
            for i in 0..m {
                out[j * m + i] += a[p * m + i] * b[j * k + p];
            }
        }
    }
    out
}

fn transpose(a: &[f64], m: usize, n: usize) -> Vec<f64> {
    let mut t = vec![0.0; m * n];
    for j in 0..n {
        for i in 0..m {
            t[i * n + j] = a[j * m + i];
        }
    }
    t
}

fn identity(n: usize) -> Vec<f64> {
    let mut id = vec![0.0; n * n];
    for i in 0..n {
        id[i * n + i] = 1.0;
    }
    id
}

fn assert_all_near(a: &[f64], b: &[f64], tol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length", msg);
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < tol, "{} [{}]: {} vs {}", msg, i, x, y);
    }
}

fn parallel_provider() -> ManagedLinearAlgebraProvider {
    ManagedLinearAlgebraProvider::new(
        ParallelConfig::default()
            .with_parallelism(Parallelism::Rayon(4))
            .with_parallelize_order(8)
            .with_parallelize_elements(4)
            .with_block_size(8),
    )
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn managed_provider_lifecycle() {
    let p = ManagedLinearAlgebraProvider::default();
    assert!(p.is_available());
    p.initialize_verify().unwrap();
    p.free_resources();
    assert_eq!(p.kind().to_string(), "Managed");
}

// ── Concrete scenarios ───────────────────────────────────────────────

#[test]
fn cholesky_of_identity_is_identity() {
    let p = ManagedLinearAlgebraProvider::default();
    for n in [1, 10, 100, 1000] {
        let mut a = identity(n);
        p.cholesky_factor(&mut a, n).unwrap();
        assert!(a == identity(n), "n = {}", n);
        let det: f64 = (0..n).map(|i| a[i * n + i] * a[i * n + i]).product();
        assert_eq!(det, 1.0);
    }
}

#[test]
fn lu_pivots_larger_row() {
    let p = ManagedLinearAlgebraProvider::sequential();
    // [[4, 3], [6, 3]]
    let mut a = [4.0_f64, 6.0, 3.0, 3.0];
    let mut ipiv = [0; 2];
    p.lu_factor(&mut a, 2, &mut ipiv).unwrap();
    assert_eq!(ipiv, [1, 1]);
    assert!((p.lu_determinant(&a, 2, &ipiv).unwrap() + 6.0).abs() < TOL);
}

#[test]
fn full_qr_of_3x2() {
    let p = ManagedLinearAlgebraProvider::sequential();
    let a = [1.0_f64, 2.0, 3.0, 4.0, 5.0, 7.0];
    let mut r = a;
    let mut q = vec![0.0; 9];
    let mut tau = [0.0; 2];
    p.qr_factor(&mut r, 3, 2, &mut q, &mut tau).unwrap();

    assert_all_near(&mul(&transpose(&q, 3, 3), &q, 3, 3, 3), &identity(3), TOL, "Q^T Q");
    assert_eq!([r[1], r[2], r[5]], [0.0, 0.0, 0.0]);
    assert_all_near(&mul(&q, &r, 3, 3, 2), &a, TOL, "Q R");
}

#[test]
fn svd_of_identity() {
    let p = ManagedLinearAlgebraProvider::sequential();
    let mut a = identity(2);
    let mut s = [0.0; 2];
    let mut u = vec![0.0; 4];
    let mut vt = vec![0.0; 4];
    p.singular_value_decomposition(true, &mut a, 2, 2, &mut s, &mut u, &mut vt)
        .unwrap();
    assert_eq!(s, [1.0, 1.0]);
    assert_all_near(&u, &identity(2), 1e-15, "U");
    assert_all_near(&vt, &identity(2), 1e-15, "Vt");
}

#[test]
fn symmetric_eigen_of_diagonal() {
    let p = ManagedLinearAlgebraProvider::sequential();
    let a = [2.0_f64, 0.0, 0.0, 3.0];
    let mut v = vec![0.0; 4];
    let mut w = vec![Complex::new(0.0_f64, 0.0); 2];
    let mut d = vec![0.0; 4];
    p.eigen_decomp(true, 2, &a, &mut v, &mut w, &mut d).unwrap();
    assert_eq!(w, [Complex::new(2.0, 0.0), Complex::new(3.0, 0.0)]);
    assert_all_near(&v, &identity(2), 1e-15, "V");
}

#[test]
fn not_positive_definite_reports_pivot() {
    let p = ManagedLinearAlgebraProvider::sequential();
    let mut a = [1.0_f64, 2.0, 2.0, 1.0];
    assert_eq!(
        p.cholesky_factor(&mut a, 2),
        Err(LinalgError::NotPositiveDefinite { pivot: 1 })
    );
}

#[test]
fn mismatched_lengths_are_rejected() {
    let p = ManagedLinearAlgebraProvider::sequential();
    let mut c = vec![0.0_f64; 4];
    let err = p
        .matrix_multiply(&[1.0; 6], 2, 3, &[1.0; 6], 2, 3, &mut c)
        .unwrap_err();
    assert_eq!(err, LinalgError::InnerDimensionMismatch { left: 3, right: 2 });

    let mut x = vec![0.0_f64; 2];
    let err = p
        .qr_solve(&[1.0; 6], 2, 3, &[1.0; 2], 1, &mut x, QrMethod::Full)
        .unwrap_err();
    assert_eq!(err, LinalgError::RowsLessThanColumns { rows: 2, columns: 3 });
}

// ── Random round trips ───────────────────────────────────────────────

#[test]
fn lu_solve_and_inverse_round_trip() {
    let p = ManagedLinearAlgebraProvider::default();
    let n = 40;
    let a = random_matrix(n, n, 1);
    let b = random_matrix(n, 3, 2);

    let mut x = b.clone();
    p.lu_solve(3, &a, n, &mut x).unwrap();
    assert_all_near(&mul(&a, &x, n, n, 3), &b, TOL, "A X = B");

    let mut inv = a.clone();
    p.lu_inverse(&mut inv, n).unwrap();
    assert_all_near(&mul(&a, &inv, n, n, n), &identity(n), TOL, "A A^-1");
}

#[test]
fn cholesky_solve_round_trip() {
    let p = ManagedLinearAlgebraProvider::default();
    let n = 50;
    let a = random_spd(n, 3);
    let b = random_matrix(n, 4, 4);
    let mut x = b.clone();
    p.cholesky_solve(&a, n, &mut x, 4).unwrap();
    assert_all_near(&mul(&a, &x, n, n, 4), &b, TOL, "A X = B");
}

#[test]
fn qr_and_svd_least_squares_agree() {
    let p = ManagedLinearAlgebraProvider::default();
    let (m, n) = (30, 8);
    let a = random_matrix(m, n, 5);
    let b = random_matrix(m, 2, 6);

    let mut x_full = vec![0.0; n * 2];
    let mut x_thin = vec![0.0; n * 2];
    let mut x_svd = vec![0.0; n * 2];
    p.qr_solve(&a, m, n, &b, 2, &mut x_full, QrMethod::Full).unwrap();
    p.qr_solve(&a, m, n, &b, 2, &mut x_thin, QrMethod::Thin).unwrap();
    p.svd_solve(&a, m, n, &b, 2, &mut x_svd).unwrap();

    assert_all_near(&x_full, &x_thin, TOL, "full vs thin");
    assert_all_near(&x_full, &x_svd, TOL, "qr vs svd");
}

#[test]
fn svd_reconstructs_random_matrix() {
    let p = ManagedLinearAlgebraProvider::default();
    let (m, n) = (9, 6);
    let a = random_matrix(m, n, 7);
    let mut work = a.clone();
    let mut s = vec![0.0; n];
    let mut u = vec![0.0; m * m];
    let mut vt = vec![0.0; n * n];
    p.singular_value_decomposition(true, &mut work, m, n, &mut s, &mut u, &mut vt)
        .unwrap();

    for k in 1..n {
        assert!(s[k - 1] >= s[k]);
    }
    let mut sigma = vec![0.0; m * n];
    for k in 0..n {
        sigma[k * m + k] = s[k];
    }
    let rebuilt = mul(&mul(&u, &sigma, m, m, n), &vt, m, n, n);
    assert_all_near(&rebuilt, &a, TOL, "U S Vt");
}

#[test]
fn symmetric_eigen_random() {
    let p = ManagedLinearAlgebraProvider::default();
    let n = 20;
    let a = random_spd(n, 8);
    let mut v = vec![0.0; n * n];
    let mut w = vec![Complex::new(0.0_f64, 0.0); n];
    let mut d = vec![0.0; n * n];
    p.eigen_decomp(true, n, &a, &mut v, &mut w, &mut d).unwrap();

    for k in 1..n {
        assert!(w[k - 1].re <= w[k].re);
    }
    assert!(w.iter().all(|z| z.im == 0.0 && z.re > 0.0));
    assert_all_near(&mul(&a, &v, n, n, n), &mul(&v, &d, n, n, n), 1e-8, "A V = V D");
}

#[test]
fn nonsymmetric_pairs_are_adjacent() {
    let p = ManagedLinearAlgebraProvider::default();
    let n = 12;
    let a = random_matrix(n, n, 9);
    let mut v = vec![0.0; n * n];
    let mut w = vec![Complex::new(0.0_f64, 0.0); n];
    let mut d = vec![0.0; n * n];
    p.eigen_decomp(false, n, &a, &mut v, &mut w, &mut d).unwrap();

    let mut i = 0;
    while i < n {
        if w[i].im != 0.0 {
            assert!(w[i].im > 0.0, "pair at {} starts with negative part", i);
            assert_eq!(w[i + 1], w[i].conj());
            i += 2;
        } else {
            i += 1;
        }
    }
    assert_all_near(&mul(&a, &v, n, n, n), &mul(&v, &d, n, n, n), 1e-8, "A V = V D");
}

// ── Determinism and parallel equivalence ─────────────────────────────

#[test]
fn repeated_runs_are_bitwise_identical() {
    let p = ManagedLinearAlgebraProvider::default();
    let n = 16;
    let a = random_matrix(n, n, 10);
    let run = || {
        let mut v = vec![0.0; n * n];
        let mut w = vec![Complex::new(0.0_f64, 0.0); n];
        let mut d = vec![0.0; n * n];
        p.eigen_decomp(false, n, &a, &mut v, &mut w, &mut d).unwrap();
        (v, w, d)
    };
    assert_eq!(run(), run());
}

#[test]
fn parallel_matches_sequential() {
    let seq = ManagedLinearAlgebraProvider::new(
        ParallelConfig::sequential()
            .with_parallelize_order(8)
            .with_parallelize_elements(4)
            .with_block_size(8),
    );
    let par = parallel_provider();
    par.initialize_verify().unwrap();

    let (m, k, n) = (70, 45, 33);
    let a = random_matrix(m, k, 11);
    let b = random_matrix(k, n, 12);
    let mut c_seq = random_matrix(m, n, 13);
    let mut c_par = c_seq.clone();
    let args = (Transpose::DontTranspose, Transpose::DontTranspose, 1.5, -0.5);
    seq.matrix_multiply_with_update(args.0, args.1, args.2, &a, m, k, &b, k, n, args.3, &mut c_seq)
        .unwrap();
    par.matrix_multiply_with_update(args.0, args.1, args.2, &a, m, k, &b, k, n, args.3, &mut c_par)
        .unwrap();
    assert_eq!(c_seq, c_par);

    let order = 60;
    let spd = random_spd(order, 14);
    let mut l_seq = spd.clone();
    let mut l_par = spd.clone();
    seq.cholesky_factor(&mut l_seq, order).unwrap();
    par.cholesky_factor(&mut l_par, order).unwrap();
    assert_eq!(l_seq, l_par);

    let (rows, cols) = (40, 25);
    let q_in = random_matrix(rows, cols, 15);
    let (mut r_seq, mut r_par) = (q_in.clone(), q_in);
    let (mut q_seq, mut q_par) = (vec![0.0; rows * rows], vec![0.0; rows * rows]);
    let (mut t_seq, mut t_par) = (vec![0.0; cols], vec![0.0; cols]);
    seq.qr_factor(&mut r_seq, rows, cols, &mut q_seq, &mut t_seq).unwrap();
    par.qr_factor(&mut r_par, rows, cols, &mut q_par, &mut t_par).unwrap();
    assert_eq!(r_seq, r_par);
    assert_eq!(q_seq, q_par);
}
