//! Integration tests for the factorization-based solver
//!
//! Tests verify:
//! - Cholesky on SPD systems: status 0 and A·x ≈ b
//! - LU sign equals the parity of the pivot permutation
//! - Column-major layout solves the matrix the buffer encodes
//! - SVD reconstruction and least-squares solve
//! - No automatic fallback after a failed factorization

mod common;

use common::{assert_allclose_f32, assert_allclose_f64, assert_near_identity, diag_dominant, seeded};
use densr::linalg::{self, Factorized};
use densr::prelude::*;

// ============================================================================
// Helper Functions
// ============================================================================

/// `MᵀM + nI` for a random `M`
fn spd(n: usize, seed: u64) -> DMatrix<f64> {
    let m = DMatrix::<f64>::rand_with(&mut seeded(seed), n, n);
    let mut a = (&m).t().matmul(&m).eval();
    for i in 0..n {
        a[(i, i)] += n as f64;
    }
    a
}

/// Parity of the permutation produced by applying 1-based LAPACK swaps in order
fn pivot_parity(ipiv: &[i32]) -> i32 {
    let n = ipiv.len();
    let mut perm: Vec<usize> = (0..n).collect();
    for (i, &p) in ipiv.iter().enumerate() {
        perm.swap(i, (p - 1) as usize);
    }
    // count cycles: parity = (-1)^(n - cycles)
    let mut seen = vec![false; n];
    let mut cycles = 0;
    for start in 0..n {
        if seen[start] {
            continue;
        }
        cycles += 1;
        let mut j = start;
        while !seen[j] {
            seen[j] = true;
            j = perm[j];
        }
    }
    if (n - cycles) % 2 == 0 { 1 } else { -1 }
}

fn residual<S: densr::storage::HostStorage<f64>>(a: &DMatrix<f64>, x: &Matrix<f64, S>) -> DMatrix<f64> {
    a.matmul(x).eval()
}

// ============================================================================
// Cholesky
// ============================================================================

#[test]
fn test_cholesky_solve_spd() {
    let n = 8;
    let a = spd(n, 31);
    let b = DMatrix::<f64>::rand_with(&mut seeded(32), n, 3);

    let mut factors = a.deep_copy();
    let mut x = b.deep_copy();
    let solver = LinearSolver::new(&mut factors).unwrap();
    assert_eq!(solver.algorithm(), Algorithm::Cholesky);

    let f = solver.factorize();
    assert_eq!(f.info().status, 0);
    f.solve(&mut x).unwrap();

    let back = residual(&a, &x);
    assert_allclose_f64(back.as_slice(), b.as_slice(), 1e-10, 1e-10, "A·x vs b");
}

#[test]
fn test_symmetric_tag_skips_detection() {
    let mut a = spd(4, 33);
    // not exactly symmetric any more; the tag still selects Cholesky
    a[(0, 1)] += 1e-3;
    a.set_format(Format::SYMMETRIC);
    let s = LinearSolver::new(&mut a).unwrap();
    assert_eq!(s.algorithm(), Algorithm::Cholesky);
}

#[test]
fn test_indefinite_symmetric_needs_caller_retry() {
    let a = DMatrix::from_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
    let mut work = a.deep_copy();
    let f = LinearSolver::new(&mut work).unwrap().factorize();
    assert_eq!(f.info().algorithm, Algorithm::Cholesky);
    assert_ne!(f.info().status, 0);

    let mut work = a.deep_copy();
    let f = LinearSolver::new(&mut work)
        .unwrap()
        .with_algorithm(Algorithm::Lu)
        .unwrap()
        .factorize();
    assert!(f.info().is_ok());
    let mut b = DMatrix::from_slice(2, 1, &[2.0, 3.0]);
    f.solve(&mut b).unwrap();
    assert_eq!(b.as_slice(), &[3.0, 2.0]);
}

// ============================================================================
// LU
// ============================================================================

#[test]
fn test_lu_sign_matches_pivot_parity() {
    for seed in 0..8 {
        let n = 6;
        let mut a = DMatrix::<f64>::randn_with(&mut seeded(100 + seed), 0.0, 1.0, n, n).unwrap();
        let f: Factorized<'_, f64, _> = LinearSolver::new(&mut a)
            .unwrap()
            .with_algorithm(Algorithm::Lu)
            .unwrap()
            .factorize();
        assert!(f.info().is_ok());
        assert_eq!(f.info().sign, pivot_parity(f.pivots()), "seed {seed}");
    }
}

#[test]
fn test_lu_solve_general_f32() {
    let a = DMatrix::from_slice(3, 3, &[2.0f32, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
    let mut work = a.deep_copy();
    let mut b = DMatrix::from_slice(3, 1, &[8.0f32, -11.0, -3.0]);
    let info = linalg::solve(&mut work, &mut b).unwrap();
    assert_eq!(info.algorithm, Algorithm::Lu);
    assert_allclose_f32(b.as_slice(), &[2.0, 3.0, -1.0], 1e-5, 1e-5, "gaussian elimination example");
}

#[test]
fn test_column_major_layout() {
    // buffer holds Aᵀ row-major, i.e. A column-major
    let a = diag_dominant(5, 41);
    let at = (&a).t().eval();
    let b = DMatrix::<f64>::rand_with(&mut seeded(42), 5, 1);

    let mut work = at.deep_copy();
    work.set_format(Format::GENERAL.with_layout(Layout::ColMajor));
    let mut x = b.deep_copy();
    linalg::solve(&mut work, &mut x).unwrap();

    let back = residual(&a, &x);
    assert_allclose_f64(back.as_slice(), b.as_slice(), 1e-10, 1e-10, "col-major A·x vs b");
}

#[test]
fn test_singular_lu_reports_status() {
    let mut a = DMatrix::from_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 0.0, 1.0]);
    let f = LinearSolver::new(&mut a).unwrap().factorize();
    assert_eq!(f.info().algorithm, Algorithm::Lu);
    assert!(f.info().status > 0);
    let mut b = DMatrix::<f64>::new(3, 1);
    assert!(matches!(f.solve(&mut b), Err(Error::Numerical { .. })));
}

// ============================================================================
// Inverse / SVD
// ============================================================================

#[test]
fn test_eager_inverse() {
    let a = diag_dominant(7, 51);
    let inv = a.try_inverse().unwrap();
    let eye = (&a).matmul(&inv).eval();
    assert_near_identity(eye.as_slice(), 7, 1e-12, "a · inv(a)");
}

#[test]
fn test_svd_reconstruction_and_orthogonality() {
    let a = DMatrix::<f64>::randn_with(&mut seeded(61), 0.0, 1.0, 6, 4).unwrap();
    let mut u = a.deep_copy();
    let (mut s, mut vt) = (DMatrix::default(), DMatrix::default());
    let info = svd(&mut u, &mut s, &mut vt).unwrap();
    assert_eq!(info.algorithm, Algorithm::Svd);
    assert!(info.is_ok());
    assert_eq!(u.shape(), Shape::new(6, 4));

    for i in 1..s.size() {
        assert!(s[i - 1] >= s[i]);
    }

    let us = s.t().spread_mul(&u);
    let back = (&us).matmul(&vt).eval();
    assert_allclose_f64(back.as_slice(), a.as_slice(), 1e-10, 1e-10, "U·S·Vᵀ");

    let utu = (&u).t().matmul(&u).eval();
    assert_near_identity(utu.as_slice(), 4, 1e-10, "UᵀU");
    let vvt = (&vt).matmul(&vt).eval();
    assert_near_identity(vvt.as_slice(), 4, 1e-10, "VᵀV");
}

#[test]
fn test_svd_solve_overdetermined() {
    let a = DMatrix::<f64>::randn_with(&mut seeded(71), 0.0, 1.0, 10, 3).unwrap();
    let x_true = DMatrix::from_slice(3, 1, &[1.0, -2.0, 0.5]);
    let b = (&a).matmul(&x_true).eval();

    let x = svd_solve(&a, &b, 1e-12).unwrap();
    assert_allclose_f64(x.as_slice(), x_true.as_slice(), 1e-10, 1e-10, "least squares");
    assert!(svd_solve(&a, &x_true, 1e-12).is_err());
}
