//! Singular value decomposition and least-squares solve

use super::{Algorithm, Lapack, SolverInfo};
use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::matrix::{DMatrix, Matrix};
use crate::storage::HostStorage;

/// Decompose `u` in place into `U·diag(S)·Vᵀ`
///
/// With `u` of shape `m×n` and `k = min(m, n)`, `u` is left holding the `m×k`
/// left singular vectors, `s` the `k×1` singular values in descending order and
/// `vt` the `k×n` right singular vectors. `s` and `vt` are allocated when
/// empty.
///
/// A non-converged decomposition is reported through [`SolverInfo::status`].
///
/// # Errors
/// [`Error::ShapeMismatch`] if a pre-sized `s` or `vt` has the wrong extents.
pub fn svd<T: Lapack>(u: &mut DMatrix<T>, s: &mut DMatrix<T>, vt: &mut DMatrix<T>) -> Result<SolverInfo> {
    let (m, n) = (u.rows(), u.cols());
    let k = m.min(n);

    for (out, shape) in [(&mut *s, (k, 1)), (&mut *vt, (k, n))] {
        if out.is_empty() {
            out.try_create(shape.0, shape.1)?;
        } else if (out.rows(), out.cols()) != shape {
            return Err(Error::shape_mismatch(shape, out.shape().into()));
        }
    }

    let a = u.as_slice().to_vec();
    if k != n {
        u.try_create(m, k)?;
    }

    log::debug!("svd of {m}x{n} matrix with {}", T::GESVD);
    let mut info = SolverInfo::new(Algorithm::Svd);
    info.status = T::gesvd(m, n, &a, u.as_mut_slice(), s.as_mut_slice(), vt.as_mut_slice());
    Ok(info)
}

/// Minimum-norm least-squares solution of `a·X ≈ b`
///
/// `X = V·diag(1/σ)·Uᵀ·b`, where singular values below `rcond·σ_max` are
/// treated as zero. Handles non-square and rank-deficient `a`.
///
/// # Errors
/// - [`Error::ShapeMismatch`] if `b` does not have as many rows as `a`
/// - [`Error::InvalidArgument`] for a negative `rcond`
/// - [`Error::Numerical`] if the decomposition did not converge
pub fn svd_solve<T, S1, S2>(a: &Matrix<T, S1>, b: &Matrix<T, S2>, rcond: T) -> Result<DMatrix<T>>
where
    T: Lapack,
    S1: HostStorage<T>,
    S2: HostStorage<T>,
{
    if b.rows() != a.rows() {
        return Err(Error::shape_mismatch((a.rows(), b.cols()), b.shape().into()));
    }
    if rcond < T::zero() {
        return Err(Error::invalid_argument("rcond", format!("must be non-negative, got {rcond}")));
    }

    let mut u = DMatrix::try_from_slice(a.rows(), a.cols(), a.as_slice())?;
    let (mut s, mut vt) = (DMatrix::default(), DMatrix::default());
    svd(&mut u, &mut s, &mut vt)?.check()?;

    let cutoff = match s.as_slice().first() {
        Some(&largest) => rcond * largest,
        None => T::zero(),
    };

    // Uᵀ·b, then scale row i by 1/σ_i
    let mut y = (&u).t().matmul(b).eval();
    let p = y.cols();
    for (i, &sigma) in s.as_slice().iter().enumerate() {
        let scale = if sigma > cutoff && sigma > T::zero() {
            T::one() / sigma
        } else {
            T::zero()
        };
        for v in &mut y.as_mut_slice()[i * p..(i + 1) * p] {
            *v = *v * scale;
        }
    }
    Ok((&vt).t().matmul(&y).eval())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svd_allocates_outputs() {
        let mut u = DMatrix::from_slice(2, 3, &[3.0f64, 2.0, 2.0, 2.0, 3.0, -2.0]);
        let (mut s, mut vt) = (DMatrix::default(), DMatrix::default());
        let info = svd(&mut u, &mut s, &mut vt).unwrap();
        assert_eq!(info.algorithm, Algorithm::Svd);
        assert!(info.is_ok());
        assert_eq!((u.rows(), u.cols()), (2, 2));
        assert_eq!((s.rows(), s.cols()), (2, 1));
        assert_eq!((vt.rows(), vt.cols()), (2, 3));
        assert!((s[0] - 5.0).abs() < 1e-10 && (s[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_svd_rejects_wrong_presized_output() {
        let mut u = DMatrix::<f32>::identity(3);
        let mut s = DMatrix::new(2, 1);
        let mut vt = DMatrix::default();
        assert!(svd(&mut u, &mut s, &mut vt).is_err());
    }

    #[test]
    fn test_least_squares_line_fit() {
        // y = 1 + 2x sampled exactly
        let a = DMatrix::from_slice(4, 2, &[1.0f64, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let b = DMatrix::from_slice(4, 1, &[1.0, 3.0, 5.0, 7.0]);
        let x = svd_solve(&a, &b, 1e-12).unwrap();
        assert_eq!((x.rows(), x.cols()), (2, 1));
        assert!((x[0] - 1.0).abs() < 1e-10 && (x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_rank_deficient_minimum_norm() {
        let a = DMatrix::from_slice(2, 2, &[1.0f64, 1.0, 1.0, 1.0]);
        let b = DMatrix::from_slice(2, 1, &[2.0, 2.0]);
        let x = svd_solve(&a, &b, 1e-10).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-10 && (x[1] - 1.0).abs() < 1e-10);
    }
}
