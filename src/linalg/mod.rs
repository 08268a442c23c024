//! Factorization-based linear solvers
//!
//! A [`LinearSolver`] inspects a square coefficient matrix once and picks a
//! factorization from its structure:
//!
//! - symmetric (tagged via [`Format`](crate::matrix::Format) or detected) → Cholesky
//! - general → LU with partial pivoting
//!
//! Factorization overwrites the coefficient matrix in place and yields a
//! [`Factorized`] handle; only that handle can run substitution, so solving
//! before factorizing does not type-check. Failures are reported through
//! [`SolverInfo::status`] and never retried with another algorithm.
//!
//! Non-square and rank-deficient systems go through [`svd`] / [`svd_solve`].
//!
//! ```
//! use densr::prelude::*;
//!
//! let mut a = DMatrix::from_slice(2, 2, &[4.0f64, 2.0, 2.0, 3.0]);
//! let mut b = DMatrix::from_slice(2, 1, &[2.0, 1.0]);
//!
//! let solver = LinearSolver::new(&mut a).unwrap();
//! assert_eq!(solver.algorithm(), Algorithm::Cholesky);
//!
//! let factors = solver.factorize();
//! assert!(factors.info().is_ok());
//! factors.solve(&mut b).unwrap();
//! assert!((b[0] - 0.5).abs() < 1e-12);
//! assert!(b[1].abs() < 1e-12);
//! ```

mod backend;
mod inverse;
mod kernels;
mod solver;
mod svd;

pub use backend::Lapack;
pub use inverse::inverse;
pub use kernels::MAX_SWEEPS;
pub use solver::{Factorized, LinearSolver, solve};
pub use svd::{svd, svd_solve};

/// Factorization selected by a solver
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// `A = L·Lᵀ` for symmetric positive definite matrices
    Cholesky,
    /// `P·A = L·U` with partial pivoting
    Lu,
    /// `A = U·S·Vᵀ`
    Svd,
}

impl Algorithm {
    /// Backend routine name for element type `T` (`dpotrf`, `sgetrf`, ...)
    pub fn routine<T: Lapack>(self) -> &'static str {
        match self {
            Self::Cholesky => T::POTRF,
            Self::Lu => T::GETRF,
            Self::Svd => T::GESVD,
        }
    }
}

/// Outcome of a factorization
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SolverInfo {
    /// Factorization that produced this record
    pub algorithm: Algorithm,
    /// Backend status; `0` is success
    ///
    /// Positive values follow LAPACK: the 1-based index of the failing leading
    /// minor (Cholesky) or of the exactly-zero pivot (LU); `1` when the SVD
    /// sweeps did not converge.
    pub status: i32,
    /// Parity of the LU row permutation (`+1` or `-1`)
    pub sign: i32,
}

impl SolverInfo {
    pub(crate) fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            status: 0,
            sign: 1,
        }
    }

    /// Whether the factorization succeeded
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// `Ok(self)` on success, [`Error::Numerical`](crate::error::Error::Numerical) otherwise
    pub fn check(self) -> crate::error::Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(crate::error::Error::Numerical {
                algorithm: self.algorithm,
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_names_follow_precision() {
        assert_eq!(Algorithm::Cholesky.routine::<f32>(), "spotrf");
        assert_eq!(Algorithm::Lu.routine::<f64>(), "dgetrf");
        assert_eq!(Algorithm::Svd.routine::<f64>(), "dgesvd");
    }

    #[test]
    fn test_info_check() {
        let mut info = SolverInfo::new(Algorithm::Lu);
        assert!(info.check().is_ok());
        info.status = 2;
        assert_eq!(
            info.check().err(),
            Some(crate::error::Error::Numerical {
                algorithm: Algorithm::Lu,
                status: 2
            })
        );
    }
}
