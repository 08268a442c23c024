//! Cholesky / LU dispatch and substitution

use super::{Algorithm, Lapack, SolverInfo, kernels};
use crate::error::{Error, Result};
use crate::matrix::{Layout, Matrix};
use crate::storage::HostStorage;

/// Square system `A·X = B` awaiting factorization
///
/// Borrows the coefficient matrix mutably; [`factorize`](Self::factorize)
/// overwrites it with the factors.
#[derive(Debug)]
pub struct LinearSolver<'a, T: Lapack, S: HostStorage<T>> {
    coef: &'a mut Matrix<T, S>,
    algorithm: Algorithm,
}

impl<'a, T: Lapack, S: HostStorage<T>> LinearSolver<'a, T, S> {
    /// Inspect `coef` and pick a factorization
    ///
    /// Cholesky when the matrix is tagged symmetric or is exactly symmetric,
    /// LU otherwise.
    ///
    /// # Errors
    /// [`Error::NotSquare`] for non-square input.
    pub fn new(coef: &'a mut Matrix<T, S>) -> Result<Self> {
        if !coef.is_square() {
            return Err(Error::NotSquare {
                rows: coef.rows(),
                cols: coef.cols(),
            });
        }
        let algorithm = if coef.format().is_symmetric() || coef.is_symmetric() {
            Algorithm::Cholesky
        } else {
            Algorithm::Lu
        };
        Ok(Self { coef, algorithm })
    }

    /// Override the selected factorization
    ///
    /// Typically used to retry with LU after Cholesky reported a non-positive
    /// minor on a symmetric indefinite matrix.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for [`Algorithm::Svd`], which has its own
    /// entry point ([`svd`](super::svd)).
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self> {
        if algorithm == Algorithm::Svd {
            return Err(Error::invalid_argument(
                "algorithm",
                "SVD is not a square-system factorization; use linalg::svd",
            ));
        }
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Factorization that [`factorize`](Self::factorize) will run
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Overwrite the coefficient matrix with its factors
    ///
    /// The returned handle carries the status record; a non-zero status makes
    /// every later [`Factorized::solve`] fail.
    pub fn factorize(self) -> Factorized<'a, T, S> {
        let n = self.coef.rows();
        let layout = self.coef.format().layout;
        let mut info = SolverInfo::new(self.algorithm);
        let mut pivots = Vec::new();

        log::debug!(
            "factorizing {n}x{n} {:?} matrix with {} ({:?})",
            layout,
            self.algorithm.routine::<T>(),
            self.algorithm
        );

        let a = self.coef.as_mut_slice();
        match self.algorithm {
            Algorithm::Cholesky => {
                info.status = T::potrf(layout, n, a);
            }
            Algorithm::Lu | Algorithm::Svd => {
                pivots = vec![0i32; n];
                info.status = T::getrf(layout, n, a, &mut pivots);
                for (i, &p) in pivots.iter().enumerate() {
                    if p as usize != i + 1 {
                        info.sign = -info.sign;
                    }
                }
            }
        }

        if !info.is_ok() {
            log::warn!(
                "{} returned status {} for {n}x{n} matrix",
                self.algorithm.routine::<T>(),
                info.status
            );
        }

        Factorized {
            factors: self.coef,
            layout,
            pivots,
            info,
        }
    }
}

/// Factors of a square system, ready for substitution
#[derive(Debug)]
pub struct Factorized<'a, T: Lapack, S: HostStorage<T>> {
    factors: &'a Matrix<T, S>,
    layout: Layout,
    pivots: Vec<i32>,
    info: SolverInfo,
}

impl<T: Lapack, S: HostStorage<T>> Factorized<'_, T, S> {
    /// Status record of the factorization
    pub fn info(&self) -> SolverInfo {
        self.info
    }

    /// The overwritten coefficient matrix
    ///
    /// Lower triangle holds `L` for Cholesky; `L` (unit diagonal implied) and
    /// `U` are packed together for LU.
    pub fn factors(&self) -> &Matrix<T, S> {
        self.factors
    }

    /// 1-based LU pivot rows (empty for Cholesky)
    pub fn pivots(&self) -> &[i32] {
        &self.pivots
    }

    /// Determinant of the original matrix
    pub fn det(&self) -> T {
        let n = self.factors.rows();
        let a = self.factors.as_slice();
        let diag = (0..n).fold(T::one(), |acc, i| acc * a[i * n + i]);
        match self.info.algorithm {
            Algorithm::Cholesky => diag * diag,
            _ if self.info.sign < 0 => -diag,
            _ => diag,
        }
    }

    /// Overwrite every column of `rhs` with the solution of `A·x = b`
    ///
    /// Forward then backward substitution, per column, following the recorded
    /// algorithm and layout.
    ///
    /// # Errors
    /// - [`Error::Numerical`] if the factorization failed
    /// - [`Error::ShapeMismatch`] if `rhs` does not have `n` rows
    pub fn solve<S2: HostStorage<T>>(&self, rhs: &mut Matrix<T, S2>) -> Result<()> {
        self.info.check()?;
        let n = self.factors.rows();
        if rhs.rows() != n {
            return Err(Error::shape_mismatch((n, rhs.cols()), rhs.shape().into()));
        }
        let nrhs = rhs.cols();
        let a = self.factors.as_slice();
        let b = rhs.as_mut_slice();
        match self.info.algorithm {
            Algorithm::Cholesky => kernels::cholesky_solve(self.layout, n, a, b, nrhs),
            _ => kernels::lu_solve(self.layout, n, a, &self.pivots, b, nrhs),
        }
        Ok(())
    }
}

/// Factorize `coef` and solve `coef·X = rhs` in place
///
/// Convenience for the common single-shot case; `coef` holds the factors and
/// `rhs` the solution afterwards.
pub fn solve<T, S1, S2>(coef: &mut Matrix<T, S1>, rhs: &mut Matrix<T, S2>) -> Result<SolverInfo>
where
    T: Lapack,
    S1: HostStorage<T>,
    S2: HostStorage<T>,
{
    let factors = LinearSolver::new(coef)?.factorize();
    factors.solve(rhs)?;
    Ok(factors.info())
}
