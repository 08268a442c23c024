//! Eager inverse and determinant

use super::{Algorithm, Lapack, LinearSolver};
use crate::error::{Error, OrFatal, Result};
use crate::matrix::{DMatrix, Matrix};
use crate::storage::HostStorage;

/// Inverse of a square matrix via LU
///
/// # Errors
/// - [`Error::NotSquare`] for non-square input
/// - [`Error::Numerical`] if the matrix is singular
pub fn inverse<T: Lapack, S: HostStorage<T>>(a: &Matrix<T, S>) -> Result<DMatrix<T>> {
    if !a.is_square() {
        return Err(Error::NotSquare {
            rows: a.rows(),
            cols: a.cols(),
        });
    }
    let n = a.rows();
    let mut work = DMatrix::try_from_slice(n, n, a.as_slice())?;
    work.set_format(a.format());

    let factors = LinearSolver::new(&mut work)?
        .with_algorithm(Algorithm::Lu)?
        .factorize();
    let mut inv = DMatrix::identity(n);
    factors.solve(&mut inv)?;
    Ok(inv)
}

impl<T: Lapack, S: HostStorage<T>> Matrix<T, S> {
    /// Eager inverse (fallible version)
    pub fn try_inverse(&self) -> Result<DMatrix<T>> {
        inverse(self)
    }

    /// Determinant via LU; `0` for a singular matrix
    ///
    /// # Panics
    /// If the matrix is not square.
    #[track_caller]
    pub fn det(&self) -> T {
        self.try_det().or_fatal()
    }

    /// Determinant (fallible version)
    pub fn try_det(&self) -> Result<T> {
        if !self.is_square() {
            return Err(Error::NotSquare {
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let n = self.rows();
        let mut work = DMatrix::try_from_slice(n, n, self.as_slice())?;
        let factors = LinearSolver::new(&mut work)?
            .with_algorithm(Algorithm::Lu)?
            .factorize();
        Ok(factors.det())
    }
}
