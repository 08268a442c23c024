//! Precision-typed factorization routines
//!
//! Every float type maps to its own set of LAPACK-style routines at compile
//! time; there is no runtime branch on element width.

use super::kernels;
use crate::dtype::{Promote, Real};
use crate::matrix::Layout;

/// Factorization backend for one element precision
///
/// Routines work in place on contiguous `n×n` (or `m×n`) buffers and return a
/// LAPACK status code: `0` on success, a positive 1-based index on a numerical
/// failure.
///
/// The `Promote` bound lets generic solver code compose expressions over a
/// single precision.
pub trait Lapack: Real + Promote<Self, Output = Self> {
    /// Cholesky routine name
    const POTRF: &'static str;
    /// LU routine name
    const GETRF: &'static str;
    /// SVD routine name
    const GESVD: &'static str;

    /// Lower Cholesky factor of `a`, written into the lower triangle
    ///
    /// The strict upper triangle is left untouched.
    fn potrf(layout: Layout, n: usize, a: &mut [Self]) -> i32;

    /// Packed LU factors of `a` with partial pivoting
    ///
    /// `ipiv[i]` receives the 1-based row swapped with row `i + 1`.
    fn getrf(layout: Layout, n: usize, a: &mut [Self], ipiv: &mut [i32]) -> i32;

    /// Thin SVD of the row-major `m×n` matrix `a`
    ///
    /// With `k = min(m, n)`: `u` is `m×k`, `s` holds `k` values in descending
    /// order, `vt` is `k×n`.
    fn gesvd(m: usize, n: usize, a: &[Self], u: &mut [Self], s: &mut [Self], vt: &mut [Self]) -> i32;
}

macro_rules! impl_lapack {
    ($ty:ty, $potrf:literal, $getrf:literal, $gesvd:literal) => {
        impl Lapack for $ty {
            const POTRF: &'static str = $potrf;
            const GETRF: &'static str = $getrf;
            const GESVD: &'static str = $gesvd;

            #[inline]
            fn potrf(layout: Layout, n: usize, a: &mut [Self]) -> i32 {
                kernels::cholesky(layout, n, a)
            }

            #[inline]
            fn getrf(layout: Layout, n: usize, a: &mut [Self], ipiv: &mut [i32]) -> i32 {
                kernels::lu(layout, n, a, ipiv)
            }

            #[inline]
            fn gesvd(
                m: usize,
                n: usize,
                a: &[Self],
                u: &mut [Self],
                s: &mut [Self],
                vt: &mut [Self],
            ) -> i32 {
                kernels::jacobi_svd(m, n, a, u, s, vt)
            }
        }
    };
}

impl_lapack!(f32, "spotrf", "sgetrf", "sgesvd");
impl_lapack!(f64, "dpotrf", "dgetrf", "dgesvd");
