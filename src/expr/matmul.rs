//! Matrix product node

use super::{Expression, Shape};
use crate::dtype::{Element, Promote};
use crate::error::{OrFatal, Result};

#[cfg(feature = "rayon")]
use super::PARALLEL_THRESHOLD;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Lazy matrix product `lhs * rhs`
///
/// `result(r, c) = Σ_k lhs(r, k) * rhs(k, c)`, accumulated in increasing `k`.
/// If the inner extents only line up against `rhsᵀ` (`lhs.cols == rhs.cols`),
/// `rhs` is read transposed and the result has `rhs.rows` columns.
#[derive(Clone, Debug)]
pub struct MatMul<L, R> {
    lhs: L,
    rhs: R,
    m: usize,
    k: usize,
    n: usize,
    rhs_transposed: bool,
}

impl<L, R> MatMul<L, R>
where
    L: Expression,
    R: Expression,
    L::Elem: Promote<R::Elem>,
{
    /// Build the product node
    ///
    /// # Panics
    /// If the inner extents match neither `rhs` nor `rhsᵀ`.
    #[track_caller]
    pub fn new(lhs: L, rhs: R) -> Self {
        Self::try_new(lhs, rhs).or_fatal()
    }

    /// Build the product node, returning an error on incompatible extents
    pub fn try_new(lhs: L, rhs: R) -> Result<Self> {
        let (shape, rhs_transposed) = Shape::matmul(lhs.shape(), rhs.shape())?;
        Ok(Self {
            m: shape.rows,
            k: lhs.cols(),
            n: shape.cols,
            lhs,
            rhs,
            rhs_transposed,
        })
    }

    /// Whether `rhs` is read as its transpose
    pub fn is_rhs_transposed(&self) -> bool {
        self.rhs_transposed
    }

    #[inline]
    fn rhs_at(&self, kk: usize, c: usize) -> R::Elem {
        if self.rhs_transposed {
            self.rhs.eval_rc(c, kk)
        } else {
            self.rhs.eval_rc(kk, c)
        }
    }
}

impl<L, R> Expression for MatMul<L, R>
where
    L: Expression,
    R: Expression,
    L::Elem: Promote<R::Elem>,
{
    type Elem = <L::Elem as Promote<R::Elem>>::Output;

    #[inline]
    fn shape(&self) -> Shape {
        Shape::new(self.m, self.n)
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        self.eval_rc(i / self.n, i % self.n)
    }

    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        (0..self.k).fold(<Self::Elem as Element>::zero(), |acc, kk| {
            let a = self.lhs.eval_rc(r, kk).promote_lhs();
            let b = <L::Elem as Promote<R::Elem>>::promote_rhs(self.rhs_at(kk, c));
            acc + a * b
        })
    }

    /// Materializes both operands once, then runs the row kernel
    ///
    /// Operands that are themselves products would otherwise be re-evaluated
    /// for every output element.
    fn write_into(&self, out: &mut [Self::Elem]) {
        debug_assert_eq!(out.len(), self.m * self.n);
        if out.is_empty() {
            return;
        }

        let lhs = self.lhs.eval();
        let rhs = self.rhs.eval();
        let (a, b) = (lhs.as_slice(), rhs.as_slice());
        let (k, n, transposed) = (self.k, self.n, self.rhs_transposed);

        let row = |r: usize, dst: &mut [Self::Elem]| {
            let a_row = &a[r * k..(r + 1) * k];
            for (c, o) in dst.iter_mut().enumerate() {
                let mut acc = <Self::Elem as Element>::zero();
                for (kk, &av) in a_row.iter().enumerate() {
                    let bv = if transposed { b[c * k + kk] } else { b[kk * n + c] };
                    acc = acc + av.promote_lhs() * <L::Elem as Promote<R::Elem>>::promote_rhs(bv);
                }
                *o = acc;
            }
        };

        #[cfg(feature = "rayon")]
        if out.len() >= PARALLEL_THRESHOLD {
            out.par_chunks_mut(n)
                .enumerate()
                .for_each(|(r, dst)| row(r, dst));
            return;
        }

        for (r, dst) in out.chunks_mut(n).enumerate() {
            row(r, dst);
        }
    }
}
