//! Lazy expression evaluation
//!
//! Arithmetic on matrices builds expression nodes instead of computing results.
//! A node borrows its leaf operands (`&Matrix`, [`MatrixView`]) and owns nested
//! nodes by value; none of them owns element storage. The borrow checker keeps
//! every operand alive for as long as an expression refers to it, and rejects
//! assigning an expression into a matrix the expression still reads from. A
//! [`share`](crate::matrix::Matrix::share) alias of an operand is a different
//! matrix to the borrow checker; assigning into it detaches it onto a private
//! buffer before the first element is written.
//!
//! ```
//! use densr::prelude::*;
//!
//! let a = DMatrix::from_slice(2, 2, &[1.0f64, 2.0, 3.0, 4.0]);
//! let b = DMatrix::filled(2, 2, 1.0);
//!
//! // Nothing is computed here
//! let e = (&a + &b) * 2.0f64;
//! assert_eq!(e.shape(), Shape::new(2, 2));
//!
//! // Materialization evaluates each destination element once
//! let c = e.eval();
//! assert_eq!(c.as_slice(), &[4.0, 6.0, 8.0, 10.0]);
//! ```
//!
//! [`MatrixView`]: crate::matrix::MatrixView

mod ewise;
mod functor;
mod matmul;
mod ops;
mod shape;
mod unary;

pub use ewise::{Binary, BinaryScalar, Map, ScalarBinary, Unary};
pub use functor::{
    Abs, AddOp, BinaryFn, DivOp, Exp, Floor, Log, Log2, Log10, MaxOp, MinOp, MulOp, NegOp, Sqrt,
    Square, SubOp, UnaryFn,
};
pub use matmul::MatMul;
pub use shape::Shape;
pub use unary::{Inverse, Transposed, remap};

use crate::dtype::{Element, Promote};
use crate::error::{Error, OrFatal, Result};
use crate::linalg::Lapack;
use crate::matrix::{DMatrix, Matrix};
use crate::storage::HostStorage;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Output size from which materialization and reductions run in parallel
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Elements per parallel task
pub const CHUNK_SIZE: usize = 1024;

/// Common interface of matrices, views and expression nodes
///
/// Implementors report their result [`Shape`] and evaluate single elements on
/// demand. Everything else (materialization, composition, reductions) is
/// provided on top of those two operations.
pub trait Expression: Sized + Sync {
    /// Element type of the result
    type Elem: Element;

    /// Result extents
    fn shape(&self) -> Shape;

    /// Evaluate the element at row-major linear index `i`
    fn eval_at(&self, i: usize) -> Self::Elem;

    /// Evaluate the element at `(r, c)`
    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        self.eval_at(r * self.shape().cols + c)
    }

    /// Result row count
    #[inline]
    fn rows(&self) -> usize {
        self.shape().rows
    }

    /// Result column count
    #[inline]
    fn cols(&self) -> usize {
        self.shape().cols
    }

    /// Result element count
    #[inline]
    fn size(&self) -> usize {
        self.shape().size()
    }

    /// Write every result element into `out` (row-major, `out.len() == size()`)
    ///
    /// Each output index is written exactly once. Above [`PARALLEL_THRESHOLD`]
    /// elements the work is split into independent chunks when the `rayon`
    /// feature is enabled.
    fn write_into(&self, out: &mut [Self::Elem]) {
        debug_assert_eq!(out.len(), self.size());

        #[cfg(feature = "rayon")]
        if out.len() >= PARALLEL_THRESHOLD {
            out.par_chunks_mut(CHUNK_SIZE)
                .enumerate()
                .for_each(|(chunk_idx, chunk)| {
                    let base = chunk_idx * CHUNK_SIZE;
                    for (j, o) in chunk.iter_mut().enumerate() {
                        *o = self.eval_at(base + j);
                    }
                });
            return;
        }

        for (i, o) in out.iter_mut().enumerate() {
            *o = self.eval_at(i);
        }
    }

    /// Materialize into `dest`, reallocating dynamic storage to the result shape
    fn assign_to<S: HostStorage<Self::Elem>>(&self, dest: &mut Matrix<Self::Elem, S>) {
        dest.try_assign_from(self).or_fatal();
    }

    /// Materialize into a new heap matrix
    fn eval(&self) -> DMatrix<Self::Elem> {
        let mut out = DMatrix::new(self.rows(), self.cols());
        self.write_into(out.as_mut_slice());
        out
    }

    /// Matrix product `self · rhs`
    ///
    /// Named apart from `std::ops::Mul::mul`, which is the element-wise `*`.
    ///
    /// # Panics
    /// If the inner extents match neither `rhs` nor `rhsᵀ`.
    #[track_caller]
    fn matmul<R: Expression>(self, rhs: R) -> MatMul<Self, R>
    where
        Self::Elem: Promote<R::Elem>,
    {
        MatMul::new(self, rhs)
    }

    /// Matrix product, returning an error on incompatible extents
    fn try_matmul<R: Expression>(self, rhs: R) -> Result<MatMul<Self, R>>
    where
        Self::Elem: Promote<R::Elem>,
    {
        MatMul::try_new(self, rhs)
    }

    /// Transpose (index remapping, no copy)
    fn t(self) -> Transposed<Self> {
        Transposed::new(self)
    }

    /// Transpose; alias of [`t`](Self::t)
    fn transpose(self) -> Transposed<Self> {
        self.t()
    }

    /// Inverse, computed on first read and cached
    ///
    /// # Panics
    /// If the expression is not square; on first read if it is singular.
    fn inv(self) -> Inverse<Self>
    where
        Self::Elem: Lapack,
    {
        Inverse::new(self)
    }

    /// Element-wise square root
    fn sqrt(self) -> Unary<Self, Sqrt> {
        Unary::new(self)
    }

    /// Element-wise natural exponential
    fn exp(self) -> Unary<Self, Exp> {
        Unary::new(self)
    }

    /// Element-wise natural logarithm
    fn log(self) -> Unary<Self, Log> {
        Unary::new(self)
    }

    /// Element-wise base-2 logarithm
    fn log2(self) -> Unary<Self, Log2> {
        Unary::new(self)
    }

    /// Element-wise base-10 logarithm
    fn log10(self) -> Unary<Self, Log10> {
        Unary::new(self)
    }

    /// Element-wise absolute value
    fn abs(self) -> Unary<Self, Abs> {
        Unary::new(self)
    }

    /// Element-wise floor
    fn floor(self) -> Unary<Self, Floor> {
        Unary::new(self)
    }

    /// Element-wise square
    fn square(self) -> Unary<Self, Square> {
        Unary::new(self)
    }

    /// Element-wise application of `f`
    fn map<F>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Elem) -> Self::Elem + Sync,
    {
        Map::new(self, f)
    }

    /// Element-wise maximum of `self` and `rhs`
    fn maximum<R: Expression>(self, rhs: R) -> Binary<Self, R, MaxOp>
    where
        Self::Elem: Promote<R::Elem>,
    {
        Binary::new(self, rhs)
    }

    /// Element-wise minimum of `self` and `rhs`
    fn minimum<R: Expression>(self, rhs: R) -> Binary<Self, R, MinOp>
    where
        Self::Elem: Promote<R::Elem>,
    {
        Binary::new(self, rhs)
    }

    /// Sum over all elements
    fn sum(&self) -> Self::Elem {
        let n = self.size();

        #[cfg(feature = "rayon")]
        if n >= PARALLEL_THRESHOLD {
            return (0..n.div_ceil(CHUNK_SIZE))
                .into_par_iter()
                .map(|chunk| {
                    let end = ((chunk + 1) * CHUNK_SIZE).min(n);
                    (chunk * CHUNK_SIZE..end).fold(Self::Elem::zero(), |acc, i| acc + self.eval_at(i))
                })
                .collect::<Vec<_>>()
                .into_iter()
                .fold(Self::Elem::zero(), |acc, v| acc + v);
        }

        (0..n).fold(Self::Elem::zero(), |acc, i| acc + self.eval_at(i))
    }

    /// Arithmetic mean of all elements
    fn avg(&self) -> Self::Elem {
        let n = self.size();
        if n == 0 {
            return Self::Elem::zero();
        }
        Self::Elem::from_f64(self.sum().to_f64() / n as f64)
    }

    /// Population variance of all elements
    fn var(&self) -> Self::Elem {
        let n = self.size();
        if n == 0 {
            return Self::Elem::zero();
        }
        let mean = self.sum().to_f64() / n as f64;
        let ss = (0..n).fold(0.0, |acc, i| {
            let d = self.eval_at(i).to_f64() - mean;
            acc + d * d
        });
        Self::Elem::from_f64(ss / n as f64)
    }

    /// Scale `rhs` by this one-dimensional expression
    ///
    /// A column vector with one value per row of `rhs` scales the rows; a row
    /// vector with one value per column scales the columns.
    ///
    /// # Panics
    /// For any other pairing of shapes.
    fn spread_mul<R: Expression>(&self, rhs: &R) -> DMatrix<<Self::Elem as Promote<R::Elem>>::Output>
    where
        Self::Elem: Promote<R::Elem>,
    {
        self.try_spread_mul(rhs).or_fatal()
    }

    /// Fallible [`spread_mul`](Self::spread_mul)
    fn try_spread_mul<R: Expression>(
        &self,
        rhs: &R,
    ) -> Result<DMatrix<<Self::Elem as Promote<R::Elem>>::Output>>
    where
        Self::Elem: Promote<R::Elem>,
    {
        let (me, other) = (self.shape(), rhs.shape());
        let along_rows = me.cols == 1 && me.rows == other.rows;
        let along_cols = me.rows == 1 && me.cols == other.cols;
        if !along_rows && !along_cols {
            return Err(Error::broadcast(
                me.into(),
                other.into(),
                "only one-dimension array spread is supported",
            ));
        }

        let mut out = DMatrix::new(other.rows, other.cols);
        for r in 0..other.rows {
            for c in 0..other.cols {
                let s = if along_rows { self.eval_at(r) } else { self.eval_at(c) };
                out[(r, c)] = s.promote_lhs() * <Self::Elem as Promote<R::Elem>>::promote_rhs(rhs.eval_rc(r, c));
            }
        }
        Ok(out)
    }
}

impl<E: Expression> Expression for &E {
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        (**self).eval_at(i)
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        (**self).eval_rc(r, c)
    }
}

/// Symmetric part `(x + xᵀ) / 2`
pub fn sym<E>(x: &E) -> DMatrix<E::Elem>
where
    E: Expression,
    E::Elem: Promote<E::Elem, Output = E::Elem>,
{
    let half = E::Elem::from_f64(0.5);
    let sum = Binary::<_, _, AddOp>::new(x, x.t());
    BinaryScalar::<_, MulOp>::new(sum, half).eval()
}

/// Skew-symmetric part `(x - xᵀ) / 2`
pub fn skew<E>(x: &E) -> DMatrix<E::Elem>
where
    E: Expression,
    E::Elem: Promote<E::Elem, Output = E::Elem>,
{
    let half = E::Elem::from_f64(0.5);
    let diff = Binary::<_, _, SubOp>::new(x, x.t());
    BinaryScalar::<_, MulOp>::new(diff, half).eval()
}

/// Outer product `x * yᵀ`
pub fn outer_product<L, R>(x: L, y: R) -> DMatrix<<L::Elem as Promote<R::Elem>>::Output>
where
    L: Expression,
    R: Expression,
    L::Elem: Promote<R::Elem>,
{
    x.matmul(y.t()).eval()
}

/// Scatter of a data matrix around its mean
///
/// Centers every element on the global mean `m`, then returns
/// `2 / (rows + cols) * (x - m)ᵀ (x - m)`.
pub fn covar<E>(x: &E) -> DMatrix<E::Elem>
where
    E: Expression,
    E::Elem: Promote<E::Elem, Output = E::Elem>,
{
    let centered = BinaryScalar::<_, SubOp>::new(x, x.avg()).eval();
    let fact = E::Elem::from_f64(2.0 / (x.rows() + x.cols()) as f64);
    let scatter = (&centered).t().matmul(&centered);
    BinaryScalar::<_, MulOp>::new(scatter, fact).eval()
}
