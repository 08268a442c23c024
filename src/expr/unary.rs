//! Structural unary nodes: transpose and inverse

use super::{Expression, Shape};
use crate::error::{Error, OrFatal, Result, fatal};
use crate::linalg::{self, Lapack};
use crate::matrix::DMatrix;
use std::sync::OnceLock;

/// Source index of element `i` of a transposed expression
///
/// `rows` and `cols` are the extents of the transposed result. Equivalent to
/// `i*rows + (i/cols)*(1 - rows*cols)`, evaluated without signed arithmetic.
#[inline]
pub const fn remap(i: usize, rows: usize, cols: usize) -> usize {
    (i % cols) * rows + i / cols
}

/// Transpose by index remapping; no data is moved
#[derive(Clone, Debug)]
pub struct Transposed<E> {
    inner: E,
    shape: Shape,
}

impl<E: Expression> Transposed<E> {
    /// Wrap an expression
    pub fn new(inner: E) -> Self {
        let shape = inner.shape().transposed();
        Self { inner, shape }
    }

    /// The untransposed expression
    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Expression> Expression for Transposed<E> {
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        self.inner.eval_at(remap(i, self.shape.rows, self.shape.cols))
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        self.inner.eval_rc(c, r)
    }
}

/// Lazily computed inverse
///
/// The first element read materializes the operand, inverts it and keeps the
/// result in an auxiliary buffer; later reads are served from that buffer.
#[derive(Clone)]
pub struct Inverse<E: Expression> {
    expr: E,
    shape: Shape,
    cache: OnceLock<DMatrix<E::Elem>>,
}

impl<E> Inverse<E>
where
    E: Expression,
    E::Elem: Lapack,
{
    /// Wrap a square expression
    ///
    /// # Panics
    /// If the expression is not square.
    #[track_caller]
    pub fn new(expr: E) -> Self {
        Self::try_new(expr).or_fatal()
    }

    /// Wrap a square expression, returning an error otherwise
    pub fn try_new(expr: E) -> Result<Self> {
        let shape = expr.shape();
        if !shape.is_square() {
            return Err(Error::NotSquare {
                rows: shape.rows,
                cols: shape.cols,
            });
        }
        Ok(Self {
            expr,
            shape,
            cache: OnceLock::new(),
        })
    }

    /// Whether the inverse has been computed
    pub fn is_computed(&self) -> bool {
        self.cache.get().is_some()
    }

    /// The inverse, computing it on first use
    ///
    /// # Panics
    /// If the operand is singular.
    pub fn matrix(&self) -> &DMatrix<E::Elem> {
        self.cache.get_or_init(|| {
            log::debug!("computing cached {} inverse", self.shape);
            match linalg::inverse(&self.expr.eval()) {
                Ok(inv) => inv,
                Err(e) => fatal(e),
            }
        })
    }
}

impl<E> Expression for Inverse<E>
where
    E: Expression,
    E::Elem: Lapack,
{
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        self.matrix().as_slice()[i]
    }

    fn write_into(&self, out: &mut [Self::Elem]) {
        out.copy_from_slice(self.matrix().as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_matches_naive_transpose() {
        for rows in 1..=6 {
            for cols in 1..=6 {
                // source is cols x rows; its transpose is rows x cols
                for r in 0..rows {
                    for c in 0..cols {
                        let i = r * cols + c;
                        assert_eq!(remap(i, rows, cols), c * rows + r, "{rows}x{cols} at {i}");
                        let signed = i as i64 * rows as i64
                            + (i / cols) as i64 * (1 - (rows * cols) as i64);
                        assert_eq!(remap(i, rows, cols) as i64, signed);
                    }
                }
            }
        }
    }

    #[test]
    fn test_transposed_reads() {
        let a = DMatrix::from_slice(2, 3, &[1, 2, 3, 4, 5, 6]);
        let t = Transposed::new(&a);
        assert_eq!(t.shape(), Shape::new(3, 2));
        assert_eq!(t.eval().as_slice(), &[1, 4, 2, 5, 3, 6]);
        assert_eq!(t.eval_rc(2, 1), 6);
        assert_eq!(Transposed::new(t).eval().as_slice(), a.as_slice());
    }

    #[test]
    fn test_inverse_is_cached() {
        let a = DMatrix::from_slice(2, 2, &[4.0f64, 7.0, 2.0, 6.0]);
        let inv = Inverse::new(&a);
        assert!(!inv.is_computed());
        let first = inv.eval_at(0);
        assert!(inv.is_computed());
        assert!((first - 0.6).abs() < 1e-12);
        assert!((inv.eval_rc(0, 1) + 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_requires_square() {
        let a = DMatrix::<f64>::new(2, 3);
        assert_eq!(
            Inverse::try_new(&a).err(),
            Some(Error::NotSquare { rows: 2, cols: 3 })
        );
    }
}
