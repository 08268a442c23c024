//! Result-shape resolution for expression composition
//!
//! Every node computes its extents from its operands when it is built, so the
//! destination of a materialization can be allocated before any element is
//! evaluated.

use crate::error::{Error, Result};
use std::fmt;

/// Extents of a 2-D matrix or expression
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Row count
    pub rows: usize,
    /// Column count
    pub cols: usize,
}

impl Shape {
    /// Create a shape
    #[inline]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Element count
    #[inline]
    pub const fn size(self) -> usize {
        self.rows * self.cols
    }

    /// True when the shape holds no elements
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.size() == 0
    }

    /// True for `n x n`
    #[inline]
    pub const fn is_square(self) -> bool {
        self.rows == self.cols
    }

    /// Extents with rows and columns swapped
    #[inline]
    pub const fn transposed(self) -> Self {
        Self::new(self.cols, self.rows)
    }

    /// Result extents of an element-wise operation: per-extent maximum
    #[inline]
    pub fn ewise(lhs: Self, rhs: Self) -> Self {
        Self::new(lhs.rows.max(rhs.rows), lhs.cols.max(rhs.cols))
    }

    /// Validate an element-wise pairing and report whether it broadcasts
    ///
    /// Equal shapes pair element by element. Otherwise the left operand supplies
    /// one value per result row (`lhs(i / cols)`) and the right operand must
    /// cover the whole result. Operands with the same element count but
    /// different extents (a row against a column) do not pair.
    pub fn ewise_broadcast(lhs: Self, rhs: Self) -> Result<(Self, bool)> {
        if lhs == rhs {
            return Ok((lhs, false));
        }
        let out = Self::ewise(lhs, rhs);
        if lhs.size() == rhs.size() {
            return Err(Error::broadcast(
                lhs.into(),
                rhs.into(),
                "equal element counts with different extents",
            ));
        }
        if rhs.size() != out.size() {
            return Err(Error::broadcast(
                lhs.into(),
                rhs.into(),
                "right operand must span the broadcast result",
            ));
        }
        if lhs.size() < out.rows {
            return Err(Error::broadcast(
                lhs.into(),
                rhs.into(),
                "left operand needs one value per result row",
            ));
        }
        Ok((out, true))
    }

    /// Result extents of `lhs * rhs` (matrix product)
    ///
    /// Returns the shape and whether `rhs` must be read transposed: when
    /// `lhs.cols != rhs.rows` but `lhs.cols == rhs.cols`, the product is taken
    /// against `rhsᵀ` and has `rhs.rows` columns.
    pub fn matmul(lhs: Self, rhs: Self) -> Result<(Self, bool)> {
        if lhs.cols == rhs.rows {
            Ok((Self::new(lhs.rows, rhs.cols), false))
        } else if lhs.cols == rhs.cols {
            Ok((Self::new(lhs.rows, rhs.rows), true))
        } else {
            Err(Error::shape_mismatch((lhs.cols, rhs.cols), rhs.into()))
        }
    }
}

impl From<Shape> for (usize, usize) {
    fn from(s: Shape) -> Self {
        (s.rows, s.cols)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::new(rows, cols)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
