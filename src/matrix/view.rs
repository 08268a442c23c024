//! Borrowed rectangular windows into a matrix buffer

use super::DMatrix;
use crate::dtype::Element;
use crate::error::{Error, OrFatal, Result};
use crate::expr::{Expression, Shape};

/// Read-only window of `rows x cols` elements, rows `stride` elements apart
///
/// Views are cheap to copy and are expression leaves, so they take part in
/// arithmetic like a matrix does.
#[derive(Copy, Clone, Debug)]
pub struct MatrixView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T: Element> MatrixView<'a, T> {
    /// Wrap `data` as a strided window
    ///
    /// `data` starts at the window's first element and must hold
    /// `(rows - 1) * stride + cols` elements.
    pub fn new(data: &'a [T], rows: usize, cols: usize, stride: usize) -> Self {
        debug_assert!(rows == 0 || cols == 0 || data.len() >= (rows - 1) * stride + cols);
        Self {
            data,
            rows,
            cols,
            stride,
        }
    }

    /// Contiguous row-major window over a whole slice
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> Result<Self> {
        if data.len() < rows * cols {
            return Err(Error::IndexOutOfBounds {
                index: rows * cols,
                size: data.len(),
            });
        }
        Ok(Self::new(data, rows, cols, cols))
    }

    /// Row count
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Elements between row starts in the underlying buffer
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Element at `(r, c)`
    #[inline]
    #[track_caller]
    pub fn get(&self, r: usize, c: usize) -> T {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{} view",
            self.rows,
            self.cols
        );
        self.data[r * self.stride + c]
    }

    /// Elements in row-major order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.rows).flat_map(move |r| {
            let start = r * self.stride;
            self.data[start..start + self.cols].iter().copied()
        })
    }

    /// Copy the elements out in row-major order
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Copy into a new owning matrix
    pub fn to_matrix(&self) -> DMatrix<T> {
        DMatrix::from_expr(self)
    }
}

impl<T: Element> Expression for MatrixView<'_, T> {
    type Elem = T;

    #[inline]
    fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    #[inline]
    fn eval_at(&self, i: usize) -> T {
        self.data[(i / self.cols) * self.stride + i % self.cols]
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> T {
        self.data[r * self.stride + c]
    }
}

/// Mutable window of `rows x cols` elements, rows `stride` elements apart
#[derive(Debug)]
pub struct MatrixViewMut<'a, T> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T: Element> MatrixViewMut<'a, T> {
    /// Wrap `data` as a strided mutable window
    pub fn new(data: &'a mut [T], rows: usize, cols: usize, stride: usize) -> Self {
        debug_assert!(rows == 0 || cols == 0 || data.len() >= (rows - 1) * stride + cols);
        Self {
            data,
            rows,
            cols,
            stride,
        }
    }

    /// Row count
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(r, c)`
    #[inline]
    #[track_caller]
    pub fn get(&self, r: usize, c: usize) -> T {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{} view",
            self.rows,
            self.cols
        );
        self.data[r * self.stride + c]
    }

    /// Overwrite the element at `(r, c)`
    #[inline]
    #[track_caller]
    pub fn set(&mut self, r: usize, c: usize, value: T) {
        assert!(
            r < self.rows && c < self.cols,
            "index ({r}, {c}) out of bounds for {}x{} view",
            self.rows,
            self.cols
        );
        self.data[r * self.stride + c] = value;
    }

    /// Set every element of the window
    pub fn fill(&mut self, value: T) {
        for r in 0..self.rows {
            let start = r * self.stride;
            self.data[start..start + self.cols].fill(value);
        }
    }

    /// Materialize an expression of the window's shape into it
    ///
    /// # Panics
    /// If the shapes differ.
    #[track_caller]
    pub fn assign<E: Expression<Elem = T>>(&mut self, expr: E) {
        self.try_assign(&expr).or_fatal();
    }

    /// Materialize an expression of the window's shape into it (fallible version)
    pub fn try_assign<E: Expression<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        let shape = expr.shape();
        if shape != Shape::new(self.rows, self.cols) {
            return Err(Error::shape_mismatch((self.rows, self.cols), shape.into()));
        }
        for r in 0..self.rows {
            let start = r * self.stride;
            for (c, dst) in self.data[start..start + self.cols].iter_mut().enumerate() {
                *dst = expr.eval_rc(r, c);
            }
        }
        Ok(())
    }

    /// Read-only view of the same window
    pub fn as_view(&self) -> MatrixView<'_, T> {
        MatrixView::new(&*self.data, self.rows, self.cols, self.stride)
    }
}
