//! Collections of equally-typed matrices
//!
//! [`MatrixGrid`] lays matrices out on a `rows x cols` grid; [`MultiMatrix`]
//! keeps an ordered list and hands out the same block view of each member,
//! which is how stereo and multi-view code walks corresponding windows.

use crate::dtype::Element;
use crate::error::{Error, OrFatal, Result};
use crate::matrix::{DMatrix, MatrixView};
use smallvec::SmallVec;
use std::ops::{Deref, DerefMut, Index, IndexMut};

/// Block views gathered from several matrices; inline for up to four
pub type Views<'a, T> = SmallVec<[MatrixView<'a, T>; 4]>;

/// `rows x cols` grid of matrices, stored row-major
#[derive(Clone, Debug, Default)]
pub struct MatrixGrid<T: Element> {
    rows: usize,
    cols: usize,
    items: Vec<DMatrix<T>>,
}

impl<T: Element> MatrixGrid<T> {
    /// Grid of empty matrices
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            items: (0..rows * cols).map(|_| DMatrix::default()).collect(),
        }
    }

    /// Grid whose cells are independent copies of `proto`
    pub fn filled(rows: usize, cols: usize, proto: &DMatrix<T>) -> Self {
        Self {
            rows,
            cols,
            items: (0..rows * cols).map(|_| proto.deep_copy()).collect(),
        }
    }

    /// Grid rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell count
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True for a grid without cells
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cell at `(r, c)`, if in range
    pub fn get(&self, r: usize, c: usize) -> Option<&DMatrix<T>> {
        if r < self.rows && c < self.cols {
            self.items.get(r * self.cols + c)
        } else {
            None
        }
    }

    /// Mutable cell at `(r, c)`, if in range
    pub fn get_mut(&mut self, r: usize, c: usize) -> Option<&mut DMatrix<T>> {
        if r < self.rows && c < self.cols {
            self.items.get_mut(r * self.cols + c)
        } else {
            None
        }
    }

    /// Cells in row-major grid order
    pub fn iter(&self) -> std::slice::Iter<'_, DMatrix<T>> {
        self.items.iter()
    }

    /// Mutable cells in row-major grid order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DMatrix<T>> {
        self.items.iter_mut()
    }

    #[track_caller]
    fn cell(&self, r: usize, c: usize) -> usize {
        if r >= self.rows {
            fatal_index(r, self.rows);
        }
        if c >= self.cols {
            fatal_index(c, self.cols);
        }
        r * self.cols + c
    }
}

#[track_caller]
fn fatal_index(index: usize, size: usize) -> ! {
    crate::error::fatal(Error::IndexOutOfBounds { index, size })
}

impl<T: Element> Index<(usize, usize)> for MatrixGrid<T> {
    type Output = DMatrix<T>;

    #[track_caller]
    fn index(&self, (r, c): (usize, usize)) -> &DMatrix<T> {
        &self.items[self.cell(r, c)]
    }
}

impl<T: Element> IndexMut<(usize, usize)> for MatrixGrid<T> {
    #[track_caller]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut DMatrix<T> {
        let i = self.cell(r, c);
        &mut self.items[i]
    }
}

/// Ordered list of matrices
#[derive(Clone, Debug, Default)]
pub struct MultiMatrix<T: Element> {
    items: Vec<DMatrix<T>>,
}

impl<T: Element> MultiMatrix<T> {
    /// `count` empty matrices
    pub fn new(count: usize) -> Self {
        Self {
            items: (0..count).map(|_| DMatrix::default()).collect(),
        }
    }

    /// `count` independent copies of `proto`
    pub fn filled(proto: &DMatrix<T>, count: usize) -> Self {
        Self {
            items: (0..count).map(|_| proto.deep_copy()).collect(),
        }
    }

    /// Replace the members with copies of `list`, growing when `list` is longer
    ///
    /// Members past the end of `list` are kept.
    pub fn assign_from(&mut self, list: &[DMatrix<T>]) -> &mut Self {
        if self.items.len() < list.len() {
            self.items.resize_with(list.len(), DMatrix::default);
        }
        for (dst, src) in self.items.iter_mut().zip(list) {
            *dst = src.deep_copy();
        }
        self
    }

    /// The same block of every member
    ///
    /// # Panics
    /// If the block is out of range for any member.
    #[track_caller]
    pub fn views(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Views<'_, T> {
        self.try_views(x0, x1, y0, y1).or_fatal()
    }

    /// The same block of every member (fallible version)
    pub fn try_views(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Result<Views<'_, T>> {
        self.try_views_n(self.items.len(), 0, x0, x1, y0, y1)
    }

    /// The same block of `count` members starting at `offset`
    pub fn try_views_n(
        &self,
        count: usize,
        offset: usize,
        x0: usize,
        x1: usize,
        y0: usize,
        y1: usize,
    ) -> Result<Views<'_, T>> {
        let end = offset + count;
        let members = self.items.get(offset..end).ok_or(Error::IndexOutOfBounds {
            index: end,
            size: self.items.len(),
        })?;
        members.iter().map(|m| m.try_block(x0, x1, y0, y1)).collect()
    }
}

impl<T: Element> From<Vec<DMatrix<T>>> for MultiMatrix<T> {
    fn from(items: Vec<DMatrix<T>>) -> Self {
        Self { items }
    }
}

impl<T: Element> FromIterator<DMatrix<T>> for MultiMatrix<T> {
    fn from_iter<I: IntoIterator<Item = DMatrix<T>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: Element> Deref for MultiMatrix<T> {
    type Target = Vec<DMatrix<T>>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T: Element> DerefMut for MultiMatrix<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}
