//! Dense matrix value type
//!
//! [`Matrix<T, S>`] pairs a storage backend `S` with a [`Format`]. Buffers are
//! always addressed row-major: element `(r, c)` is at linear index
//! `r * cols + c`.
//!
//! | Alias | Storage | Extents |
//! |-------|---------|---------|
//! | [`DMatrix<T>`] | [`HeapStorage`] | runtime |
//! | [`SMatrix<T, R, C>`] | [`StackStorage`] | compile time |
//!
//! Device-resident matrices are a separate type, [`DeviceMatrix`], because
//! their elements are not host-addressable.

mod device;
mod display;
mod format;
mod interop;
mod random;
mod reduce;
mod view;

pub use device::DeviceMatrix;
pub use format::{Format, Layout, Structure};
pub use interop::ForeignDense;
pub use view::{MatrixView, MatrixViewMut};

use crate::dtype::Element;
use crate::error::{Error, OrFatal, Result, fatal};
use crate::expr::{BinaryScalar, Expression, MulOp, Shape};
use crate::storage::{HeapStorage, HostStorage, Location, Ownership, StackStorage};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Dense 2-D matrix
pub struct Matrix<T: Element, S: HostStorage<T> = HeapStorage<T>> {
    storage: S,
    format: Format,
    _marker: PhantomData<T>,
}

/// Heap-allocated matrix with runtime extents
pub type DMatrix<T> = Matrix<T, HeapStorage<T>>;

/// Inline matrix with compile-time extents
pub type SMatrix<T, const R: usize, const C: usize> = Matrix<T, StackStorage<T, R, C>>;

/// 2x2 inline matrix
pub type Matrix2<T> = SMatrix<T, 2, 2>;
/// 3x3 inline matrix
pub type Matrix3<T> = SMatrix<T, 3, 3>;
/// 4x4 inline matrix
pub type Matrix4<T> = SMatrix<T, 4, 4>;
/// 2-element inline column vector
pub type Vector2<T> = SMatrix<T, 2, 1>;
/// 3-element inline column vector
pub type Vector3<T> = SMatrix<T, 3, 1>;
/// 4-element inline column vector
pub type Vector4<T> = SMatrix<T, 4, 1>;

impl<T: Element, S: HostStorage<T>> Matrix<T, S> {
    /// Wrap a storage value
    pub fn from_storage(storage: S) -> Self {
        Self {
            storage,
            format: Format::default(),
            _marker: PhantomData,
        }
    }

    /// Create a zero-filled matrix
    ///
    /// # Panics
    ///
    /// Panics if allocation fails or, for fixed-size storage, if the extents
    /// differ from the compile-time ones. For a fallible alternative, use
    /// [`Self::try_new`].
    #[track_caller]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::try_new(rows, cols).or_fatal()
    }

    /// Create a zero-filled matrix (fallible version)
    pub fn try_new(rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::from_storage(S::allocate(rows, cols)?))
    }

    /// Create a matrix with every element set to `value`
    #[track_caller]
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::try_filled(rows, cols, value).or_fatal()
    }

    /// Create a matrix with every element set to `value` (fallible version)
    pub fn try_filled(rows: usize, cols: usize, value: T) -> Result<Self> {
        Ok(Self::from_storage(S::filled(rows, cols, value)?))
    }

    /// Create a matrix from row-major values
    ///
    /// # Panics
    ///
    /// Panics if `data` holds fewer than `rows * cols` values. Extra values are
    /// ignored. For a fallible alternative, use [`Self::try_from_slice`].
    #[track_caller]
    pub fn from_slice(rows: usize, cols: usize, data: &[T]) -> Self {
        Self::try_from_slice(rows, cols, data).or_fatal()
    }

    /// Create a matrix from row-major values (fallible version)
    pub fn try_from_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        let len = rows * cols;
        if data.len() < len {
            return Err(Error::IndexOutOfBounds {
                index: len,
                size: data.len(),
            });
        }
        let mut m = Self::try_new(rows, cols)?;
        m.as_mut_slice().copy_from_slice(&data[..len]);
        Ok(m)
    }

    /// Create a matrix from the first `rows * cols` values of an iterator
    #[allow(clippy::should_implement_trait)]
    #[track_caller]
    pub fn from_iter<I: IntoIterator<Item = T>>(rows: usize, cols: usize, iter: I) -> Self {
        Self::try_from_iter(rows, cols, iter).or_fatal()
    }

    /// Create a matrix from the first `rows * cols` values of an iterator
    /// (fallible version)
    pub fn try_from_iter<I: IntoIterator<Item = T>>(rows: usize, cols: usize, iter: I) -> Result<Self> {
        let mut m = Self::try_new(rows, cols)?;
        let len = m.size();
        let mut written = 0;
        for (dst, v) in m.as_mut_slice().iter_mut().zip(iter) {
            *dst = v;
            written += 1;
        }
        if written < len {
            return Err(Error::IndexOutOfBounds {
                index: len,
                size: written,
            });
        }
        Ok(m)
    }

    /// Create a matrix from nested rows of equal length
    #[track_caller]
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Self {
        Self::try_from_rows(rows).or_fatal()
    }

    /// Create a matrix from nested rows of equal length (fallible version)
    pub fn try_from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut m = Self::try_new(rows.len(), cols)?;
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::shape_mismatch((1, cols), (1, row.len())));
            }
            m.as_mut_slice()[r * cols..(r + 1) * cols].copy_from_slice(row);
        }
        Ok(m)
    }

    /// Stack equally long vectors as the rows of a matrix
    #[track_caller]
    pub fn stack_rows<R: AsRef<[T]>>(rows: &[R]) -> Self {
        Self::from_rows(rows)
    }

    /// Stack equally long vectors as the columns of a matrix
    #[track_caller]
    pub fn stack_cols<C: AsRef<[T]>>(cols: &[C]) -> Self {
        Self::try_stack_cols(cols).or_fatal()
    }

    /// Stack equally long vectors as the columns of a matrix (fallible version)
    pub fn try_stack_cols<C: AsRef<[T]>>(cols: &[C]) -> Result<Self> {
        let rows = cols.first().map_or(0, |c| c.as_ref().len());
        let n = cols.len();
        let mut m = Self::try_new(rows, n)?;
        for (c, col) in cols.iter().enumerate() {
            let col = col.as_ref();
            if col.len() != rows {
                return Err(Error::shape_mismatch((rows, 1), (col.len(), 1)));
            }
            for (r, &v) in col.iter().enumerate() {
                m.as_mut_slice()[r * n + c] = v;
            }
        }
        Ok(m)
    }

    /// Create a matrix whose element `(r, c)` is `f(r, c)`
    pub fn from_fn<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.as_mut_slice()[r * cols + c] = f(r, c);
            }
        }
        m
    }

    /// Materialize an expression into a new matrix
    #[track_caller]
    pub fn from_expr<E: Expression<Elem = T>>(expr: &E) -> Self {
        let mut m = Self::new(expr.rows(), expr.cols());
        expr.write_into(m.as_mut_slice());
        m
    }

    /// All-zero matrix
    #[track_caller]
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols)
    }

    /// `n x n` identity
    #[track_caller]
    pub fn identity(n: usize) -> Self {
        Self::diag(T::one(), n)
    }

    /// `n x n` matrix with `value` on the diagonal and zeros elsewhere
    #[track_caller]
    pub fn diag(value: T, n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.as_mut_slice()[i * n + i] = value;
        }
        m
    }

    // ===== Accessors =====

    /// Row count
    #[inline]
    pub fn rows(&self) -> usize {
        self.storage.rows()
    }

    /// Column count
    #[inline]
    pub fn cols(&self) -> usize {
        self.storage.cols()
    }

    /// Element count (`rows * cols`)
    #[inline]
    pub fn size(&self) -> usize {
        self.storage.len()
    }

    /// Extents as a [`Shape`]
    #[inline]
    pub fn shape(&self) -> Shape {
        Shape::new(self.rows(), self.cols())
    }

    /// True for a matrix without elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// True for `n x n`
    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Elements between the starts of consecutive rows
    #[inline]
    pub fn pitch(&self) -> usize {
        self.storage.pitch()
    }

    /// Where the buffer lives
    #[inline]
    pub fn location(&self) -> Location {
        self.storage.location()
    }

    /// Ownership tag of the storage handle
    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.storage.ownership()
    }

    /// Layout and structure tags
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Replace the layout and structure tags
    pub fn set_format(&mut self, format: Format) -> &mut Self {
        self.format = format;
        self
    }

    /// Builder form of [`set_format`](Self::set_format)
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// The storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Elements in row-major order
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Mutable elements in row-major order
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Pointer to the first element (null for an empty husk)
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.as_ptr()
    }

    // ===== Element access =====

    /// Element at linear index `i`
    ///
    /// # Panics
    /// If `i >= size`.
    #[inline]
    #[track_caller]
    pub fn at(&self, i: usize) -> T {
        self.as_slice()[i]
    }

    /// Mutable element at linear index `i`
    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }

    /// Element at linear index `i` without a bounds check
    ///
    /// # Safety
    /// `i` must be less than [`size`](Self::size).
    #[inline]
    pub unsafe fn at_unchecked(&self, i: usize) -> T {
        debug_assert!(i < self.size(), "index {i} out of bounds for {}", self.shape());
        // SAFETY: upheld by the caller
        unsafe { *self.as_slice().get_unchecked(i) }
    }

    /// Element at `(r, c)`
    ///
    /// # Panics
    /// If `r` or `c` is outside the extents.
    #[inline]
    #[track_caller]
    pub fn get(&self, r: usize, c: usize) -> T {
        self.at(self.linear_index(r, c))
    }

    /// Mutable element at `(r, c)`
    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self, r: usize, c: usize) -> &mut T {
        let i = self.linear_index(r, c);
        self.at_mut(i)
    }

    #[inline]
    #[track_caller]
    fn linear_index(&self, r: usize, c: usize) -> usize {
        if r >= self.rows() || c >= self.cols() {
            fatal(Error::IndexOutOfBounds {
                index: r.saturating_mul(self.cols()).saturating_add(c),
                size: self.size(),
            });
        }
        r * self.cols() + c
    }

    // ===== Views =====

    /// The whole matrix as a view
    pub fn view(&self) -> MatrixView<'_, T> {
        MatrixView::new(self.as_slice(), self.rows(), self.cols(), self.cols())
    }

    /// Row `i` as a `1 x cols` view
    ///
    /// # Panics
    /// If `i >= rows`.
    #[track_caller]
    pub fn row(&self, i: usize) -> MatrixView<'_, T> {
        self.try_row(i).or_fatal()
    }

    /// Row `i` as a `1 x cols` view (fallible version)
    pub fn try_row(&self, i: usize) -> Result<MatrixView<'_, T>> {
        self.try_block(0, self.cols(), i, i + 1)
    }

    /// Column `i` as a `rows x 1` view
    ///
    /// # Panics
    /// If `i >= cols`.
    #[track_caller]
    pub fn col(&self, i: usize) -> MatrixView<'_, T> {
        self.try_col(i).or_fatal()
    }

    /// Column `i` as a `rows x 1` view (fallible version)
    pub fn try_col(&self, i: usize) -> Result<MatrixView<'_, T>> {
        self.try_block(i, i + 1, 0, self.rows())
    }

    /// Columns `x0..x1` of rows `y0..y1` as a view
    ///
    /// # Panics
    /// If a range is reversed or exceeds the matrix.
    #[track_caller]
    pub fn block(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> MatrixView<'_, T> {
        self.try_block(x0, x1, y0, y1).or_fatal()
    }

    /// Columns `x0..x1` of rows `y0..y1` as a view (fallible version)
    pub fn try_block(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Result<MatrixView<'_, T>> {
        let (start, rows, cols) = self.block_range(x0, x1, y0, y1)?;
        let stride = self.cols();
        let data = if rows == 0 || cols == 0 {
            &[]
        } else {
            &self.as_slice()[start..]
        };
        Ok(MatrixView::new(data, rows, cols, stride))
    }

    /// Mutable row view
    #[track_caller]
    pub fn row_mut(&mut self, i: usize) -> MatrixViewMut<'_, T> {
        let cols = self.cols();
        self.block_mut(0, cols, i, i + 1)
    }

    /// Mutable column view
    #[track_caller]
    pub fn col_mut(&mut self, i: usize) -> MatrixViewMut<'_, T> {
        let rows = self.rows();
        self.block_mut(i, i + 1, 0, rows)
    }

    /// Mutable block view, see [`block`](Self::block)
    #[track_caller]
    pub fn block_mut(&mut self, x0: usize, x1: usize, y0: usize, y1: usize) -> MatrixViewMut<'_, T> {
        let (start, rows, cols) = self.block_range(x0, x1, y0, y1).or_fatal();
        let stride = self.cols();
        let data: &mut [T] = if rows == 0 || cols == 0 {
            &mut []
        } else {
            &mut self.as_mut_slice()[start..]
        };
        MatrixViewMut::new(data, rows, cols, stride)
    }

    fn block_range(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Result<(usize, usize, usize)> {
        for (lo, hi, size) in [(x0, x1, self.cols()), (y0, y1, self.rows())] {
            if hi > size {
                return Err(Error::IndexOutOfBounds { index: hi, size });
            }
            if lo > hi {
                return Err(Error::IndexOutOfBounds { index: lo, size: hi });
            }
        }
        Ok((y0 * self.cols() + x0, y1 - y0, x1 - x0))
    }

    // ===== Iterators =====

    /// Iterate over elements in row-major order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterate mutably over elements in row-major order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Iterate over the elements of row `r`
    #[track_caller]
    pub fn row_iter(&self, r: usize) -> std::slice::Iter<'_, T> {
        if r >= self.rows() {
            fatal(Error::IndexOutOfBounds {
                index: r,
                size: self.rows(),
            });
        }
        let cols = self.cols();
        self.as_slice()[r * cols..(r + 1) * cols].iter()
    }

    /// Iterate over the elements of column `c`
    #[track_caller]
    pub fn col_iter(&self, c: usize) -> std::iter::StepBy<std::slice::Iter<'_, T>> {
        if c >= self.cols() {
            fatal(Error::IndexOutOfBounds {
                index: c,
                size: self.cols(),
            });
        }
        self.as_slice()[c..].iter().step_by(self.cols())
    }

    /// Iterate over the rows as `1 x cols` views
    pub fn rows_iter(&self) -> impl Iterator<Item = MatrixView<'_, T>> + '_ {
        (0..self.rows()).map(move |r| self.row(r))
    }

    // ===== Copy / move =====

    /// Handle that shares this matrix's buffer (value copy for inline storage)
    pub fn share(&self) -> Self {
        Self {
            storage: self.storage.share(),
            format: self.format,
            _marker: PhantomData,
        }
    }

    /// Independent owning copy
    #[track_caller]
    pub fn deep_copy(&self) -> Self {
        let mut m = Self::from_slice(self.rows(), self.cols(), self.as_slice());
        m.format = self.format;
        m
    }

    /// Move the storage out, leaving `self` as an empty 0x0 husk
    pub fn take(&mut self) -> Self {
        let format = std::mem::take(&mut self.format);
        Self {
            storage: self.storage.take(),
            format,
            _marker: PhantomData,
        }
    }

    // ===== Assignment =====

    /// Materialize `expr` into this matrix
    ///
    /// An empty or differently shaped dynamic matrix is reallocated to the
    /// expression's shape first. A matrix sharing its buffer with another
    /// handle is detached onto a private copy before it is written, so the
    /// expression may read from any alias of `self`.
    /// Fixed-size storage accepts only its own extents.
    pub fn try_assign_from<E: Expression<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        let shape = expr.shape();
        if shape != self.shape() {
            if !S::DYNAMIC && !self.is_empty() {
                return Err(Error::shape_mismatch(self.shape().into(), shape.into()));
            }
            self.storage.reallocate(shape.rows, shape.cols)?;
        }
        expr.write_into(self.as_mut_slice());
        Ok(())
    }

    /// Materialize `expr` into this matrix
    ///
    /// # Panics
    /// On a shape mismatch with fixed-size storage.
    #[track_caller]
    pub fn assign<E: Expression<Elem = T>>(&mut self, expr: E) -> &mut Self {
        self.try_assign_from(&expr).or_fatal();
        self
    }

    /// Assign from a list of values; a single value is written to every element
    #[track_caller]
    pub fn assign_values(&mut self, values: &[T]) -> &mut Self {
        self.try_assign_values(values).or_fatal();
        self
    }

    /// Assign from a list of values (fallible version)
    pub fn try_assign_values(&mut self, values: &[T]) -> Result<()> {
        let len = self.size();
        match values {
            [v] => self.as_mut_slice().fill(*v),
            _ if values.len() >= len => self.as_mut_slice().copy_from_slice(&values[..len]),
            _ => {
                return Err(Error::IndexOutOfBounds {
                    index: len,
                    size: values.len(),
                });
            }
        }
        Ok(())
    }

    // ===== Element-wise helpers =====

    /// Apply `f` to every element in place
    pub fn each<F: FnMut(&mut T)>(&mut self, f: F) -> &mut Self {
        self.as_mut_slice().iter_mut().for_each(f);
        self
    }

    /// Replace every element satisfying `pred` with `value`
    pub fn replace_where<P: Fn(&T) -> bool>(&mut self, pred: P, value: T) -> &mut Self {
        self.each(|v| {
            if pred(v) {
                *v = value;
            }
        })
    }

    /// Lazily scale by `1 / scale`, or by `1 / max()` when `scale` is `None`
    ///
    /// A divisor whose magnitude is below machine epsilon leaves the values
    /// unscaled.
    pub fn normalize(&self, scale: Option<T>) -> BinaryScalar<&Self, MulOp> {
        let divisor = match scale {
            Some(s) => s.to_f64(),
            None if self.is_empty() => 1.0,
            None => self.max().to_f64(),
        };
        let factor = if divisor.abs() < f64::EPSILON {
            1.0
        } else {
            1.0 / divisor
        };
        BinaryScalar::new(self, T::from_f64(factor))
    }

    /// Copy surrounded by a border of `n` zeros on every side
    pub fn pad_zero(&self, n: usize) -> DMatrix<T> {
        let (rows, cols) = (self.rows(), self.cols());
        let mut out = DMatrix::new(rows + 2 * n, cols + 2 * n);
        let mut inner = out.block_mut(n, n + cols, n, n + rows);
        inner.assign(self);
        out
    }

    /// Whether `a(r, c) == a(c, r)` for every element
    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.rows();
        let a = self.as_slice();
        (0..n).all(|r| (r + 1..n).all(|c| a[r * n + c] == a[c * n + r]))
    }
}

impl<T: Element> DMatrix<T> {
    /// Reallocate to `rows x cols` zeros, dropping the previous buffer handle
    #[track_caller]
    pub fn create(&mut self, rows: usize, cols: usize) -> &mut Self {
        self.try_create(rows, cols).or_fatal();
        self
    }

    /// Reallocate to `rows x cols` zeros (fallible version)
    pub fn try_create(&mut self, rows: usize, cols: usize) -> Result<()> {
        self.storage.reallocate(rows, cols)
    }

    /// Reallocate to `rows x cols` with every element set to `value`
    #[track_caller]
    pub fn create_filled(&mut self, rows: usize, cols: usize, value: T) -> &mut Self {
        self.create(rows, cols);
        self.as_mut_slice().fill(value);
        self
    }

    /// Create a matrix holding the first `rows * cols` values of `data`
    #[track_caller]
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Self {
        Self::from_slice(rows, cols, &data)
    }

    /// Wrap caller memory as a proxy matrix that never frees it
    ///
    /// # Safety
    /// See [`HeapStorage::from_raw_parts`].
    pub unsafe fn from_raw_parts(ptr: *mut T, rows: usize, cols: usize) -> Self {
        // SAFETY: forwarded contract
        Self::from_storage(unsafe { HeapStorage::from_raw_parts(ptr, rows, cols) })
    }

    /// Number of handles sharing the buffer
    pub fn ref_count(&self) -> usize {
        self.storage.ref_count()
    }
}

impl<T: Element, const R: usize, const C: usize> SMatrix<T, R, C> {
    /// Create an inline matrix from nested rows
    pub fn from_array(data: [[T; C]; R]) -> Self {
        Self::from_storage(StackStorage::from_array(data))
    }
}

impl<T: Element, S: HostStorage<T>> Expression for Matrix<T, S> {
    type Elem = T;

    #[inline]
    fn shape(&self) -> Shape {
        Shape::new(self.rows(), self.cols())
    }

    #[inline]
    fn eval_at(&self, i: usize) -> T {
        self.as_slice()[i]
    }

    fn write_into(&self, out: &mut [T]) {
        out.copy_from_slice(self.as_slice());
    }
}

impl<T: Element, S: HostStorage<T>> Default for Matrix<T, S> {
    /// Empty 0x0 for dynamic storage, zeros for fixed-size storage
    fn default() -> Self {
        Self::from_storage(S::default())
    }
}

impl<T: Element, S: HostStorage<T>> Clone for Matrix<T, S> {
    /// Deep copy of an owning matrix; aliasing copy of a reference or proxy
    fn clone(&self) -> Self {
        match self.ownership() {
            Ownership::Owner => self.deep_copy(),
            Ownership::Empty => Self::default().with_format(self.format),
            Ownership::Reference | Ownership::Proxy => self.share(),
        }
    }
}

impl<T: Element, S: HostStorage<T>, S2: HostStorage<T>> PartialEq<Matrix<T, S2>> for Matrix<T, S> {
    fn eq(&self, other: &Matrix<T, S2>) -> bool {
        self.shape() == other.shape() && self.as_slice() == other.as_slice()
    }
}

impl<T: Element, S: HostStorage<T>> Index<usize> for Matrix<T, S> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Element, S: HostStorage<T>> IndexMut<usize> for Matrix<T, S> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, i: usize) -> &mut T {
        self.at_mut(i)
    }
}

impl<T: Element, S: HostStorage<T>> Index<(usize, usize)> for Matrix<T, S> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, (r, c): (usize, usize)) -> &T {
        &self.as_slice()[self.linear_index(r, c)]
    }
}

impl<T: Element, S: HostStorage<T>> IndexMut<(usize, usize)> for Matrix<T, S> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        self.get_mut(r, c)
    }
}

impl<T: Element, S: HostStorage<T>> std::fmt::Debug for Matrix<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("shape", &(self.rows(), self.cols()))
            .field("dtype", &T::DTYPE)
            .field("location", &self.location())
            .field("ownership", &self.ownership())
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_paths_agree() {
        let a = DMatrix::from_slice(2, 2, &[1, 2, 3, 4]);
        let b = DMatrix::from_iter(2, 2, 1..);
        let c = DMatrix::from_rows(&[[1, 2], [3, 4]]);
        let d = DMatrix::from_fn(2, 2, |r, c| (r * 2 + c + 1) as i32);
        let e = DMatrix::stack_cols(&[[1, 3], [2, 4]]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a, e);
    }

    #[test]
    fn test_undersized_initializers() {
        assert_eq!(
            DMatrix::<f64>::try_from_slice(2, 2, &[1.0]).err(),
            Some(Error::IndexOutOfBounds { index: 4, size: 1 })
        );
        assert!(DMatrix::<i32>::try_from_iter(3, 1, [1, 2]).is_err());
        assert!(DMatrix::<i32>::try_from_rows(&[vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_element_access() {
        let mut m = DMatrix::from_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.at(4), 5.0);
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m[(0, 1)], 2.0);
        m[(1, 0)] = 40.0;
        *m.at_mut(0) = 10.0;
        assert_eq!(m[3], 40.0);
        assert_eq!(m[0], 10.0);
    }

    #[test]
    fn test_views() {
        let m = DMatrix::from_fn(3, 4, |r, c| (r * 10 + c) as i64);
        assert_eq!(m.row(1).to_vec(), vec![10, 11, 12, 13]);
        assert_eq!(m.col(2).to_vec(), vec![2, 12, 22]);

        let b = m.block(1, 3, 1, 3);
        assert_eq!(b.shape(), Shape::new(2, 2));
        assert_eq!(b.to_vec(), vec![11, 12, 21, 22]);

        assert!(m.try_block(0, 5, 0, 1).is_err());
        assert!(m.try_row(3).is_err());
        assert!(m.try_block(2, 1, 0, 1).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_block_out_of_range_panics() {
        let m = DMatrix::<f32>::new(2, 2);
        let _ = m.block(0, 2, 1, 3);
    }

    #[test]
    fn test_mut_views_write_through() {
        let mut m = DMatrix::<i32>::new(3, 3);
        m.row_mut(0).fill(1);
        m.col_mut(2).fill(7);
        m.block_mut(0, 1, 1, 3).set(1, 0, 5);
        assert_eq!(m.as_slice(), &[1, 1, 7, 0, 0, 7, 5, 0, 7]);
    }

    #[test]
    fn test_iterators() {
        let m = DMatrix::from_slice(2, 3, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(m.row_iter(1).copied().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(m.col_iter(1).copied().collect::<Vec<_>>(), vec![2, 5]);
        let sums: Vec<i32> = m.rows_iter().map(|r| r.iter().sum()).collect();
        assert_eq!(sums, vec![6, 15]);
    }

    #[test]
    fn test_clone_semantics() {
        let owner = DMatrix::from_slice(1, 2, &[1.0, 2.0]);
        let deep = owner.clone();
        assert_ne!(deep.as_ptr(), owner.as_ptr());
        assert_eq!(deep.ownership(), Ownership::Owner);

        let alias = owner.share();
        assert_eq!(alias.ownership(), Ownership::Reference);
        let alias2 = alias.clone();
        assert_eq!(alias2.as_ptr(), owner.as_ptr());
        assert_eq!(owner.ref_count(), 3);
    }

    #[test]
    fn test_take_leaves_husk() {
        let mut src = DMatrix::from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let dst = src.take();
        assert_eq!(src.shape(), Shape::new(0, 0));
        assert!(src.as_ptr().is_null());
        assert_eq!(src.ownership(), Ownership::Empty);
        assert_eq!(dst.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_assign_reallocates_dynamic() {
        let a = DMatrix::from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut out = DMatrix::<f64>::default();
        assert!(out.is_empty());
        out.assign(&a + &a);
        assert_eq!(out.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_assign_fixed_shape_mismatch() {
        let a = DMatrix::<f64>::new(2, 3);
        let mut fixed = Matrix2::<f64>::default();
        assert!(matches!(
            fixed.try_assign_from(&&a),
            Err(Error::ShapeMismatch { .. })
        ));

        let b = DMatrix::filled(2, 2, 3.0);
        fixed.assign(&b);
        assert_eq!(fixed.as_slice(), &[3.0; 4]);
    }

    #[test]
    fn test_assign_values() {
        let mut m = DMatrix::<u8>::new(2, 2);
        m.assign_values(&[9]);
        assert_eq!(m.as_slice(), &[9; 4]);
        m.assign_values(&[1, 2, 3, 4, 5]);
        assert_eq!(m.as_slice(), &[1, 2, 3, 4]);
        assert!(m.try_assign_values(&[1, 2]).is_err());
    }

    #[test]
    fn test_factories() {
        let i = DMatrix::<f64>::identity(3);
        assert_eq!(i, DMatrix::diag(1.0, 3));
        assert_eq!(i.as_slice().iter().filter(|&&v| v == 1.0).count(), 3);
        let z = Matrix3::<i32>::zero(3, 3);
        assert!(z.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_each_replace_normalize() {
        let mut m = DMatrix::from_slice(1, 4, &[1.0, -2.0, 4.0, 0.0]);
        m.replace_where(|v| *v < 0.0, 0.0).each(|v| *v *= 2.0);
        assert_eq!(m.as_slice(), &[2.0, 0.0, 8.0, 0.0]);
        assert_eq!(m.normalize(None).eval().as_slice(), &[0.25, 0.0, 1.0, 0.0]);
        assert_eq!(m.normalize(Some(2.0)).eval().as_slice(), &[1.0, 0.0, 4.0, 0.0]);
        assert_eq!(m.normalize(Some(0.0)).eval().as_slice(), m.as_slice());
    }

    #[test]
    fn test_pad_zero() {
        let m = DMatrix::filled(1, 2, 5);
        let p = m.pad_zero(1);
        assert_eq!(p.shape(), Shape::new(3, 4));
        assert_eq!(p.as_slice(), &[0, 0, 0, 0, 0, 5, 5, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_symmetry_and_format() {
        let s = DMatrix::from_slice(2, 2, &[1.0, 2.0, 2.0, 3.0]);
        assert!(s.is_symmetric());
        assert!(!DMatrix::from_slice(2, 2, &[1.0, 2.0, 0.0, 3.0]).is_symmetric());
        let tagged = s.with_format(Format::SYMMETRIC);
        assert!(tagged.format().is_symmetric());
    }

    #[test]
    fn test_fixed_size_matrix() {
        let m = Matrix2::from_array([[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(m.location(), Location::Stack);
        assert_eq!((&m + &m).eval().as_slice(), &[2.0, 4.0, 6.0, 8.0]);
        let v = Vector3::<f32>::default();
        assert_eq!(v.shape(), Shape::new(3, 1));
    }

    #[test]
    fn test_proxy_matrix_writes_to_caller_memory() {
        let mut backing = vec![0.0f64; 4];
        {
            let mut m = unsafe { DMatrix::from_raw_parts(backing.as_mut_ptr(), 2, 2) };
            assert_eq!(m.ownership(), Ownership::Proxy);
            m.assign_values(&[1.5]);
        }
        assert_eq!(backing, vec![1.5; 4]);
    }
}
