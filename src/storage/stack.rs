//! Inline fixed-size storage

use super::{HostStorage, Location, Ownership, Storage};
use crate::dtype::Element;
use crate::error::{Error, Result};

/// Fixed `R x C` storage held inline (on the stack when the matrix is)
///
/// Extents are compile-time constants; the runtime `rows`/`cols` fields only
/// drop to zero when the storage has been moved out of with `take()`.
#[derive(Clone)]
pub struct StackStorage<T: Element, const R: usize, const C: usize> {
    data: [[T; C]; R],
    rows: usize,
    cols: usize,
    ownership: Ownership,
}

impl<T: Element, const R: usize, const C: usize> StackStorage<T, R, C> {
    /// Wrap a nested row array
    pub fn from_array(data: [[T; C]; R]) -> Self {
        Self {
            data,
            rows: R,
            cols: C,
            ownership: Ownership::Owner,
        }
    }

    fn check_extents(rows: usize, cols: usize) -> Result<()> {
        if (rows, cols) != (R, C) {
            return Err(Error::shape_mismatch((R, C), (rows, cols)));
        }
        Ok(())
    }
}

impl<T: Element, const R: usize, const C: usize> Storage<T> for StackStorage<T, R, C> {
    #[inline]
    fn location(&self) -> Location {
        Location::Stack
    }

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn share(&self) -> Self {
        // Inline buffers cannot be aliased: copy-construction copies values
        Self {
            data: self.data,
            rows: self.rows,
            cols: self.cols,
            ownership: match self.ownership {
                Ownership::Empty => Ownership::Empty,
                _ => Ownership::Owner,
            },
        }
    }

    fn take(&mut self) -> Self {
        let moved = Self {
            data: self.data,
            rows: self.rows,
            cols: self.cols,
            ownership: self.ownership,
        };
        self.rows = 0;
        self.cols = 0;
        self.ownership = Ownership::Empty;
        moved
    }
}

impl<T: Element, const R: usize, const C: usize> HostStorage<T> for StackStorage<T, R, C> {
    const DYNAMIC: bool = false;

    fn allocate(rows: usize, cols: usize) -> Result<Self> {
        Self::check_extents(rows, cols)?;
        Ok(Self::default())
    }

    fn reallocate(&mut self, rows: usize, cols: usize) -> Result<()> {
        Self::check_extents(rows, cols)?;
        *self = Self::default();
        Ok(())
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        &self.data.as_flattened()[..self.rows * self.cols]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.rows * self.cols;
        &mut self.data.as_flattened_mut()[..len]
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        if self.is_empty() {
            std::ptr::null()
        } else {
            self.data.as_flattened().as_ptr()
        }
    }
}

impl<T: Element, const R: usize, const C: usize> Default for StackStorage<T, R, C> {
    fn default() -> Self {
        Self::from_array([[T::zero(); C]; R])
    }
}

impl<T: Element, const R: usize, const C: usize> std::fmt::Debug for StackStorage<T, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackStorage")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("ownership", &self.ownership)
            .field("data", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_copies_values() {
        let mut a = StackStorage::<f64, 2, 2>::from_array([[1.0, 2.0], [3.0, 4.0]]);
        let b = a.share();
        a.as_mut_slice()[0] = 9.0;

        assert_eq!(b.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(b.ownership(), Ownership::Owner);
        assert_ne!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_take_zeroes_source() {
        let mut a = StackStorage::<i32, 1, 3>::from_array([[1, 2, 3]]);
        let b = a.take();

        assert_eq!((a.rows(), a.cols(), a.len()), (0, 0, 0));
        assert!(a.as_ptr().is_null());
        assert_eq!(a.ownership(), Ownership::Empty);
        assert_eq!(b.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_fixed_extents_are_enforced() {
        assert!(StackStorage::<f32, 3, 3>::allocate(3, 3).is_ok());
        assert_eq!(
            StackStorage::<f32, 3, 3>::allocate(2, 3).unwrap_err(),
            Error::shape_mismatch((3, 3), (2, 3))
        );
    }
}
