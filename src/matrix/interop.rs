//! Exchange of dense buffers with foreign libraries
//!
//! A [`ForeignDense`] describes a row-major buffer by extents, element tag and
//! address, the way C image and array libraries hand buffers around. Buffers
//! owned by a descriptor come from [`AlignedAllocator`] so that ownership can
//! move into a [`DMatrix`] without copying.

use super::{DMatrix, Matrix, MatrixView};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::storage::{AlignedAllocator, Allocator, HeapStorage, HostStorage};

/// Descriptor of a dense row-major buffer owned outside a matrix
#[derive(Debug)]
pub struct ForeignDense {
    rows: usize,
    cols: usize,
    dtype: DType,
    ptr: u64,
}

impl ForeignDense {
    /// Copy `data` into a new foreign-owned buffer
    pub fn from_vec<T: Element>(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let len = rows * cols;
        if data.len() < len {
            return Err(Error::IndexOutOfBounds {
                index: len,
                size: data.len(),
            });
        }
        let size_bytes = len * std::mem::size_of::<T>();
        let ptr = AlignedAllocator.allocate(size_bytes)?;
        if ptr != 0 {
            // SAFETY: fresh allocation of `len` elements, aligned for any element type
            let dst = unsafe { std::slice::from_raw_parts_mut(ptr as *mut T, len) };
            dst.copy_from_slice(&data[..len]);
        }
        Ok(Self {
            rows,
            cols,
            dtype: T::DTYPE,
            ptr,
        })
    }

    /// Row count
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element type tag
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Buffer address (`0` once ownership has moved out)
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// True when the descriptor no longer holds a buffer
    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }

    fn size_bytes(&self) -> usize {
        self.rows * self.cols * self.dtype.size_in_bytes()
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if self.dtype != T::DTYPE {
            return Err(Error::DTypeMismatch {
                lhs: T::DTYPE,
                rhs: self.dtype,
            });
        }
        Ok(())
    }
}

impl Drop for ForeignDense {
    fn drop(&mut self) {
        AlignedAllocator.deallocate(self.ptr, self.size_bytes());
    }
}

impl<T: Element> DMatrix<T> {
    /// Take over the buffer of `foreign` without copying
    ///
    /// On success the descriptor is left empty (0x0, null address).
    pub fn adopt(foreign: &mut ForeignDense) -> Result<Self> {
        foreign.check_dtype::<T>()?;
        let (rows, cols, ptr) = (foreign.rows, foreign.cols, foreign.ptr);
        foreign.rows = 0;
        foreign.cols = 0;
        foreign.ptr = 0;
        let storage = if ptr == 0 {
            HeapStorage::allocate(rows, cols)?
        } else {
            // SAFETY: the descriptor's buffer came from AlignedAllocator with exactly
            // rows * cols * size_of::<T>() bytes, and the descriptor no longer frees it
            unsafe { HeapStorage::adopt_raw(ptr, rows, cols) }
        };
        log::debug!("adopted foreign {rows}x{cols} {} buffer", T::DTYPE);
        Ok(Self::from_storage(storage))
    }

    /// Hand the buffer over to a foreign descriptor
    ///
    /// Moves without copying when this is the only handle to an owned buffer;
    /// copies otherwise.
    pub fn into_foreign(self) -> Result<ForeignDense> {
        let (rows, cols) = (self.rows(), self.cols());
        match self.storage.into_raw() {
            Ok(ptr) => Ok(ForeignDense {
                rows,
                cols,
                dtype: T::DTYPE,
                ptr,
            }),
            Err(storage) => ForeignDense::from_vec(rows, cols, storage.as_slice().to_vec()),
        }
    }
}

impl<T: Element, S: HostStorage<T>> Matrix<T, S> {
    /// Copy the elements into a new foreign descriptor
    pub fn to_foreign(&self) -> Result<ForeignDense> {
        ForeignDense::from_vec(self.rows(), self.cols(), self.as_slice().to_vec())
    }
}

impl<'a, T: Element> MatrixView<'a, T> {
    /// Borrow the buffer of `foreign` as a view
    pub fn from_foreign(foreign: &'a ForeignDense) -> Result<Self> {
        foreign.check_dtype::<T>()?;
        let len = foreign.rows * foreign.cols;
        let data: &'a [T] = if foreign.ptr == 0 || len == 0 {
            &[]
        } else {
            // SAFETY: the descriptor owns `len` elements of T (dtype checked) and
            // outlives the returned view
            unsafe { std::slice::from_raw_parts(foreign.ptr as *const T, len) }
        };
        Ok(Self::new(data, foreign.rows, foreign.cols, foreign.cols))
    }
}
