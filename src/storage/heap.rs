//! Heap storage: Arc-shared host buffers

use super::{AlignedAllocator, Allocator, HostStorage, Location, Ownership, Storage};
use crate::dtype::Element;
use crate::error::{Error, OrFatal, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// Host heap storage with reference-counted sharing
///
/// `share()` hands out aliasing handles to the same buffer (zero-copy). The
/// buffer is released when the last handle is dropped, and only if it was
/// allocated here; proxies over caller memory never free.
///
/// Mutable access is copy-on-write: a handle whose buffer is shared detaches
/// into a private owning copy before the first write, so a buffer is only ever
/// written through its single remaining handle.
pub struct HeapStorage<T: Element> {
    inner: Option<Arc<HeapBuffer>>,
    rows: usize,
    cols: usize,
    ownership: Ownership,
    _marker: PhantomData<T>,
}

struct HeapBuffer {
    /// Host pointer cast to u64
    ptr: u64,
    /// Allocation size, needed to rebuild the layout on free
    size_bytes: usize,
    /// If true, we allocated this memory and deallocate on drop
    owned: bool,
}

impl Drop for HeapBuffer {
    fn drop(&mut self) {
        if self.owned && self.ptr != 0 {
            AlignedAllocator.deallocate(self.ptr, self.size_bytes);
        }
    }
}

impl<T: Element> HeapStorage<T> {
    fn from_buffer(ptr: u64, rows: usize, cols: usize, owned: bool) -> Self {
        let size_bytes = rows * cols * std::mem::size_of::<T>();
        Self {
            inner: Some(Arc::new(HeapBuffer {
                ptr,
                size_bytes,
                owned,
            })),
            rows,
            cols,
            ownership: if owned {
                Ownership::Owner
            } else {
                Ownership::Proxy
            },
            _marker: PhantomData,
        }
    }

    /// Create storage holding a copy of `data`
    ///
    /// `data` must supply at least `rows * cols` elements; extra elements are ignored.
    pub fn from_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        let len = rows * cols;
        if data.len() < len {
            return Err(Error::IndexOutOfBounds {
                index: len,
                size: data.len(),
            });
        }
        let mut storage = Self::allocate(rows, cols)?;
        storage.as_mut_slice().copy_from_slice(&data[..len]);
        Ok(storage)
    }

    /// Wrap existing memory without taking ownership
    ///
    /// # Safety
    /// - `ptr` must be valid for reads and writes of `rows * cols` elements of `T`
    /// - `ptr` must be aligned for `T`
    /// - The memory must outlive this storage and every handle shared from it
    pub unsafe fn from_raw_parts(ptr: *mut T, rows: usize, cols: usize) -> Self {
        Self::from_buffer(ptr as u64, rows, cols, false)
    }

    /// Take ownership of memory allocated by [`AlignedAllocator`]
    ///
    /// # Safety
    /// `ptr` must come from `AlignedAllocator::allocate` with a size of exactly
    /// `rows * cols * size_of::<T>()` bytes, and nobody else may free it.
    pub(crate) unsafe fn adopt_raw(ptr: u64, rows: usize, cols: usize) -> Self {
        Self::from_buffer(ptr, rows, cols, true)
    }

    /// Give up the buffer if this is its only owning handle
    ///
    /// On success returns the `AlignedAllocator` pointer, which the caller must
    /// free. Otherwise the storage is handed back untouched.
    pub(crate) fn into_raw(mut self) -> std::result::Result<u64, Self> {
        if self.ownership != Ownership::Owner || !self.is_unique() {
            return Err(self);
        }
        match self.inner.take().map(Arc::try_unwrap) {
            Some(Ok(mut buffer)) => {
                buffer.owned = false;
                Ok(buffer.ptr)
            }
            Some(Err(shared)) => {
                self.inner = Some(shared);
                Err(self)
            }
            None => Err(self),
        }
    }

    /// Number of handles sharing the buffer
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Arc::strong_count)
    }

    /// Check if this is the only handle
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    #[inline]
    fn raw_ptr(&self) -> u64 {
        self.inner.as_ref().map_or(0, |b| b.ptr)
    }

    /// Replace a shared buffer with a private copy
    #[track_caller]
    fn detach(&mut self) {
        log::trace!(
            "detaching {}x{} {} buffer shared by {} handles",
            self.rows,
            self.cols,
            T::DTYPE,
            self.ref_count()
        );
        *self = Self::from_slice(self.rows, self.cols, self.as_slice()).or_fatal();
    }
}

impl<T: Element> Storage<T> for HeapStorage<T> {
    #[inline]
    fn location(&self) -> Location {
        Location::Heap
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
        Self {
            inner: self.inner.clone(),
            rows: self.rows,
            cols: self.cols,
            ownership: match self.ownership {
                Ownership::Empty => Ownership::Empty,
                _ => Ownership::Reference,
            },
            _marker: PhantomData,
        }
    }

    fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<T: Element> HostStorage<T> for HeapStorage<T> {
    const DYNAMIC: bool = true;

    fn allocate(rows: usize, cols: usize) -> Result<Self> {
        let size_bytes = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(std::mem::size_of::<T>()))
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let ptr = AlignedAllocator.allocate(size_bytes)?;
        Ok(Self::from_buffer(ptr, rows, cols, true))
    }

    fn reallocate(&mut self, rows: usize, cols: usize) -> Result<()> {
        *self = Self::allocate(rows, cols)?;
        Ok(())
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        let ptr = self.raw_ptr();
        if ptr == 0 {
            return &[];
        }
        // SAFETY: the buffer holds rows * cols initialized (zeroed at least) elements
        // and stays alive while `self` holds its Arc
        unsafe { std::slice::from_raw_parts(ptr as *const T, self.len()) }
    }

    #[inline]
    #[track_caller]
    fn as_mut_slice(&mut self) -> &mut [T] {
        if self.raw_ptr() == 0 {
            return &mut [];
        }
        if !self.is_unique() {
            self.detach();
        }
        // SAFETY: as in `as_slice`; `&mut self` on the only handle to the buffer
        // rules out any other live borrow of it
        unsafe { std::slice::from_raw_parts_mut(self.raw_ptr() as *mut T, self.len()) }
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        self.raw_ptr() as *const T
    }
}

impl<T: Element> Default for HeapStorage<T> {
    fn default() -> Self {
        Self {
            inner: None,
            rows: 0,
            cols: 0,
            ownership: Ownership::Empty,
            _marker: PhantomData,
        }
    }
}

impl<T: Element> std::fmt::Debug for HeapStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapStorage")
            .field("ptr", &format!("0x{:x}", self.raw_ptr()))
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("dtype", &T::DTYPE)
            .field("ownership", &self.ownership)
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_aliases_buffer() {
        let owner = HeapStorage::<f64>::filled(2, 2, 1.0).unwrap();
        let alias = owner.share();

        assert_eq!(owner.ownership(), Ownership::Owner);
        assert_eq!(alias.ownership(), Ownership::Reference);
        assert_eq!(owner.ref_count(), 2);
        assert_eq!(owner.as_ptr(), alias.as_ptr());
    }

    #[test]
    fn test_write_detaches_shared_buffer() {
        let mut owner = HeapStorage::<f64>::filled(2, 2, 1.0).unwrap();
        let mut alias = owner.share();
        let shared = owner.as_ptr();

        alias.as_mut_slice()[3] = 7.0;
        assert_ne!(alias.as_ptr(), shared);
        assert_eq!(alias.ownership(), Ownership::Owner);
        assert_eq!(alias.as_slice(), &[1.0, 1.0, 1.0, 7.0]);
        assert_eq!(owner.as_slice(), &[1.0; 4]);

        // the owner is unique again and writes in place
        assert!(owner.is_unique());
        owner.as_mut_slice()[0] = 2.0;
        assert_eq!(owner.as_ptr(), shared);
    }

    #[test]
    fn test_alias_outlives_owner() {
        let owner = HeapStorage::<i32>::from_slice(1, 3, &[1, 2, 3]).unwrap();
        let alias = owner.share();
        drop(owner);
        assert_eq!(alias.as_slice(), &[1, 2, 3]);
        assert!(alias.is_unique());
    }

    #[test]
    fn test_take_leaves_husk() {
        let mut src = HeapStorage::<f32>::filled(3, 2, 2.5).unwrap();
        let ptr = src.as_ptr();
        let dst = src.take();

        assert_eq!((src.rows(), src.cols()), (0, 0));
        assert!(src.as_ptr().is_null());
        assert_eq!(src.ownership(), Ownership::Empty);
        assert_eq!(dst.as_ptr(), ptr);
        assert_eq!(dst.as_slice(), &[2.5; 6]);
    }

    #[test]
    fn test_proxy_never_frees() {
        let mut backing = vec![1.0f64, 2.0, 3.0, 4.0];
        {
            let mut proxy = unsafe { HeapStorage::from_raw_parts(backing.as_mut_ptr(), 2, 2) };
            assert_eq!(proxy.ownership(), Ownership::Proxy);
            proxy.as_mut_slice()[0] = 10.0;
        }
        assert_eq!(backing, vec![10.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_from_slice_requires_enough_values() {
        let err = HeapStorage::<f64>::from_slice(2, 2, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, Error::IndexOutOfBounds { index: 4, size: 2 });
    }

    #[test]
    fn test_into_raw_requires_unique_owner() {
        let owner = HeapStorage::<f64>::filled(1, 2, 4.0).unwrap();
        let alias = owner.share();
        let owner = owner.into_raw().unwrap_err();
        drop(alias);
        let ptr = owner.into_raw().unwrap();
        let back = unsafe { HeapStorage::<f64>::adopt_raw(ptr, 1, 2) };
        assert_eq!(back.as_slice(), &[4.0, 4.0]);
    }
}
