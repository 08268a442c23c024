//! Host memory allocator trait and the aligned default implementation

use crate::error::{Error, Result};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of every host buffer (AVX-512 friendly)
pub const HOST_ALIGNMENT: usize = 64;

/// Memory allocator used by host storage and by host-backed devices
///
/// Pointers travel as `u64` so that host and device addresses share one
/// representation.
pub trait Allocator: Clone + Send + Sync {
    /// Allocate `size_bytes` zeroed bytes
    ///
    /// A zero-byte request returns the null address `0`.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Release memory obtained from `allocate` with the same size
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Total bytes currently allocated, when tracked
    fn allocated_bytes(&self) -> usize {
        0
    }
}

/// System allocator with [`HOST_ALIGNMENT`]-byte alignment
#[derive(Clone, Copy, Debug, Default)]
pub struct AlignedAllocator;

impl AlignedAllocator {
    fn layout(size_bytes: usize) -> Result<AllocLayout> {
        AllocLayout::from_size_align(size_bytes, HOST_ALIGNMENT)
            .map_err(|_| Error::OutOfMemory { size: size_bytes })
    }
}

impl Allocator for AlignedAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        let layout = Self::layout(size_bytes)?;
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(Error::OutOfMemory { size: size_bytes });
        }

        log::trace!("host alloc {size_bytes} bytes at 0x{:x}", ptr as u64);
        Ok(ptr as u64)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        if let Ok(layout) = Self::layout(size_bytes) {
            log::trace!("host free {size_bytes} bytes at 0x{ptr:x}");
            // SAFETY: ptr came from `allocate` with this exact layout
            unsafe { dealloc(ptr as *mut u8, layout) };
        }
    }
}
