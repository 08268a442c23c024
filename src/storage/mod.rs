//! Storage backends: where a matrix buffer lives and who frees it
//!
//! A matrix owns exactly one storage value. The backends form a closed set:
//!
//! | Backend | Location | `share()` | Host access |
//! |---------|----------|-----------|-------------|
//! | [`StackStorage`] | `Stack` | value copy | yes |
//! | [`HeapStorage`] | `Heap` | `Arc` alias (`Reference`), copy-on-write | yes |
//! | [`DeviceStorage`] | `DeviceGlobal` / `DevicePitched` | `Arc` alias (`Reference`) | upload/download only |
//!
//! `take()` is the move operation: the handle is transferred and the source is
//! left as an empty husk (0x0, `Ownership::Empty`, null buffer).

mod allocator;
mod device;
mod heap;
mod stack;

pub use allocator::{AlignedAllocator, Allocator, HOST_ALIGNMENT};
pub use device::DeviceStorage;
pub use heap::HeapStorage;
pub use stack::StackStorage;

use crate::dtype::Element;
use crate::error::{Error, Result};

/// Memory location of a storage buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Location {
    /// Inline fixed-size buffer
    Stack = 0,
    /// Host heap allocation
    Heap = 1,
    /// Linear device allocation
    DeviceGlobal = 2,
    /// Pitched (row-aligned) device allocation
    DevicePitched = 3,
}

impl Location {
    /// Returns true for device-resident locations
    #[inline]
    pub const fn is_device(self) -> bool {
        matches!(self, Self::DeviceGlobal | Self::DevicePitched)
    }
}

impl TryFrom<u8> for Location {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Stack),
            1 => Ok(Self::Heap),
            2 => Ok(Self::DeviceGlobal),
            3 => Ok(Self::DevicePitched),
            _ => Err(Error::InvalidLocation(tag)),
        }
    }
}

/// Relationship between a storage handle and its buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Allocated the buffer; the last owning handle frees it
    Owner,
    /// Aliases a buffer owned elsewhere
    Reference,
    /// Wraps caller-supplied memory that is never freed here
    Proxy,
    /// Moved-from husk without a buffer
    Empty,
}

/// Common interface of every storage backend
pub trait Storage<T: Element>: Sized + Send + Sync {
    /// Where the buffer lives
    fn location(&self) -> Location;

    /// Logical row count
    fn rows(&self) -> usize;

    /// Logical column count
    fn cols(&self) -> usize;

    /// Element count
    #[inline]
    fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// True when the storage holds no elements
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance in elements between the starts of consecutive rows
    #[inline]
    fn pitch(&self) -> usize {
        self.cols()
    }

    /// Ownership tag of this handle
    fn ownership(&self) -> Ownership;

    /// Copy-construct: value copy for inline storage, aliasing handle otherwise
    fn share(&self) -> Self;

    /// Move-construct: transfer the buffer out, leaving `self` as an empty husk
    fn take(&mut self) -> Self;
}

/// Storage whose elements are directly addressable from host code
pub trait HostStorage<T: Element>: Storage<T> + Default {
    /// Whether the extents can change at runtime
    const DYNAMIC: bool;

    /// Allocate a zero-filled `rows x cols` buffer
    fn allocate(rows: usize, cols: usize) -> Result<Self>;

    /// Allocate a `rows x cols` buffer with every element set to `value`
    fn filled(rows: usize, cols: usize, value: T) -> Result<Self> {
        let mut storage = Self::allocate(rows, cols)?;
        storage.as_mut_slice().fill(value);
        Ok(storage)
    }

    /// Replace the buffer with a fresh zero-filled `rows x cols` one
    ///
    /// Fixed-size storage only accepts its own extents.
    fn reallocate(&mut self, rows: usize, cols: usize) -> Result<()>;

    /// Elements in row-major order
    fn as_slice(&self) -> &[T];

    /// Mutable elements in row-major order
    ///
    /// A handle whose buffer is shared first detaches into a private copy, so
    /// the returned slice never aliases another handle.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Pointer to the first element (null for an empty husk)
    fn as_ptr(&self) -> *const T;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_tag() {
        assert_eq!(Location::try_from(1u8).unwrap(), Location::Heap);
        assert_eq!(Location::try_from(3u8).unwrap(), Location::DevicePitched);
        assert_eq!(Location::try_from(7u8), Err(Error::InvalidLocation(7)));
        assert!(Location::DeviceGlobal.is_device());
        assert!(!Location::Stack.is_device());
    }
}
