//! Device storage: buffers owned by a `DeviceBackend`

use super::{Location, Ownership, Storage};
use crate::device::DeviceBackend;
use crate::dtype::Element;
use crate::error::{Error, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// Matrix storage in device memory
///
/// The buffer is not host-addressable; elements move only through
/// [`upload`](Self::upload) and [`download`](Self::download). Handles created
/// with `share()` alias the same allocation, which the backend frees exactly
/// once, when the last handle goes away.
///
/// Pitched storage pads every row to the backend's alignment, so the element
/// at `(r, c)` lives at `r * pitch + c`, not `r * cols + c`. A column vector is
/// allocated as a single row (extents swapped) and is therefore contiguous.
pub struct DeviceStorage<T: Element, B: DeviceBackend> {
    inner: Option<Arc<DeviceBuffer<B>>>,
    rows: usize,
    cols: usize,
    /// Elements between row starts of the physical allocation
    pitch: usize,
    location: Location,
    /// Allocated as one row of `rows` elements because `cols == 1`
    swapped: bool,
    ownership: Ownership,
    _marker: PhantomData<T>,
}

struct DeviceBuffer<B: DeviceBackend> {
    ptr: u64,
    backend: B,
}

impl<B: DeviceBackend> Drop for DeviceBuffer<B> {
    fn drop(&mut self) {
        if self.ptr != 0 {
            self.backend.free(self.ptr);
        }
    }
}

impl<T: Element, B: DeviceBackend> DeviceStorage<T, B> {
    const ELEM: usize = std::mem::size_of::<T>();

    /// Bytes of `count` elements, or `OutOfMemory` on overflow
    fn bytes(count: Option<usize>) -> Result<usize> {
        count
            .and_then(|n| n.checked_mul(Self::ELEM))
            .ok_or(Error::OutOfMemory { size: usize::MAX })
    }

    /// Allocate a linear (`DeviceGlobal`) buffer of `rows x cols` elements
    pub fn allocate(backend: &B, rows: usize, cols: usize) -> Result<Self> {
        let ptr = backend.allocate(Self::bytes(rows.checked_mul(cols))?)?;
        Ok(Self::from_parts(
            backend,
            ptr,
            rows,
            cols,
            cols,
            Location::DeviceGlobal,
            false,
        ))
    }

    /// Allocate a pitched (`DevicePitched`) buffer of `rows x cols` elements
    pub fn allocate_pitched(backend: &B, rows: usize, cols: usize) -> Result<Self> {
        let swapped = cols == 1 && rows > 1;
        let (width, height) = if swapped { (rows, 1) } else { (cols, rows) };

        let width_bytes = Self::bytes(Some(width))?;
        let (ptr, pitch_bytes) = backend.allocate_pitched(width_bytes, height)?;
        if pitch_bytes % Self::ELEM != 0 || pitch_bytes < width_bytes {
            if ptr != 0 {
                backend.free(ptr);
            }
            return Err(Error::Backend(format!(
                "{} returned pitch {pitch_bytes} for rows of {} bytes",
                backend.name(),
                width_bytes
            )));
        }

        log::debug!(
            "pitched {rows}x{cols} {} buffer: pitch {} elements{}",
            T::DTYPE,
            pitch_bytes / Self::ELEM,
            if swapped { " (swapped)" } else { "" }
        );
        Ok(Self::from_parts(
            backend,
            ptr,
            rows,
            cols,
            pitch_bytes / Self::ELEM,
            Location::DevicePitched,
            swapped,
        ))
    }

    fn from_parts(
        backend: &B,
        ptr: u64,
        rows: usize,
        cols: usize,
        pitch: usize,
        location: Location,
        swapped: bool,
    ) -> Self {
        Self {
            inner: Some(Arc::new(DeviceBuffer {
                ptr,
                backend: backend.clone(),
            })),
            rows,
            cols,
            pitch,
            location,
            swapped,
            ownership: Ownership::Owner,
            _marker: PhantomData,
        }
    }

    /// Whether the allocation was made with swapped extents
    #[inline]
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    /// Element offset of `(r, c)` inside the physical allocation
    #[inline]
    pub fn offset(&self, r: usize, c: usize) -> usize {
        if self.swapped { r } else { r * self.pitch + c }
    }

    /// Raw device address (0 when empty)
    #[inline]
    pub fn device_ptr(&self) -> u64 {
        self.inner.as_ref().map_or(0, |b| b.ptr)
    }

    /// Backend that owns the allocation
    pub fn backend(&self) -> Option<&B> {
        self.inner.as_ref().map(|b| &b.backend)
    }

    /// Number of handles sharing the allocation
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.inner.as_ref().map_or(0, Arc::strong_count)
    }

    fn is_contiguous(&self) -> bool {
        self.swapped || self.pitch == self.cols || self.rows <= 1
    }

    /// Copy `rows * cols` row-major host elements into the buffer
    pub fn upload(&mut self, host: &[T]) -> Result<()> {
        if host.len() != self.len() {
            return Err(Error::shape_mismatch(
                (self.rows, self.cols),
                (host.len() / self.cols.max(1), self.cols),
            ));
        }
        let Some(buffer) = self.inner.as_ref() else {
            return Ok(());
        };
        let bytes: &[u8] = bytemuck::cast_slice(host);
        if self.is_contiguous() {
            buffer.backend.copy_to_device(bytes, buffer.ptr)
        } else {
            buffer.backend.copy_to_device_2d(
                bytes,
                self.cols * Self::ELEM,
                buffer.ptr,
                self.pitch * Self::ELEM,
                self.cols * Self::ELEM,
                self.rows,
            )
        }
    }

    /// Copy the buffer into `rows * cols` row-major host elements
    pub fn download(&self, host: &mut [T]) -> Result<()> {
        if host.len() != self.len() {
            return Err(Error::shape_mismatch(
                (self.rows, self.cols),
                (host.len() / self.cols.max(1), self.cols),
            ));
        }
        let Some(buffer) = self.inner.as_ref() else {
            return Ok(());
        };
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(host);
        if self.is_contiguous() {
            buffer.backend.copy_from_device(buffer.ptr, bytes)
        } else {
            buffer.backend.copy_from_device_2d(
                buffer.ptr,
                self.pitch * Self::ELEM,
                bytes,
                self.cols * Self::ELEM,
                self.cols * Self::ELEM,
                self.rows,
            )
        }
    }
}

impl<T: Element, B: DeviceBackend> Storage<T> for DeviceStorage<T, B> {
    #[inline]
    fn location(&self) -> Location {
        self.location
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
    fn pitch(&self) -> usize {
        if self.swapped { self.cols } else { self.pitch }
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
            pitch: self.pitch,
            location: self.location,
            swapped: self.swapped,
            ownership: match self.ownership {
                Ownership::Empty => Ownership::Empty,
                _ => Ownership::Reference,
            },
            _marker: PhantomData,
        }
    }

    fn take(&mut self) -> Self {
        let moved = Self {
            inner: self.inner.take(),
            rows: self.rows,
            cols: self.cols,
            pitch: self.pitch,
            location: self.location,
            swapped: self.swapped,
            ownership: self.ownership,
            _marker: PhantomData,
        };
        self.rows = 0;
        self.cols = 0;
        self.pitch = 0;
        self.swapped = false;
        self.ownership = Ownership::Empty;
        moved
    }
}

impl<T: Element, B: DeviceBackend> std::fmt::Debug for DeviceStorage<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStorage")
            .field("ptr", &format!("0x{:x}", self.device_ptr()))
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("pitch", &self.pitch)
            .field("location", &self.location)
            .field("ownership", &self.ownership)
            .finish()
    }
}
