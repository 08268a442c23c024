//! Device memory backends
//!
//! Device-located storage never touches its buffer directly; every allocation,
//! release and transfer goes through a [`DeviceBackend`]. Accelerator bindings
//! implement the trait outside this crate. [`HostDevice`] implements it in host
//! memory, which keeps the device code paths exercised on any machine.

mod host;

pub use host::HostDevice;

use crate::error::Result;
use std::fmt;

/// Row alignment, in bytes, of pitched allocations made by [`HostDevice`]
pub const PITCH_ALIGNMENT: usize = 256;

/// Allocation and transfer contract of a device memory backend
///
/// Pointers are opaque `u64` device addresses; `0` is the null address and is
/// returned for zero-byte requests.
pub trait DeviceBackend: Clone + Send + Sync + fmt::Debug + 'static {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Allocate a linear buffer of `size_bytes`
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Allocate `height` rows of at least `width_bytes` each
    ///
    /// Returns the pointer and the pitch (bytes between row starts, `>= width_bytes`).
    fn allocate_pitched(&self, width_bytes: usize, height: usize) -> Result<(u64, usize)>;

    /// Release a buffer obtained from `allocate` or `allocate_pitched`
    ///
    /// Called from `Drop`, so an unknown pointer must not panic.
    fn free(&self, ptr: u64);

    /// Copy host bytes to `dst`
    fn copy_to_device(&self, src: &[u8], dst: u64) -> Result<()>;

    /// Copy bytes starting at `src` into the host slice
    fn copy_from_device(&self, src: u64, dst: &mut [u8]) -> Result<()>;

    /// Copy `height` rows of `width_bytes` from a host buffer with `src_pitch`
    /// into a device buffer with `dst_pitch`
    fn copy_to_device_2d(
        &self,
        src: &[u8],
        src_pitch: usize,
        dst: u64,
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        for row in 0..height {
            let start = row * src_pitch;
            self.copy_to_device(
                &src[start..start + width_bytes],
                dst + (row * dst_pitch) as u64,
            )?;
        }
        Ok(())
    }

    /// Copy `height` rows of `width_bytes` from a device buffer with `src_pitch`
    /// into a host buffer with `dst_pitch`
    fn copy_from_device_2d(
        &self,
        src: u64,
        src_pitch: usize,
        dst: &mut [u8],
        dst_pitch: usize,
        width_bytes: usize,
        height: usize,
    ) -> Result<()> {
        for row in 0..height {
            let start = row * dst_pitch;
            self.copy_from_device(
                src + (row * src_pitch) as u64,
                &mut dst[start..start + width_bytes],
            )?;
        }
        Ok(())
    }
}
