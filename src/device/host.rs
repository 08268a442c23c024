//! Device backend living in host memory

use super::{DeviceBackend, PITCH_ALIGNMENT};
use crate::error::{Error, Result};
use crate::storage::{AlignedAllocator, Allocator};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Device backend that serves allocations from the host heap
///
/// Every live allocation is recorded in a registry shared by all clones of the
/// backend, so transfers are bounds-checked against real allocations. A
/// second `free` of the same pointer is logged and ignored.
#[derive(Clone, Debug, Default)]
pub struct HostDevice {
    /// ptr -> allocation size in bytes
    registry: Arc<Mutex<HashMap<u64, usize>>>,
}

impl HostDevice {
    /// Create a backend with an empty allocation registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocations not yet freed
    pub fn live_allocations(&self) -> usize {
        self.registry.lock().len()
    }

    /// Bytes held by allocations not yet freed
    pub fn allocated_bytes(&self) -> usize {
        self.registry.lock().values().sum()
    }
}

/// Ensure `[ptr, ptr + len)` lies inside one live allocation
fn check_range(registry: &HashMap<u64, usize>, ptr: u64, len: usize) -> Result<()> {
    let end = ptr.checked_add(len as u64);
    let inside = registry
        .iter()
        .any(|(&base, &size)| ptr >= base && end.is_some_and(|end| end <= base + size as u64));
    if inside {
        Ok(())
    } else {
        Err(Error::Backend(format!(
            "range 0x{ptr:x}+{len} is outside every live allocation"
        )))
    }
}

impl DeviceBackend for HostDevice {
    fn name(&self) -> &'static str {
        "host"
    }

    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        let ptr = AlignedAllocator.allocate(size_bytes)?;
        if ptr != 0 {
            self.registry.lock().insert(ptr, size_bytes);
            log::debug!("{} device alloc {size_bytes} bytes at 0x{ptr:x}", self.name());
        }
        Ok(ptr)
    }

    fn allocate_pitched(&self, width_bytes: usize, height: usize) -> Result<(u64, usize)> {
        let overflow = Error::OutOfMemory { size: usize::MAX };
        let pitch = width_bytes
            .div_ceil(PITCH_ALIGNMENT)
            .checked_mul(PITCH_ALIGNMENT)
            .ok_or(overflow.clone())?;
        let ptr = self.allocate(pitch.checked_mul(height).ok_or(overflow)?)?;
        Ok((ptr, pitch))
    }

    fn free(&self, ptr: u64) {
        if ptr == 0 {
            return;
        }
        let size = self.registry.lock().remove(&ptr);
        match size {
            Some(size_bytes) => {
                log::debug!("{} device free {size_bytes} bytes at 0x{ptr:x}", self.name());
                AlignedAllocator.deallocate(ptr, size_bytes);
            }
            None => log::error!(
                "{} device free of unknown pointer 0x{ptr:x} ignored (double free?)",
                self.name()
            ),
        }
    }

    fn copy_to_device(&self, src: &[u8], dst: u64) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        // the guard keeps the allocation from being freed mid-copy
        let registry = self.registry.lock();
        check_range(&registry, dst, src.len())?;
        // SAFETY: destination range verified against the registry
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(&self, src: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let registry = self.registry.lock();
        check_range(&registry, src, dst.len())?;
        // SAFETY: source range verified against the registry
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_is_aligned() {
        let dev = HostDevice::new();
        let (ptr, pitch) = dev.allocate_pitched(24, 3).unwrap();
        assert_eq!(pitch, PITCH_ALIGNMENT);
        assert_eq!(dev.allocated_bytes(), 3 * PITCH_ALIGNMENT);
        dev.free(ptr);
        assert_eq!(dev.live_allocations(), 0);
    }

    #[test]
    fn test_round_trip_bytes() {
        let dev = HostDevice::new();
        let ptr = dev.allocate(4).unwrap();
        dev.copy_to_device(&[1, 2, 3, 4], ptr).unwrap();
        let mut out = [0u8; 4];
        dev.copy_from_device(ptr, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        dev.free(ptr);
    }

    #[test]
    fn test_out_of_range_copy_is_rejected() {
        let dev = HostDevice::new();
        let ptr = dev.allocate(4).unwrap();
        assert!(dev.copy_to_device(&[0; 8], ptr).is_err());
        dev.free(ptr);
    }

    #[test]
    fn test_double_free_is_ignored() {
        let dev = HostDevice::new();
        let keep = dev.allocate(8).unwrap();
        let ptr = dev.allocate(16).unwrap();
        dev.free(ptr);
        dev.free(ptr);
        dev.free(0xdead_0000);
        assert_eq!(dev.live_allocations(), 1);
        assert_eq!(dev.allocated_bytes(), 8);
        dev.free(keep);
        assert_eq!(dev.live_allocations(), 0);
    }

    #[test]
    fn test_pitched_size_overflow_is_an_error() {
        let dev = HostDevice::new();
        assert_eq!(
            dev.allocate_pitched(64, usize::MAX).unwrap_err(),
            Error::OutOfMemory { size: usize::MAX }
        );
        assert!(dev.allocate_pitched(usize::MAX, 1).is_err());
        assert_eq!(dev.live_allocations(), 0);
    }
}
