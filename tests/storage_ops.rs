//! Integration tests for storage backends, device matrices and containers
//!
//! Tests verify:
//! - Heap handles alias and count references; stack storage copies values
//! - Writing through a shared heap handle detaches it first
//! - Proxy storage wraps caller memory without freeing it
//! - Foreign buffers move into and out of matrices without copying
//! - Device round trips for linear and pitched allocations, with no leaks

mod common;

use common::seeded;
use densr::matrix::ForeignDense;
use densr::prelude::*;
use densr::storage::HeapStorage;

// ============================================================================
// Tags
// ============================================================================

#[test]
fn test_location_tags() {
    for (tag, loc) in [
        (0u8, Location::Stack),
        (1, Location::Heap),
        (2, Location::DeviceGlobal),
        (3, Location::DevicePitched),
    ] {
        assert_eq!(Location::try_from(tag).unwrap(), loc);
        assert_eq!(loc as u8, tag);
    }
    assert!(matches!(Location::try_from(9u8), Err(Error::InvalidLocation(9))));
    assert!(Location::DevicePitched.is_device());
    assert!(!Location::Heap.is_device());
}

// ============================================================================
// Heap / stack
// ============================================================================

#[test]
fn test_heap_reference_counting() {
    let a = DMatrix::<f32>::rand_with(&mut seeded(1), 3, 3);
    assert_eq!(a.location(), Location::Heap);
    assert_eq!(a.ref_count(), 1);
    {
        let b = a.share();
        let c = b.share();
        assert_eq!(a.ref_count(), 3);
        assert_eq!(c.as_ptr(), a.as_ptr());
    }
    assert_eq!(a.ref_count(), 1);
}

#[test]
fn test_buffer_outlives_owner_while_shared() {
    let mut owner = DMatrix::from_slice(1, 3, &[1u32, 2, 3]);
    let alias = owner.share();
    drop(owner.take());
    assert!(owner.is_empty());
    assert_eq!(alias.as_slice(), &[1, 2, 3]);
}

#[test]
fn test_write_through_alias_leaves_other_handle_intact() {
    let a = DMatrix::from_slice(2, 2, &[1.0f64, 2.0, 3.0, 4.0]);
    let mut b = a.share();
    let before = a.as_slice();
    b.as_mut_slice()[0] = 9.0;
    assert_eq!(before[0], 1.0);
    assert_eq!(a[(0, 0)], 1.0);
    assert_eq!(b[(0, 0)], 9.0);
    assert_eq!(b.ownership(), Ownership::Owner);
    assert_eq!(a.ref_count(), 1);
}

#[test]
fn test_assign_into_alias_of_operand() {
    let a = DMatrix::from_slice(2, 2, &[1.0f64, 2.0, 3.0, 4.0]);
    let mut b = a.share();
    b.assign((&a).t());
    assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(b.as_slice(), &[1.0, 3.0, 2.0, 4.0]);

    // the operand itself may be the one holding a second handle
    let mut c = DMatrix::from_slice(1, 3, &[1i32, 2, 3]);
    let keep = c.share();
    c.assign(&keep * 2);
    assert_eq!(c.as_slice(), &[2, 4, 6]);
    assert_eq!(keep.as_slice(), &[1, 2, 3]);
}

#[test]
fn test_stack_share_copies_values() {
    let mut a = Matrix2::from_array([[1i64, 2], [3, 4]]);
    let b = a.share();
    a[(0, 0)] = 10;
    assert_eq!(b[(0, 0)], 1);
    assert_eq!(b.ownership(), Ownership::Owner);

    let moved = a.take();
    assert_eq!(moved.get(0, 0), 10);
    assert_eq!(a.ownership(), Ownership::Empty);
    assert_eq!(a.size(), 0);
}

#[test]
fn test_proxy_wraps_caller_memory() {
    let mut backing = vec![1.0f64, 2.0, 3.0, 4.0];
    {
        // SAFETY: backing holds 4 f64 values and outlives the matrix
        let storage = unsafe { HeapStorage::from_raw_parts(backing.as_mut_ptr(), 2, 2) };
        let mut m = Matrix::<f64, _>::from_storage(storage);
        assert_eq!(m.ownership(), Ownership::Proxy);
        assert_eq!(m.trace(), 5.0);

        m[(1, 0)] = -3.0;
        let mut alias = m.clone();
        assert_eq!(alias.as_ptr(), m.as_ptr());

        // a write through a second handle copies out of caller memory
        alias[(0, 0)] = 100.0;
        assert_ne!(alias.as_ptr(), m.as_ptr());
        assert_eq!(alias.ownership(), Ownership::Owner);
        assert_eq!(m[(0, 0)], 1.0);
    }
    // writes through the sole handle landed in caller memory, which is still alive
    assert_eq!(backing, vec![1.0, 2.0, -3.0, 4.0]);
}

// ============================================================================
// Foreign buffers
// ============================================================================

#[test]
fn test_foreign_round_trip_without_copy() {
    let mut foreign = ForeignDense::from_vec(2, 3, vec![1i32, 2, 3, 4, 5, 6]).unwrap();
    let addr = foreign.ptr();

    let m = DMatrix::<i32>::adopt(&mut foreign).unwrap();
    assert!(foreign.is_empty());
    assert_eq!(m.as_ptr() as u64, addr);
    assert_eq!(m.ownership(), Ownership::Owner);
    assert_eq!(m.row(1).to_vec(), vec![4, 5, 6]);

    let back = m.into_foreign().unwrap();
    assert_eq!(back.ptr(), addr);
    assert_eq!((back.rows(), back.cols()), (2, 3));
}

#[test]
fn test_foreign_dtype_checked() {
    let mut foreign = ForeignDense::from_vec(1, 2, vec![1.0f32, 2.0]).unwrap();
    assert!(matches!(
        DMatrix::<f64>::adopt(&mut foreign),
        Err(Error::DTypeMismatch { .. })
    ));
    assert!(!foreign.is_empty());

    let view = MatrixView::<f32>::from_foreign(&foreign).unwrap();
    assert_eq!(view.to_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_shared_matrix_copies_into_foreign() {
    let m = DMatrix::from_slice(1, 2, &[7u8, 8]);
    let alias = m.share();
    let foreign = m.into_foreign().unwrap();
    assert_ne!(foreign.ptr(), alias.as_ptr() as u64);
    assert_eq!(MatrixView::<u8>::from_foreign(&foreign).unwrap().to_vec(), vec![7, 8]);
}

// ============================================================================
// Device
// ============================================================================

#[test]
fn test_device_round_trip_linear_and_pitched() {
    let dev = HostDevice::new();
    let host = DMatrix::<f32>::randn_with(&mut seeded(9), 0.0, 1.0, 5, 7).unwrap();

    let linear = DeviceMatrix::upload(&dev, &host).unwrap();
    assert_eq!(linear.location(), Location::DeviceGlobal);
    assert_eq!(linear.pitch(), 7);
    assert_eq!(linear.download().unwrap(), host);

    let pitched = DeviceMatrix::upload_pitched(&dev, &host).unwrap();
    assert_eq!(pitched.location(), Location::DevicePitched);
    assert!(pitched.pitch() >= 7);
    assert_eq!(pitched.download().unwrap(), host);

    assert_eq!(dev.live_allocations(), 2);
    drop(linear);
    drop(pitched);
    assert_eq!(dev.live_allocations(), 0);
    assert_eq!(dev.allocated_bytes(), 0);
}

#[test]
fn test_device_share_and_take() {
    let dev = HostDevice::new();
    let host = DMatrix::from_slice(2, 2, &[1.0f64, 2.0, 3.0, 4.0]).with_format(Format::SYMMETRIC);
    let mut d = DeviceMatrix::upload(&dev, &host).unwrap();

    let alias = d.share();
    assert_eq!(alias.ownership(), Ownership::Reference);
    assert_eq!(alias.download().unwrap().format(), Format::SYMMETRIC);

    let moved = d.take();
    assert_eq!(d.ownership(), Ownership::Empty);
    assert_eq!(d.shape(), Shape::new(0, 0));
    assert_eq!(moved.download().unwrap(), host);

    drop(moved);
    // alias still holds the buffer
    assert_eq!(dev.live_allocations(), 1);
    drop(alias);
    assert_eq!(dev.live_allocations(), 0);
}

#[test]
fn test_device_allocation_overflow_is_an_error() {
    let dev = HostDevice::new();
    assert!(matches!(
        DeviceMatrix::<f32, _>::new(&dev, usize::MAX, 2),
        Err(Error::OutOfMemory { .. })
    ));
    assert_eq!(dev.live_allocations(), 0);
}

#[test]
fn test_device_double_free_is_ignored() {
    let dev = HostDevice::new();
    let d = DeviceMatrix::<u8, _>::new(&dev, 2, 2).unwrap();
    let ptr = dev.allocate(4).unwrap();
    dev.free(ptr);
    dev.free(ptr);
    assert_eq!(dev.live_allocations(), 1);
    drop(d);
    assert_eq!(dev.live_allocations(), 0);
}

#[test]
fn test_device_copy_checks_shape() {
    let dev = HostDevice::new();
    let mut d = DeviceMatrix::<u8, _>::new(&dev, 2, 2).unwrap();
    assert!(d.copy_from_host(&DMatrix::<u8>::new(3, 1)).is_err());
    d.copy_from_host(&DMatrix::filled(2, 2, 4u8)).unwrap();
    assert_eq!(d.download().unwrap().sum(), 16);
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_grid_and_multi_matrix() {
    let proto = DMatrix::<f64>::identity(2);
    let mut grid = MatrixGrid::filled(2, 3, &proto);
    assert_eq!(grid.len(), 6);
    grid[(1, 2)][(0, 1)] = 5.0;
    assert_eq!(grid[(0, 0)][(0, 1)], 0.0);
    assert!(grid.get(2, 0).is_none());

    let stack: MultiMatrix<f64> = (0..3).map(|k| DMatrix::filled(3, 3, k as f64)).collect();
    let tops = stack.views(0, 3, 0, 1);
    assert_eq!(tops.len(), 3);
    assert_eq!(tops[2].to_vec(), vec![2.0, 2.0, 2.0]);
    assert!(stack.try_views(0, 4, 0, 1).is_err());
}
