//! Matrices resident in device memory

use super::{DMatrix, Format, Matrix};
use crate::device::DeviceBackend;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::expr::Shape;
use crate::storage::{DeviceStorage, HostStorage, Location, Ownership, Storage};

/// Matrix whose buffer lives behind a [`DeviceBackend`]
///
/// Elements are not host-addressable: data moves only through
/// [`upload`](Self::upload), [`copy_from_host`](Self::copy_from_host) and
/// [`download`](Self::download).
#[derive(Debug)]
pub struct DeviceMatrix<T: Element, B: DeviceBackend> {
    storage: DeviceStorage<T, B>,
    format: Format,
}

impl<T: Element, B: DeviceBackend> DeviceMatrix<T, B> {
    /// Allocate a linear (`DeviceGlobal`) matrix
    pub fn new(backend: &B, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self {
            storage: DeviceStorage::allocate(backend, rows, cols)?,
            format: Format::default(),
        })
    }

    /// Allocate a pitched (`DevicePitched`) matrix
    pub fn new_pitched(backend: &B, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self {
            storage: DeviceStorage::allocate_pitched(backend, rows, cols)?,
            format: Format::default(),
        })
    }

    /// Copy a host matrix into a new linear device matrix
    pub fn upload<S: HostStorage<T>>(backend: &B, host: &Matrix<T, S>) -> Result<Self> {
        let mut m = Self::new(backend, host.rows(), host.cols())?;
        m.copy_from_host(host)?;
        m.format = host.format();
        Ok(m)
    }

    /// Copy a host matrix into a new pitched device matrix
    pub fn upload_pitched<S: HostStorage<T>>(backend: &B, host: &Matrix<T, S>) -> Result<Self> {
        let mut m = Self::new_pitched(backend, host.rows(), host.cols())?;
        m.copy_from_host(host)?;
        m.format = host.format();
        Ok(m)
    }

    /// Overwrite the device buffer with a host matrix of the same shape
    pub fn copy_from_host<S: HostStorage<T>>(&mut self, host: &Matrix<T, S>) -> Result<()> {
        if host.shape() != self.shape() {
            return Err(Error::shape_mismatch(self.shape().into(), host.shape().into()));
        }
        self.storage.upload(host.as_slice())
    }

    /// Copy the device buffer into a new host matrix
    pub fn download(&self) -> Result<DMatrix<T>> {
        let mut host = DMatrix::try_new(self.rows(), self.cols())?;
        self.storage.download(host.as_mut_slice())?;
        Ok(host.with_format(self.format))
    }

    /// Row count
    pub fn rows(&self) -> usize {
        self.storage.rows()
    }

    /// Column count
    pub fn cols(&self) -> usize {
        self.storage.cols()
    }

    /// Extents
    pub fn shape(&self) -> Shape {
        Shape::new(self.rows(), self.cols())
    }

    /// Elements between row starts in the physical allocation
    pub fn pitch(&self) -> usize {
        self.storage.pitch()
    }

    /// `DeviceGlobal` or `DevicePitched`
    pub fn location(&self) -> Location {
        self.storage.location()
    }

    /// Ownership tag of the storage handle
    pub fn ownership(&self) -> Ownership {
        self.storage.ownership()
    }

    /// Layout and structure tags
    pub fn format(&self) -> Format {
        self.format
    }

    /// The storage backend
    pub fn storage(&self) -> &DeviceStorage<T, B> {
        &self.storage
    }

    /// Handle aliasing the same device buffer
    pub fn share(&self) -> Self {
        Self {
            storage: self.storage.share(),
            format: self.format,
        }
    }

    /// Move the buffer out, leaving `self` as an empty husk
    pub fn take(&mut self) -> Self {
        Self {
            storage: self.storage.take(),
            format: std::mem::take(&mut self.format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostDevice;

    #[test]
    fn test_round_trip_through_device() {
        let dev = HostDevice::new();
        let host = DMatrix::from_fn(3, 5, |r, c| (r * 5 + c) as f64);

        let linear = DeviceMatrix::upload(&dev, &host).unwrap();
        assert_eq!(linear.location(), Location::DeviceGlobal);
        assert_eq!(linear.download().unwrap(), host);

        let pitched = DeviceMatrix::upload_pitched(&dev, &host).unwrap();
        assert_eq!(pitched.location(), Location::DevicePitched);
        assert!(pitched.pitch() >= host.cols());
        assert_eq!(pitched.download().unwrap(), host);
    }

    #[test]
    fn test_copy_from_host_checks_shape() {
        let dev = HostDevice::new();
        let mut d = DeviceMatrix::<f32, _>::new(&dev, 2, 2).unwrap();
        let wrong = DMatrix::<f32>::new(2, 3);
        assert!(d.copy_from_host(&wrong).is_err());
    }

    #[test]
    fn test_share_and_take() {
        let dev = HostDevice::new();
        let mut a = DeviceMatrix::<i32, _>::new(&dev, 2, 2).unwrap();
        let b = a.share();
        assert_eq!(b.ownership(), Ownership::Reference);
        let c = a.take();
        assert_eq!(a.shape(), Shape::new(0, 0));
        assert_eq!(a.ownership(), Ownership::Empty);
        drop(c);
        assert_eq!(dev.live_allocations(), 1);
        drop(b);
        assert_eq!(dev.live_allocations(), 0);
    }
}
