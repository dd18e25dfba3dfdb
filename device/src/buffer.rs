use std::ops::Range;
use std::panic::Location;

use crate::error::{DeviceError, Direction};

/// Element types that can live in device memory.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl Element for f32 {}
impl Element for u32 {}
impl Element for u8 {}

/// Contiguous device-resident buffer.
///
/// Host code moves data in and out through the `copy_*` methods, which check
/// lengths and report mismatches as [`DeviceError::Transfer`]. Kernels access
/// the contents directly through the slice accessors.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    label: &'static str,
    data: Vec<T>,
}

impl<T: Element> DeviceBuffer<T> {
    pub(crate) fn new(label: &'static str, data: Vec<T>) -> Self {
        Self { label, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn range(&self, range: Range<usize>) -> &[T] {
        &self.data[range]
    }

    pub fn range_mut(&mut self, range: Range<usize>) -> &mut [T] {
        &mut self.data[range]
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Copies the whole of `host` into the buffer. Lengths must match.
    #[track_caller]
    pub fn copy_from_host(&mut self, host: &[T]) -> Result<(), DeviceError> {
        self.check_transfer(Direction::HostToDevice, host.len())?;
        self.data.copy_from_slice(host);
        Ok(())
    }

    /// Copies the whole buffer into `host`. Lengths must match.
    #[track_caller]
    pub fn copy_to_host(&self, host: &mut [T]) -> Result<(), DeviceError> {
        self.check_transfer(Direction::DeviceToHost, host.len())?;
        host.copy_from_slice(&self.data);
        Ok(())
    }

    #[track_caller]
    fn check_transfer(&self, direction: Direction, actual: usize) -> Result<(), DeviceError> {
        if actual != self.data.len() {
            return Err(DeviceError::Transfer {
                label: self.label,
                direction,
                expected: self.data.len(),
                actual,
                location: Location::caller(),
            });
        }
        Ok(())
    }
}
