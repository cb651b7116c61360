// Licensed under the Apache-2.0 license

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Represents a partition within the flash memory.
///
/// A `FlashPartition` provides a view into a contiguous region of the underlying
/// flash, allowing for read and write operations within the specified bounds.
/// It is the handle the loader holds while a slot is open.
///
/// # Fields
/// - `driver`: Reference to the flash storage controller driver.
/// - `name`: Name of the partition (for debugging or identification).
/// - `device_id`: Identifier of the flash device holding the partition.
/// - `base_offset`: The starting offset of the partition within the flash.
/// - `length`: The size of the partition in bytes.
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    name: &'static str,
    device_id: u8,
    base_offset: usize,
    length: usize,
}

impl<'a> FlashPartition<'a> {
    /// Creates a new `FlashPartition` instance.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the partition does not fit within the
    /// flash capacity.
    pub fn new(
        driver: &'a dyn FlashStorage,
        name: &'static str,
        device_id: u8,
        base_offset: usize,
        length: usize,
    ) -> Result<Self, FlashDrvError> {
        let end = base_offset
            .checked_add(length)
            .ok_or(FlashDrvError::SIZE)?;
        if end > driver.capacity() {
            return Err(FlashDrvError::SIZE);
        }
        Ok(FlashPartition {
            driver,
            name,
            device_id,
            base_offset,
            length,
        })
    }

    fn check_range(&self, partition_offset: usize, len: usize) -> Result<usize, FlashDrvError> {
        match partition_offset.checked_add(len) {
            Some(end) if end <= self.length => Ok(self.base_offset + partition_offset),
            _ => Err(FlashDrvError::SIZE),
        }
    }

    /// Reads data from the flash partition into the provided buffer, starting at the
    /// specified offset within the partition.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the requested range exceeds the partition
    /// size, or propagates errors from the underlying flash controller.
    pub fn read(&self, partition_offset: usize, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        let address = self.check_range(partition_offset, buf.len())?;
        self.driver.read(buf, address)
    }

    /// Writes data to the flash partition, starting at the specified offset within the
    /// partition.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the write would exceed the partition size,
    /// or propagates errors from the underlying flash controller.
    pub fn write(&self, partition_offset: usize, buf: &[u8]) -> Result<(), FlashDrvError> {
        let address = self.check_range(partition_offset, buf.len())?;
        self.driver.write(buf, address)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Offset of the partition from the start of its flash device.
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }
}
