// Licensed under the Apache-2.0 license

//! Table-driven flash area lookup.

use core::cell::Cell;

use crate::flash::flash_partition::FlashPartition;
use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Area id of the only bootable slot.
pub const FLASH_AREA_IMAGE_PRIMARY: u8 = 1;

/// Static description of one flash area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashAreaDescriptor {
    pub id: u8,
    pub device_id: u8,
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

/// Source of slot handles. Every handle returned by `open` must be given back
/// through `close`.
pub trait FlashAreaMap<'a> {
    fn open(&self, id: u8) -> Result<FlashPartition<'a>, FlashDrvError>;

    fn close(&self, area: FlashPartition<'a>);
}

pub struct StaticFlashMap<'a> {
    driver: &'a dyn FlashStorage,
    areas: &'a [FlashAreaDescriptor],
    open_count: Cell<usize>,
}

impl<'a> StaticFlashMap<'a> {
    pub const fn new(driver: &'a dyn FlashStorage, areas: &'a [FlashAreaDescriptor]) -> Self {
        Self {
            driver,
            areas,
            open_count: Cell::new(0),
        }
    }

    /// Number of handles currently out.
    pub fn open_count(&self) -> usize {
        self.open_count.get()
    }
}

impl<'a> FlashAreaMap<'a> for StaticFlashMap<'a> {
    fn open(&self, id: u8) -> Result<FlashPartition<'a>, FlashDrvError> {
        let area = self
            .areas
            .iter()
            .find(|area| area.id == id)
            .ok_or(FlashDrvError::NODEVICE)?;
        let partition =
            FlashPartition::new(self.driver, area.name, area.device_id, area.offset, area.size)?;
        self.open_count.set(self.open_count.get() + 1);
        Ok(partition)
    }

    fn close(&self, area: FlashPartition<'a>) {
        drop(area);
        self.open_count.set(self.open_count.get().saturating_sub(1));
    }
}
