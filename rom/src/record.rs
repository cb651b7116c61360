// Licensed under the Apache-2.0 license

//! Persistent validation record kept in the slot trailer.
//!
//! `magic` records that the image passed validation at least once and
//! `image_ok` that it is approved to boot. The magic must always be written
//! first: a trailer with good magic and no image_ok is read as "not yet
//! bootable", while the reverse is never reported as bootable.

use flash_image::trailer::{SlotTrailer, BOOT_FLAG_SET, BOOT_MAGIC, FLASH_ERASED_VAL, TRAILER_SIZE};
use zerocopy::FromBytes;

use crate::flash::{FlashDrvError, FlashPartition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordMagic {
    /// Erased; no record was ever written.
    Unset,
    Good,
    /// Neither erased nor the expected pattern.
    Bad,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationRecord {
    pub magic: RecordMagic,
    /// Integrity was checked at least once.
    pub confirmed: bool,
    /// Approved to boot. Only reported when `confirmed` is also set.
    pub bootable: bool,
}

impl ValidationRecord {
    pub fn is_bootable(&self) -> bool {
        self.magic == RecordMagic::Good && self.confirmed && self.bootable
    }
}

fn decode_magic(magic: &[u8]) -> RecordMagic {
    if magic == BOOT_MAGIC {
        RecordMagic::Good
    } else if magic.iter().all(|b| *b == FLASH_ERASED_VAL) {
        RecordMagic::Unset
    } else {
        RecordMagic::Bad
    }
}

pub fn read_record(slot: &FlashPartition) -> Result<ValidationRecord, FlashDrvError> {
    let offset = SlotTrailer::offset(slot.len()).ok_or(FlashDrvError::SIZE)?;
    let mut buf = [0u8; TRAILER_SIZE];
    slot.read(offset, &mut buf)?;
    let trailer = SlotTrailer::read_from_bytes(&buf).map_err(|_| FlashDrvError::FAIL)?;

    let magic = decode_magic(&trailer.magic);
    let confirmed = magic == RecordMagic::Good;
    let image_ok = trailer.image_ok[0] == BOOT_FLAG_SET;
    if image_ok && !confirmed {
        romtime::warn!("[mcu-boot] image_ok set without magic in {}", slot.name());
    }
    Ok(ValidationRecord {
        magic,
        confirmed,
        bootable: confirmed && image_ok,
    })
}

pub fn write_magic(slot: &FlashPartition) -> Result<(), FlashDrvError> {
    let offset = SlotTrailer::magic_offset(slot.len()).ok_or(FlashDrvError::SIZE)?;
    romtime::debug!("[mcu-boot] writing magic; area={} off={:#x}", slot.name(), offset);
    slot.write(offset, &BOOT_MAGIC)
}

pub fn write_bootable(slot: &FlashPartition) -> Result<(), FlashDrvError> {
    let offset = SlotTrailer::image_ok_offset(slot.len()).ok_or(FlashDrvError::SIZE)?;
    romtime::debug!("[mcu-boot] writing image_ok; area={} off={:#x}", slot.name(), offset);
    slot.write(offset, &SlotTrailer::image_ok_set())
}
