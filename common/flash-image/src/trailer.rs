// Licensed under the Apache-2.0 license

//! Slot trailer holding the persistent validation record.
//!
//! The trailer occupies the last bytes of the slot:
//!
//! ```text
//! | image_ok (padded to BOOT_MAX_ALIGN) | magic (16 bytes) | <- end of slot
//! ```
//!
//! Erased flash reads back as `FLASH_ERASED_VAL`.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const BOOT_MAGIC_SIZE: usize = 16;
pub const BOOT_MAX_ALIGN: usize = 8;

pub const BOOT_FLAG_SET: u8 = 0x01;
pub const FLASH_ERASED_VAL: u8 = 0xff;

pub const BOOT_MAGIC: [u8; BOOT_MAGIC_SIZE] = [
    0x77, 0xc2, 0x95, 0xf3, 0x60, 0xd2, 0xef, 0x7f, 0x35, 0x52, 0x50, 0x0f, 0x2c, 0xb6, 0x79,
    0x80,
];

pub const TRAILER_SIZE: usize = core::mem::size_of::<SlotTrailer>();

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SlotTrailer {
    pub image_ok: [u8; BOOT_MAX_ALIGN],
    pub magic: [u8; BOOT_MAGIC_SIZE],
}

impl SlotTrailer {
    /// Offset of the trailer inside a slot of `slot_len` bytes.
    pub const fn offset(slot_len: usize) -> Option<usize> {
        slot_len.checked_sub(TRAILER_SIZE)
    }

    pub const fn image_ok_offset(slot_len: usize) -> Option<usize> {
        Self::offset(slot_len)
    }

    pub const fn magic_offset(slot_len: usize) -> Option<usize> {
        match Self::offset(slot_len) {
            Some(off) => Some(off + BOOT_MAX_ALIGN),
            None => None,
        }
    }

    /// The image_ok word as written to flash: the flag byte followed by
    /// erased padding up to the write alignment.
    pub const fn image_ok_set() -> [u8; BOOT_MAX_ALIGN] {
        let mut buf = [FLASH_ERASED_VAL; BOOT_MAX_ALIGN];
        buf[0] = BOOT_FLAG_SET;
        buf
    }
}
