// Licensed under the Apache-2.0 license

//! On-flash layouts shared by the single-image loader and image tooling.

#![cfg_attr(not(test), no_std)]

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub mod shared_data;
pub mod trailer;

pub const IMAGE_MAGIC: u32 = 0x96f3_b83d;
pub const IMAGE_HEADER_SIZE: usize = core::mem::size_of::<ImageHeader>();

pub const IMAGE_TLV_INFO_MAGIC: u16 = 0x6907;

pub const IMAGE_TLV_KEYHASH: u16 = 0x01;
pub const IMAGE_TLV_SHA256: u16 = 0x10;

pub const SHA256_DIGEST_SIZE: usize = 32;

bitflags! {
    /// Image header flag word.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ImageFlags: u32 {
        const PIC = 0x0000_0001;
        const ENCRYPTED_AES128 = 0x0000_0004;
        const ENCRYPTED_AES256 = 0x0000_0008;
        const NON_BOOTABLE = 0x0000_0010;
        const RAM_LOAD = 0x0000_0020;
        const ROM_FIXED = 0x0000_0100;

        const ENCRYPTED = Self::ENCRYPTED_AES128.bits() | Self::ENCRYPTED_AES256.bits();
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build_num: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ImageHeader {
    pub magic: u32,
    pub load_addr: u32,
    pub hdr_size: u16,
    pub protect_tlv_size: u16,
    pub img_size: u32,
    pub flags: u32,
    pub version: ImageVersion,
    pub reserved: u32,
}

impl ImageHeader {
    pub fn flags(&self) -> ImageFlags {
        ImageFlags::from_bits_retain(self.flags)
    }

    pub fn clear_flags(&mut self, flags: ImageFlags) {
        self.flags &= !flags.bits();
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags().intersects(ImageFlags::ENCRYPTED)
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == IMAGE_MAGIC
    }

    /// Offset just past the header and image body, where the protected TLV
    /// area begins.
    pub fn image_end(&self) -> Option<u32> {
        (self.hdr_size as u32).checked_add(self.img_size)
    }

    /// Offset of the unprotected TLV area; everything before it is covered by
    /// the image digest.
    pub fn tlv_offset(&self) -> Option<u32> {
        self.image_end()?
            .checked_add(self.protect_tlv_size as u32)
    }
}

/// Header of a TLV area that follows the image body.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ImageTlvInfo {
    pub magic: u16,
    /// Length of the area, including this header.
    pub tlv_tot: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ImageTlv {
    pub it_type: u16,
    pub it_len: u16,
}
