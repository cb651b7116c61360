// Licensed under the Apache-2.0 license

//! TLV encoding of the boot record area shared with the runtime firmware.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const SHARED_DATA_TLV_INFO_MAGIC: u16 = 0x2016;

pub const TLV_MAJOR_IAS: u8 = 0x1;
pub const TLV_MAJOR_BLINFO: u8 = 0x3;

// Software component claims, combined with the image index in the minor type.
pub const SW_SIGNER_ID: u16 = 0x01;
pub const SW_VERSION: u16 = 0x04;
pub const SW_MEASURE_VALUE: u16 = 0x08;
pub const SW_MEASURE_TYPE: u16 = 0x09;

pub const BLINFO_MODE: u16 = 0x00;
pub const BLINFO_SIGNATURE_TYPE: u16 = 0x01;
pub const BLINFO_RUNNING_SLOT: u16 = 0x03;
pub const BLINFO_MAX_APPLICATION_SIZE: u16 = 0x05;

pub const BOOT_MODE_SINGLE_SLOT: u8 = 0;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SharedDataTlvHeader {
    pub tlv_magic: u16,
    /// Total length of the area in use, including this header.
    pub tlv_tot_len: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SharedDataTlvEntry {
    pub tlv_type: u16,
    pub tlv_len: u16,
}

pub const fn tlv_type(major: u8, minor: u16) -> u16 {
    (((major & 0xf) as u16) << 12) | (minor & 0x0fff)
}

/// Minor type for a software component claim of image `image_index`.
pub const fn sw_component_minor(image_index: u8, claim: u16) -> u16 {
    ((image_index as u16) << 6) | (claim & 0x3f)
}
