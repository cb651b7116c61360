// Licensed under the Apache-2.0 license

//! Lookup of entries in the unprotected TLV area that follows an image.

use flash_image::{ImageHeader, ImageTlv, ImageTlvInfo, IMAGE_TLV_INFO_MAGIC};
use zerocopy::FromBytes;

use crate::flash::{FlashDrvError, FlashPartition};

const TLV_HDR_SIZE: usize = core::mem::size_of::<ImageTlv>();
const TLV_INFO_SIZE: usize = core::mem::size_of::<ImageTlvInfo>();

/// Location of one TLV value inside the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlvEntry {
    pub it_type: u16,
    /// Slot offset of the value.
    pub offset: usize,
    pub len: usize,
}

/// Returns the first entry of type `it_type`, or `None` if the area has no
/// such entry. A missing or malformed area is an error.
pub fn find_tlv(
    slot: &FlashPartition,
    header: &ImageHeader,
    it_type: u16,
) -> Result<Option<TlvEntry>, FlashDrvError> {
    let start = header.tlv_offset().ok_or(FlashDrvError::INVAL)? as usize;

    let mut buf = [0u8; TLV_INFO_SIZE];
    slot.read(start, &mut buf)?;
    let info = ImageTlvInfo::read_from_bytes(&buf).map_err(|_| FlashDrvError::INVAL)?;
    if info.magic != IMAGE_TLV_INFO_MAGIC || (info.tlv_tot as usize) < TLV_INFO_SIZE {
        return Err(FlashDrvError::INVAL);
    }
    let end = start
        .checked_add(info.tlv_tot as usize)
        .filter(|end| *end <= slot.len())
        .ok_or(FlashDrvError::INVAL)?;

    let mut off = start + TLV_INFO_SIZE;
    while off + TLV_HDR_SIZE <= end {
        let mut buf = [0u8; TLV_HDR_SIZE];
        slot.read(off, &mut buf)?;
        let tlv = ImageTlv::read_from_bytes(&buf).map_err(|_| FlashDrvError::INVAL)?;
        let value = off + TLV_HDR_SIZE;
        let next = value + tlv.it_len as usize;
        if next > end {
            return Err(FlashDrvError::INVAL);
        }
        if tlv.it_type == it_type {
            return Ok(Some(TlvEntry {
                it_type,
                offset: value,
                len: tlv.it_len as usize,
            }));
        }
        off = next;
    }
    Ok(None)
}
