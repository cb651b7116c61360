// Licensed under the Apache-2.0 license

use flash_image::trailer::TRAILER_SIZE;
use flash_image::{ImageHeader, IMAGE_HEADER_SIZE};
use zerocopy::FromBytes;

use crate::flash::{FlashDrvError, FlashPartition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderError {
    Flash(FlashDrvError),
    BadMagic,
    BadHeaderSize,
    /// Header, image and protected TLVs do not fit in the slot.
    ImageTooLarge,
}

impl From<FlashDrvError> for HeaderError {
    fn from(err: FlashDrvError) -> Self {
        HeaderError::Flash(err)
    }
}

/// Reads and sanity checks the image header of an open slot.
pub trait HeaderLoader {
    fn load_header(&self, slot: &FlashPartition) -> Result<ImageHeader, HeaderError>;
}

/// Loads the header stored at the start of the slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlashHeaderLoader;

impl HeaderLoader for FlashHeaderLoader {
    fn load_header(&self, slot: &FlashPartition) -> Result<ImageHeader, HeaderError> {
        let mut buf = [0u8; IMAGE_HEADER_SIZE];
        slot.read(0, &mut buf)?;
        let header = ImageHeader::read_from_bytes(&buf).map_err(|_| HeaderError::BadHeaderSize)?;

        if !header.has_valid_magic() {
            romtime::debug!("[mcu-boot] bad image magic {:#x}", header.magic);
            return Err(HeaderError::BadMagic);
        }
        if (header.hdr_size as usize) < IMAGE_HEADER_SIZE {
            return Err(HeaderError::BadHeaderSize);
        }
        let usable = slot
            .len()
            .checked_sub(TRAILER_SIZE)
            .ok_or(HeaderError::ImageTooLarge)?;
        match header.tlv_offset() {
            Some(end) if (end as usize) <= usable => Ok(header),
            _ => Err(HeaderError::ImageTooLarge),
        }
    }
}
