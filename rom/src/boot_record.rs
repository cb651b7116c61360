/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_record.rs

Abstract:

    Measured boot and shared data records handed to the runtime firmware.

--*/

use flash_image::shared_data::{
    sw_component_minor, tlv_type, SharedDataTlvEntry, SharedDataTlvHeader,
    BLINFO_MAX_APPLICATION_SIZE, BLINFO_MODE, BLINFO_RUNNING_SLOT, BOOT_MODE_SINGLE_SLOT,
    SHARED_DATA_TLV_INFO_MAGIC, SW_MEASURE_TYPE, SW_MEASURE_VALUE, SW_SIGNER_ID, SW_VERSION,
    TLV_MAJOR_BLINFO, TLV_MAJOR_IAS,
};
use flash_image::trailer::TRAILER_SIZE;
use flash_image::{ImageHeader, IMAGE_TLV_KEYHASH, IMAGE_TLV_SHA256, SHA256_DIGEST_SIZE};
use zerocopy::{FromBytes, IntoBytes};

use crate::flash::{FlashDrvError, FlashPartition};
use crate::tlv::find_tlv;

const HEADER_SIZE: usize = core::mem::size_of::<SharedDataTlvHeader>();
const ENTRY_SIZE: usize = core::mem::size_of::<SharedDataTlvEntry>();

const MEASURE_TYPE_SHA256: &[u8] = b"SHA256";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttestationError {
    NoSpace,
    /// An entry of the same type was already recorded.
    Duplicate,
    /// The image carries no digest to measure.
    MissingMeasurement,
    Flash(FlashDrvError),
}

impl From<FlashDrvError> for AttestationError {
    fn from(err: FlashDrvError) -> Self {
        AttestationError::Flash(err)
    }
}

/// Sink for the records written after a successful validation.
pub trait BootRecorder {
    fn record_measurement(
        &mut self,
        image_index: u8,
        header: &ImageHeader,
        slot: &FlashPartition,
    ) -> Result<(), AttestationError>;

    fn record_shared_data(
        &mut self,
        header: &ImageHeader,
        slot: &FlashPartition,
        image_index: u8,
    ) -> Result<(), AttestationError>;
}

/// TLV area in memory shared with the runtime firmware.
///
/// ```text
/// | magic | tot_len | type | len | value ... | type | len | value ... |
/// ```
pub struct SharedDataArea<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> SharedDataArea<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let mut area = Self { buf, used: 0 };
        if area.buf.len() >= HEADER_SIZE {
            area.used = HEADER_SIZE;
            area.sync_header();
        }
        area
    }

    fn sync_header(&mut self) {
        let header = SharedDataTlvHeader {
            tlv_magic: SHARED_DATA_TLV_INFO_MAGIC,
            tlv_tot_len: self.used as u16,
        };
        self.buf[..HEADER_SIZE].copy_from_slice(header.as_bytes());
    }

    /// Encoded area, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    pub fn entries(&self) -> SharedDataEntries<'_> {
        SharedDataEntries {
            data: self.as_bytes().get(HEADER_SIZE..).unwrap_or(&[]),
        }
    }

    pub fn find(&self, major: u8, minor: u16) -> Option<&[u8]> {
        let wanted = tlv_type(major, minor);
        self.entries()
            .find(|(ty, _)| *ty == wanted)
            .map(|(_, value)| value)
    }

    pub fn add_entry(
        &mut self,
        major: u8,
        minor: u16,
        data: &[u8],
    ) -> Result<(), AttestationError> {
        if self.used < HEADER_SIZE {
            return Err(AttestationError::NoSpace);
        }
        if self.find(major, minor).is_some() {
            return Err(AttestationError::Duplicate);
        }
        let len = u16::try_from(data.len()).map_err(|_| AttestationError::NoSpace)?;
        let end = self
            .used
            .checked_add(ENTRY_SIZE + data.len())
            .filter(|end| *end <= self.buf.len() && *end <= u16::MAX as usize)
            .ok_or(AttestationError::NoSpace)?;

        let entry = SharedDataTlvEntry {
            tlv_type: tlv_type(major, minor),
            tlv_len: len,
        };
        self.buf[self.used..self.used + ENTRY_SIZE].copy_from_slice(entry.as_bytes());
        self.buf[self.used + ENTRY_SIZE..end].copy_from_slice(data);
        self.used = end;
        self.sync_header();
        Ok(())
    }
}

pub struct SharedDataEntries<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for SharedDataEntries<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let (entry, rest) = SharedDataTlvEntry::read_from_prefix(self.data).ok()?;
        let len = entry.tlv_len as usize;
        if rest.len() < len {
            self.data = &[];
            return None;
        }
        let (value, rest) = rest.split_at(len);
        self.data = rest;
        Some((entry.tlv_type, value))
    }
}

impl SharedDataArea<'_> {
    /// Drops every entry added after `used`.
    fn rollback(&mut self, used: usize) {
        if used < self.used {
            self.buf[used..self.used].fill(0);
            self.used = used;
            self.sync_header();
        }
    }

    /// Runs `add`, leaving the area as it was if any entry fails.
    fn all_or_nothing<F>(&mut self, add: F) -> Result<(), AttestationError>
    where
        F: FnOnce(&mut Self) -> Result<(), AttestationError>,
    {
        let used = self.used;
        let result = add(self);
        if result.is_err() {
            self.rollback(used);
        }
        result
    }
}

impl BootRecorder for SharedDataArea<'_> {
    fn record_measurement(
        &mut self,
        image_index: u8,
        header: &ImageHeader,
        slot: &FlashPartition,
    ) -> Result<(), AttestationError> {
        let entry = find_tlv(slot, header, IMAGE_TLV_SHA256)?
            .filter(|entry| entry.len == SHA256_DIGEST_SIZE)
            .ok_or(AttestationError::MissingMeasurement)?;
        let mut digest = [0u8; SHA256_DIGEST_SIZE];
        slot.read(entry.offset, &mut digest)?;

        // Signer id is only present for signed images.
        let mut key_hash_buf = [0u8; SHA256_DIGEST_SIZE];
        let key_hash = match find_tlv(slot, header, IMAGE_TLV_KEYHASH)? {
            Some(entry) => {
                let len = entry.len.min(key_hash_buf.len());
                slot.read(entry.offset, &mut key_hash_buf[..len])?;
                Some(&key_hash_buf[..len])
            }
            None => None,
        };

        let claim = |claim| sw_component_minor(image_index, claim);
        self.all_or_nothing(|area| {
            area.add_entry(TLV_MAJOR_IAS, claim(SW_MEASURE_VALUE), &digest)?;
            area.add_entry(TLV_MAJOR_IAS, claim(SW_MEASURE_TYPE), MEASURE_TYPE_SHA256)?;
            area.add_entry(TLV_MAJOR_IAS, claim(SW_VERSION), header.version.as_bytes())?;
            if let Some(key_hash) = key_hash {
                area.add_entry(TLV_MAJOR_IAS, claim(SW_SIGNER_ID), key_hash)?;
            }
            Ok(())
        })
    }

    fn record_shared_data(
        &mut self,
        _header: &ImageHeader,
        slot: &FlashPartition,
        image_index: u8,
    ) -> Result<(), AttestationError> {
        let max_app_size = slot.len().saturating_sub(TRAILER_SIZE) as u32;
        self.all_or_nothing(|area| {
            area.add_entry(TLV_MAJOR_BLINFO, BLINFO_MODE, &[BOOT_MODE_SINGLE_SLOT])?;
            area.add_entry(TLV_MAJOR_BLINFO, BLINFO_RUNNING_SLOT, &[image_index])?;
            area.add_entry(
                TLV_MAJOR_BLINFO,
                BLINFO_MAX_APPLICATION_SIZE,
                &max_app_size.to_le_bytes(),
            )
        })
    }
}
