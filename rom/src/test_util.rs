// Licensed under the Apache-2.0 license

//! RAM-backed flash and image builders shared by the unit tests.

use core::cell::{Cell, RefCell};

use flash_image::{
    ImageFlags, ImageHeader, ImageTlv, ImageTlvInfo, ImageVersion, IMAGE_HEADER_SIZE,
    IMAGE_MAGIC, IMAGE_TLV_INFO_MAGIC, IMAGE_TLV_KEYHASH, IMAGE_TLV_SHA256,
};
use sha2::{Digest, Sha256};
use zerocopy::IntoBytes;

use crate::boot_status::FlowCheckpoint;
use crate::fih::FihResult;
use crate::flash::{FlashDrvError, FlashPartition, FlashStorage};
use crate::{ImageSource, ImageVerifier};

pub const SLOT_SIZE: usize = 0x1000;
pub const BODY_LEN: usize = 0x200;

pub struct RamFlash {
    data: RefCell<Vec<u8>>,
    fail_reads: Cell<bool>,
    writes_left: Cell<Option<usize>>,
    writes: Cell<usize>,
}

impl RamFlash {
    pub fn new(size: usize) -> Self {
        Self {
            data: RefCell::new(vec![0xff; size]),
            fail_reads: Cell::new(false),
            writes_left: Cell::new(None),
            writes: Cell::new(0),
        }
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.data.borrow()[offset..offset + len].to_vec()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Writes behind the driver's back; not counted and never failed.
    pub fn poke(&self, offset: usize, val: u8) {
        self.data.borrow_mut()[offset] = val;
    }

    pub fn poke_bytes(&self, offset: usize, bytes: &[u8]) {
        self.data.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Lets `n` more writes succeed, then fails every write.
    pub fn fail_writes_after(&self, n: usize) {
        self.writes_left.set(Some(n));
    }

    pub fn allow_writes(&self) {
        self.writes_left.set(None);
    }

    /// Successful driver writes so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn range(&self, address: usize, len: usize) -> Result<core::ops::Range<usize>, FlashDrvError> {
        match address.checked_add(len) {
            Some(end) if end <= self.capacity() => Ok(address..end),
            _ => Err(FlashDrvError::SIZE),
        }
    }
}

impl FlashStorage for RamFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        if self.fail_reads.get() {
            return Err(FlashDrvError::FAIL);
        }
        let range = self.range(address, buffer.len())?;
        buffer.copy_from_slice(&self.data.borrow()[range]);
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        match self.writes_left.get() {
            Some(0) => return Err(FlashDrvError::FAIL),
            Some(n) => self.writes_left.set(Some(n - 1)),
            None => {}
        }
        let range = self.range(address, buffer.len())?;
        self.data.borrow_mut()[range].copy_from_slice(buffer);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.borrow().len()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TlvDigest {
    /// SHA-256 of the bytes actually written.
    Computed,
    Fixed([u8; 32]),
}

#[derive(Clone, Debug)]
pub struct TestImage {
    pub flags: ImageFlags,
    pub load_addr: u32,
    pub body_len: usize,
    /// `None` leaves the TLV area erased.
    pub digest: Option<TlvDigest>,
    pub key_hash: Option<[u8; 32]>,
}

impl Default for TestImage {
    fn default() -> Self {
        Self {
            flags: ImageFlags::empty(),
            load_addr: 0,
            body_len: BODY_LEN,
            digest: Some(TlvDigest::Computed),
            key_hash: None,
        }
    }
}

fn push_tlv(area: &mut Vec<u8>, it_type: u16, value: &[u8]) {
    let tlv = ImageTlv {
        it_type,
        it_len: value.len() as u16,
    };
    area.extend_from_slice(tlv.as_bytes());
    area.extend_from_slice(value);
}

/// Writes header, body and TLV area at `offset` and returns the header.
pub fn write_image(flash: &RamFlash, offset: usize, layout: &TestImage) -> ImageHeader {
    let header = ImageHeader {
        magic: IMAGE_MAGIC,
        load_addr: layout.load_addr,
        hdr_size: IMAGE_HEADER_SIZE as u16,
        protect_tlv_size: 0,
        img_size: layout.body_len as u32,
        flags: layout.flags.bits(),
        version: ImageVersion {
            major: 1,
            minor: 2,
            revision: 3,
            build_num: 4,
        },
        reserved: 0,
    };
    let mut image = header.as_bytes().to_vec();
    image.extend((0..layout.body_len).map(|i| (i * 7 + 3) as u8));

    if let Some(digest) = layout.digest {
        let digest = match digest {
            TlvDigest::Computed => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&Sha256::digest(&image));
                out
            }
            TlvDigest::Fixed(digest) => digest,
        };
        let mut tlvs = Vec::new();
        push_tlv(&mut tlvs, IMAGE_TLV_SHA256, &digest);
        if let Some(key_hash) = layout.key_hash {
            push_tlv(&mut tlvs, IMAGE_TLV_KEYHASH, &key_hash);
        }
        let info = ImageTlvInfo {
            magic: IMAGE_TLV_INFO_MAGIC,
            tlv_tot: (core::mem::size_of::<ImageTlvInfo>() + tlvs.len()) as u16,
        };
        image.extend_from_slice(info.as_bytes());
        image.extend_from_slice(&tlvs);
    }

    flash.poke_bytes(offset, &image);
    header
}

/// Returns a fixed result and records how it was called.
pub struct MockVerifier {
    result: FihResult,
    calls: Cell<usize>,
    scratch_len: Cell<usize>,
    seen_flags: Cell<Option<ImageFlags>>,
    staged_len: Cell<Option<usize>>,
}

impl MockVerifier {
    pub fn new(result: FihResult) -> Self {
        Self {
            result,
            calls: Cell::new(0),
            scratch_len: Cell::new(0),
            seen_flags: Cell::new(None),
            staged_len: Cell::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn scratch_len(&self) -> usize {
        self.scratch_len.get()
    }

    pub fn seen_flags(&self) -> Option<ImageFlags> {
        self.seen_flags.get()
    }

    /// Length of the staged copy from the last call, `None` if the slot was read.
    pub fn staged_len(&self) -> Option<usize> {
        self.staged_len.get()
    }
}

impl ImageVerifier for MockVerifier {
    fn validate_image(
        &self,
        header: &ImageHeader,
        _slot: &FlashPartition,
        image: ImageSource,
        scratch: &mut [u8],
    ) -> FihResult {
        self.calls.set(self.calls.get() + 1);
        self.staged_len.set(match image {
            ImageSource::Slot => None,
            ImageSource::Staged(staged) => Some(staged.len()),
        });
        self.scratch_len.set(scratch.len());
        self.seen_flags.set(Some(header.flags()));
        self.result
    }
}

#[derive(Default)]
pub struct CheckpointLog {
    entries: RefCell<Vec<u16>>,
}

impl CheckpointLog {
    pub fn entries(&self) -> Vec<u16> {
        self.entries.borrow().clone()
    }

    pub fn contains(&self, status: impl Into<u16>) -> bool {
        self.entries.borrow().contains(&status.into())
    }

    pub fn last(&self) -> Option<u16> {
        self.entries.borrow().last().copied()
    }
}

impl FlowCheckpoint for CheckpointLog {
    fn set_flow_checkpoint(&self, checkpoint: u16) {
        self.entries.borrow_mut().push(checkpoint);
    }
}
