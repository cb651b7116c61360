// Licensed under the Apache-2.0 license

//! Boots images end to end with the real verifier, stager and shared data
//! area over a RAM-backed flash device.

use std::cell::{Cell, RefCell};

use flash_image::shared_data::{
    sw_component_minor, BLINFO_MODE, BOOT_MODE_SINGLE_SLOT, SW_MEASURE_VALUE, TLV_MAJOR_BLINFO,
    TLV_MAJOR_IAS,
};
use flash_image::trailer::BOOT_MAGIC;
use flash_image::{
    ImageFlags, ImageHeader, ImageTlv, ImageTlvInfo, ImageVersion, IMAGE_HEADER_SIZE,
    IMAGE_MAGIC, IMAGE_TLV_INFO_MAGIC, IMAGE_TLV_SHA256,
};
use mcu_single_loader::{
    BootFault, BootFeatures, BootParameters, FlashAreaDescriptor, FlashAreaMap, FlashDrvError,
    FlashHeaderLoader, FlashStorage, RamStager, SharedDataArea, Sha256Verifier, SingleLoader,
    SingleLoaderEnv, SramStager, StaticFlashMap, ValidationPolicy, FLASH_AREA_IMAGE_PRIMARY,
};
use sha2::{Digest, Sha256};
use zerocopy::IntoBytes;

const FLASH_SIZE: usize = 0x4000;
const SLOT_OFFSET: usize = 0x2000;
const SLOT_SIZE: usize = 0x2000;
const RAM_BASE: u32 = 0x2000_0000;

const AREAS: [FlashAreaDescriptor; 1] = [FlashAreaDescriptor {
    id: FLASH_AREA_IMAGE_PRIMARY,
    device_id: 0,
    name: "image-0",
    offset: SLOT_OFFSET,
    size: SLOT_SIZE,
}];

struct Flash(RefCell<Vec<u8>>);

impl Flash {
    fn new() -> Self {
        Self(RefCell::new(vec![0xff; FLASH_SIZE]))
    }

    fn program(&self, offset: usize, bytes: &[u8]) {
        self.0.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn slot_tail(&self, len: usize) -> Vec<u8> {
        let end = SLOT_OFFSET + SLOT_SIZE;
        self.0.borrow()[end - len..end].to_vec()
    }
}

impl FlashStorage for Flash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        let data = self.0.borrow();
        let src = data
            .get(address..address + buffer.len())
            .ok_or(FlashDrvError::SIZE)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        let mut data = self.0.borrow_mut();
        let dst = data
            .get_mut(address..address + buffer.len())
            .ok_or(FlashDrvError::SIZE)?;
        dst.copy_from_slice(buffer);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Returns different data for one read than for all the others, like an
/// external flash swapped or glitched while the image is copied out.
struct SwappingFlash {
    inner: Flash,
    /// Reads of exactly this many bytes get one bit flipped.
    read_len: usize,
    flip_at: usize,
    flipped: Cell<usize>,
}

impl FlashStorage for SwappingFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        self.inner.read(buffer, address)?;
        if buffer.len() == self.read_len {
            buffer[self.flip_at] ^= 0x01;
            self.flipped.set(self.flipped.get() + 1);
        }
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        self.inner.write(buffer, address)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

fn signed_image(flags: ImageFlags, load_addr: u32, body: &[u8]) -> Vec<u8> {
    let header = ImageHeader {
        magic: IMAGE_MAGIC,
        load_addr,
        hdr_size: IMAGE_HEADER_SIZE as u16,
        protect_tlv_size: 0,
        img_size: body.len() as u32,
        flags: flags.bits(),
        version: ImageVersion {
            major: 2,
            minor: 0,
            revision: 1,
            build_num: 17,
        },
        reserved: 0,
    };
    let mut image = header.as_bytes().to_vec();
    image.extend_from_slice(body);
    let digest = Sha256::digest(&image);

    let tlv = ImageTlv {
        it_type: IMAGE_TLV_SHA256,
        it_len: digest.len() as u16,
    };
    let info = ImageTlvInfo {
        magic: IMAGE_TLV_INFO_MAGIC,
        tlv_tot: (4 + 4 + digest.len()) as u16,
    };
    image.extend_from_slice(info.as_bytes());
    image.extend_from_slice(tlv.as_bytes());
    image.extend_from_slice(&digest);
    image
}

fn body() -> Vec<u8> {
    (0..0x400u32).map(|i| (i ^ (i >> 3)) as u8).collect()
}

#[test]
fn boots_signed_image_from_ram_with_attestation() {
    let flash = Flash::new();
    let image = signed_image(ImageFlags::RAM_LOAD, RAM_BASE, &body());
    flash.program(SLOT_OFFSET, &image);

    let map = StaticFlashMap::new(&flash, &AREAS);
    let mut sram = vec![0u8; 0x1000];
    let mut stager = SramStager::new(&mut sram, RAM_BASE);
    let mut shared = [0u8; 256];
    let mut area = SharedDataArea::new(&mut shared);

    let env = SingleLoaderEnv {
        flash_map: &map,
        header_loader: &FlashHeaderLoader,
        verifier: &Sha256Verifier,
        stager: Some(&mut stager),
        recorder: Some(&mut area),
        checkpoint: None,
    };
    let params = BootParameters {
        features: BootFeatures::RAM_LOAD | BootFeatures::MEASURED_BOOT | BootFeatures::DATA_SHARING,
        ..Default::default()
    };
    let rsp = SingleLoader::new(env, params).unwrap().boot().unwrap();
    assert_eq!(rsp.flash_dev_id, 0);
    assert_eq!(rsp.image_off, SLOT_OFFSET);
    assert_eq!(rsp.header.version.build_num, 17);
    assert_eq!(map.open_count(), 0);

    let tlv_offset = rsp.header.tlv_offset().unwrap() as usize;
    assert_eq!(stager.staged().unwrap(), &image[..tlv_offset]);

    let digest = Sha256::digest(&image[..tlv_offset]);
    assert_eq!(
        area.find(TLV_MAJOR_IAS, sw_component_minor(0, SW_MEASURE_VALUE)),
        Some(&digest[..])
    );
    assert_eq!(
        area.find(TLV_MAJOR_BLINFO, BLINFO_MODE),
        Some(&[BOOT_MODE_SINGLE_SLOT][..])
    );
}

#[test]
fn rejects_tampered_image_and_clears_ram() {
    let flash = Flash::new();
    let mut image = signed_image(ImageFlags::RAM_LOAD, RAM_BASE, &body());
    image[IMAGE_HEADER_SIZE + 0x80] ^= 0x01;
    flash.program(SLOT_OFFSET, &image);

    let map = StaticFlashMap::new(&flash, &AREAS);
    let mut sram = vec![0u8; 0x1000];
    let mut stager = SramStager::new(&mut sram, RAM_BASE);
    let mut shared = [0u8; 256];
    let mut area = SharedDataArea::new(&mut shared);

    let env = SingleLoaderEnv {
        flash_map: &map,
        header_loader: &FlashHeaderLoader,
        verifier: &Sha256Verifier,
        stager: Some(&mut stager),
        recorder: Some(&mut area),
        checkpoint: None,
    };
    let params = BootParameters {
        validation: ValidationPolicy::Once,
        features: BootFeatures::RAM_LOAD | BootFeatures::MEASURED_BOOT,
        ..Default::default()
    };
    let result = SingleLoader::new(env, params).unwrap().boot();
    assert_eq!(result, Err(BootFault::Validation));

    assert!(stager.staged().is_none());
    assert_eq!(area.entries().count(), 0);
    assert_eq!(map.open_count(), 0);
    // The trailer is untouched.
    assert!(flash.slot_tail(24).iter().all(|b| *b == 0xff));
    drop(stager);
    assert!(sram.iter().all(|b| *b == 0));
}

#[test]
fn validate_once_persists_and_skips_later_checks() {
    let flash = Flash::new();
    flash.program(SLOT_OFFSET, &signed_image(ImageFlags::empty(), 0, &body()));
    let map = StaticFlashMap::new(&flash, &AREAS);
    let params = BootParameters {
        validation: ValidationPolicy::Once,
        ..Default::default()
    };

    let boot = || {
        let env = SingleLoaderEnv {
            flash_map: &map,
            header_loader: &FlashHeaderLoader,
            verifier: &Sha256Verifier,
            stager: None,
            recorder: None,
            checkpoint: None,
        };
        SingleLoader::new(env, params).unwrap().boot()
    };

    assert!(boot().is_ok());
    assert_eq!(flash.slot_tail(16), BOOT_MAGIC.to_vec());

    // Once recorded as bootable the body is no longer hashed.
    flash.program(SLOT_OFFSET + IMAGE_HEADER_SIZE, &[0u8; 4]);
    assert!(boot().is_ok());

    // Clearing the record brings validation back.
    flash.program(SLOT_OFFSET + SLOT_SIZE - 24, &[0xff; 24]);
    assert_eq!(boot(), Err(BootFault::Validation));
}

#[test]
fn erased_slot_is_not_bootable() {
    let flash = Flash::new();
    let map = StaticFlashMap::new(&flash, &AREAS);
    let env = SingleLoaderEnv {
        flash_map: &map,
        header_loader: &FlashHeaderLoader,
        verifier: &Sha256Verifier,
        stager: None,
        recorder: None,
        checkpoint: None,
    };
    let result = SingleLoader::new(env, BootParameters::default())
        .unwrap()
        .boot();
    assert!(matches!(result, Err(BootFault::Load(_))));

    let slot = map.open(FLASH_AREA_IMAGE_PRIMARY).unwrap();
    assert_eq!(slot.len(), SLOT_SIZE);
    map.close(slot);
    assert_eq!(map.open_count(), 0);
}

fn boot_with_swapped_copy(validation: ValidationPolicy) {
    let image = signed_image(ImageFlags::RAM_LOAD, RAM_BASE, &body());
    let tlv_offset = IMAGE_HEADER_SIZE + body().len();
    let flash = SwappingFlash {
        inner: Flash::new(),
        read_len: tlv_offset,
        flip_at: IMAGE_HEADER_SIZE + 0x10,
        flipped: Cell::new(0),
    };
    flash.inner.program(SLOT_OFFSET, &image);
    if validation == ValidationPolicy::Once {
        // A previous boot already recorded the slot as validated.
        let mut trailer = [0xffu8; 24];
        trailer[0] = 0x01;
        trailer[8..].copy_from_slice(&BOOT_MAGIC);
        flash.inner.program(SLOT_OFFSET + SLOT_SIZE - 24, &trailer);
    }

    let map = StaticFlashMap::new(&flash, &AREAS);
    let mut sram = vec![0u8; 0x1000];
    let mut stager = SramStager::new(&mut sram, RAM_BASE);
    let env = SingleLoaderEnv {
        flash_map: &map,
        header_loader: &FlashHeaderLoader,
        verifier: &Sha256Verifier,
        stager: Some(&mut stager),
        recorder: None,
        checkpoint: None,
    };
    let params = BootParameters {
        validation,
        features: BootFeatures::RAM_LOAD,
        ..Default::default()
    };
    let result = SingleLoader::new(env, params).unwrap().boot();

    assert_eq!(flash.flipped.get(), 1);
    assert_eq!(result, Err(BootFault::Validation));
    assert!(stager.staged().is_none());
    assert_eq!(map.open_count(), 0);
    drop(stager);
    assert!(sram.iter().all(|b| *b == 0));
}

#[test]
fn ram_copy_differing_from_flash_is_rejected() {
    boot_with_swapped_copy(ValidationPolicy::Always);
}

#[test]
fn ram_copy_is_validated_even_when_slot_is_recorded_bootable() {
    boot_with_swapped_copy(ValidationPolicy::Once);
}
