// Licensed under the Apache-2.0 license

//! Integrity check against the SHA-256 TLV stored after the image.

use core::hint::black_box;

use constant_time_eq::constant_time_eq;
use flash_image::{ImageHeader, IMAGE_TLV_SHA256, SHA256_DIGEST_SIZE};
use sha2::{Digest, Sha256};

use crate::fih::FihResult;
use crate::flash::{FlashDrvError, FlashPartition};
use crate::tlv::find_tlv;
use crate::{ImageSource, ImageVerifier};

/// Hashes the header, image body and protected TLVs and compares the result
/// with the image's SHA-256 TLV. A staged image is hashed from RAM.
///
/// Encrypted images are rejected: there is no decryption support here.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Verifier;

pub(crate) fn image_hash(
    header: &ImageHeader,
    slot: &FlashPartition,
    scratch: &mut [u8],
) -> Result<[u8; SHA256_DIGEST_SIZE], FlashDrvError> {
    if scratch.is_empty() {
        return Err(FlashDrvError::INVAL);
    }
    let end = header.tlv_offset().ok_or(FlashDrvError::SIZE)? as usize;
    let mut hasher = Sha256::new();
    let mut off = 0;
    while off < end {
        let chunk = scratch.len().min(end - off);
        slot.read(off, &mut scratch[..chunk])?;
        hasher.update(&scratch[..chunk]);
        off += chunk;
    }
    let mut digest = [0u8; SHA256_DIGEST_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

fn staged_hash(
    header: &ImageHeader,
    staged: &[u8],
) -> Result<[u8; SHA256_DIGEST_SIZE], FlashDrvError> {
    // The copy must cover exactly the hashed region.
    let end = header.tlv_offset().ok_or(FlashDrvError::SIZE)? as usize;
    if staged.len() != end {
        return Err(FlashDrvError::SIZE);
    }
    let mut digest = [0u8; SHA256_DIGEST_SIZE];
    digest.copy_from_slice(&Sha256::digest(staged));
    Ok(digest)
}

fn expected_hash(
    header: &ImageHeader,
    slot: &FlashPartition,
) -> Result<[u8; SHA256_DIGEST_SIZE], FlashDrvError> {
    let entry = find_tlv(slot, header, IMAGE_TLV_SHA256)?.ok_or(FlashDrvError::INVAL)?;
    if entry.len != SHA256_DIGEST_SIZE {
        return Err(FlashDrvError::INVAL);
    }
    let mut digest = [0u8; SHA256_DIGEST_SIZE];
    slot.read(entry.offset, &mut digest)?;
    Ok(digest)
}

impl ImageVerifier for Sha256Verifier {
    fn validate_image(
        &self,
        header: &ImageHeader,
        slot: &FlashPartition,
        image: ImageSource,
        scratch: &mut [u8],
    ) -> FihResult {
        if !header.has_valid_magic() || header.is_encrypted() {
            return FihResult::FAILURE;
        }
        let actual = match image {
            ImageSource::Slot => image_hash(header, slot, scratch),
            ImageSource::Staged(staged) => staged_hash(header, staged),
        };
        let actual = match actual {
            Ok(digest) => digest,
            Err(err) => {
                romtime::error!("[mcu-boot] image hash failed: {:?}", err);
                return FihResult::FAILURE;
            }
        };
        let expected = match expected_hash(header, slot) {
            Ok(digest) => digest,
            Err(err) => {
                romtime::error!("[mcu-boot] no usable SHA-256 TLV: {:?}", err);
                return FihResult::FAILURE;
            }
        };

        let mut rc = FihResult::FAILURE;
        if constant_time_eq(&actual, &expected) {
            if constant_time_eq(black_box(&actual), black_box(&expected)) {
                rc = FihResult::SUCCESS;
            }
        } else {
            romtime::debug!(
                "[mcu-boot] hash mismatch: {}",
                romtime::HexBytes(&actual)
            );
        }
        rc
    }
}
