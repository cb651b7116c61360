/*++

Licensed under the Apache-2.0 license.

File Name:

    validate_once.rs

Abstract:

    Validate the primary image once and remember the outcome in the slot
    trailer.

--*/

use core::hint::black_box;

use flash_image::ImageHeader;

use crate::fih::{fih_not_eq, fih_normalize, FihResult};
use crate::flash::{FlashDrvError, FlashPartition};
use crate::record::{read_record, write_bootable, write_magic, RecordMagic, ValidationRecord};
use crate::validate::validate_source;
use crate::{ImageSource, ImageVerifier};

/// Progress of the trailer update after a successful validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OnceState {
    Unvalidated,
    MagicWritten,
    Bootable,
}

impl OnceState {
    fn of(record: &ValidationRecord) -> Self {
        if record.is_bootable() {
            OnceState::Bootable
        } else if record.magic == RecordMagic::Good {
            OnceState::MagicWritten
        } else {
            OnceState::Unvalidated
        }
    }

    /// Writes the next trailer field. Magic always goes before image_ok.
    fn step(self, slot: &FlashPartition) -> Result<Self, FlashDrvError> {
        match self {
            OnceState::Unvalidated => write_magic(slot).map(|_| OnceState::MagicWritten),
            OnceState::MagicWritten => write_bootable(slot).map(|_| OnceState::Bootable),
            OnceState::Bootable => Ok(OnceState::Bootable),
        }
    }
}

/// Validates the image unless the slot trailer already records it as both
/// confirmed and bootable.
///
/// After a successful validation the magic is written (if not already good)
/// and then image_ok. A storage error at any step is final: no retry, and
/// the result is FAILURE. A failed validation never touches the trailer.
pub fn boot_image_validate_once(
    verifier: &dyn ImageVerifier,
    slot: &FlashPartition,
    header: &mut ImageHeader,
    decryption_key_present: bool,
) -> FihResult {
    let mut storage_fault = None;
    validate_once(
        verifier,
        slot,
        ImageSource::Slot,
        header,
        decryption_key_present,
        &mut storage_fault,
    )
}

/// As [`boot_image_validate_once`], hashing `image` and additionally
/// reporting the storage error that caused a failure.
///
/// The record only vouches for the slot, so a staged copy is validated on
/// every boot.
pub(crate) fn validate_once(
    verifier: &dyn ImageVerifier,
    slot: &FlashPartition,
    image: ImageSource,
    header: &mut ImageHeader,
    decryption_key_present: bool,
    storage_fault: &mut Option<FlashDrvError>,
) -> FihResult {
    romtime::debug!("[mcu-boot] boot_image_validate_once: flash area {}", slot.name());

    let record = match read_record(slot) {
        Ok(record) => record,
        Err(err) => {
            romtime::error!("[mcu-boot] failed to read validation record: {:?}", err);
            *storage_fault = Some(err);
            return FihResult::FAILURE;
        }
    };

    let in_place = matches!(image, ImageSource::Slot);
    // Both evaluations must agree before validation is skipped.
    if in_place && (record.is_bootable() & black_box(record).is_bootable()) {
        romtime::debug!("[mcu-boot] image previously validated");
        return FihResult::SUCCESS;
    }

    let rc = validate_source(verifier, slot, image, header, decryption_key_present);
    if fih_not_eq(rc, FihResult::SUCCESS) {
        return FihResult::FAILURE;
    }

    let mut state = OnceState::of(&record);
    loop {
        if state == OnceState::Bootable {
            return fih_normalize(rc);
        }
        match state.step(slot) {
            Ok(next) => {
                romtime::debug!("[mcu-boot] validate once: {:?} -> {:?}", state, next);
                state = next;
            }
            Err(err) => {
                romtime::error!(
                    "[mcu-boot] failed to update validation record from {:?}: {:?}",
                    state,
                    err
                );
                *storage_fault = Some(err);
                return FihResult::FAILURE;
            }
        }
    }
}
