// Licensed under the Apache-2.0 license

use flash_image::{ImageFlags, ImageHeader};

use crate::fih::{fih_call, FihResult};
use crate::flash::FlashPartition;
use crate::{ImageSource, ImageVerifier};

/// Size of the scratch buffer handed to the image verifier.
pub const BOOT_TMPBUF_SZ: usize = 256;

/// Validates the image in `slot`.
///
/// If the header still carries an encrypted flag but no decryption key is
/// present, the flag is cleared first. It can be left over from an
/// interrupted in-place decryption; validation still runs against the bytes
/// on flash and fails if they are really encrypted.
pub fn boot_image_validate(
    verifier: &dyn ImageVerifier,
    slot: &FlashPartition,
    header: &mut ImageHeader,
    decryption_key_present: bool,
) -> FihResult {
    validate_source(verifier, slot, ImageSource::Slot, header, decryption_key_present)
}

/// As [`boot_image_validate`], hashing `image` instead of always reading the
/// slot.
pub(crate) fn validate_source(
    verifier: &dyn ImageVerifier,
    slot: &FlashPartition,
    image: ImageSource,
    header: &mut ImageHeader,
    decryption_key_present: bool,
) -> FihResult {
    romtime::debug!(
        "[mcu-boot] boot_image_validate: encrypted == {}",
        header.is_encrypted()
    );

    if header.is_encrypted() && !decryption_key_present {
        header.clear_flags(ImageFlags::ENCRYPTED);
    }

    // Lives for this call only; the loader is single threaded and never
    // re-entered.
    let mut tmpbuf = [0u8; BOOT_TMPBUF_SZ];
    let header: &ImageHeader = header;
    fih_call(|| verifier.validate_image(header, slot, image, &mut tmpbuf))
}
