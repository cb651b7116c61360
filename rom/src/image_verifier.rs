// Licensed under the Apache-2.0 license

use flash_image::ImageHeader;

use crate::fih::FihResult;
use crate::flash::FlashPartition;

/// Where the hashed part of the image (header, body and protected TLVs) is
/// read from. The unprotected TLV area always comes from the slot.
#[derive(Clone, Copy, Debug)]
pub enum ImageSource<'a> {
    /// The image runs in place; read it from the slot.
    Slot,
    /// The copy staged in RAM, starting with the header. This is what runs.
    Staged(&'a [u8]),
}

/// Verifies the authenticity and integrity of the image held in `slot`.
///
/// Parameters:
///   header:  Header loaded from the slot, possibly with flags adjusted by the loader
///   slot:    The open slot; TLVs are read from flash through it
///   image:   Bytes covered by the image hash
///   scratch: Fixed-size buffer for chunked reads; no allocation is available
///
/// Returns:
///   `FihResult::SUCCESS` only if every check passes.
///   Any other value, on any structural, policy, I/O or cryptographic failure.
pub trait ImageVerifier {
    fn validate_image(
        &self,
        header: &ImageHeader,
        slot: &FlashPartition,
        image: ImageSource,
        scratch: &mut [u8],
    ) -> FihResult;
}
