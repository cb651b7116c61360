/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Boot decision core of the MCU single-image loader.

--*/

#![cfg_attr(not(test), no_std)]

pub mod boot_record;
pub use boot_record::{AttestationError, BootRecorder, SharedDataArea};
pub mod boot_status;
pub use boot_status::*;
pub mod error;
pub use error::{BootFault, ConfigurationError};
pub mod fih;
pub use fih::FihResult;
pub mod flash;
pub use flash::*;
pub mod header;
pub use header::{FlashHeaderLoader, HeaderError, HeaderLoader};
pub mod image_verifier;
pub use image_verifier::{ImageSource, ImageVerifier};
pub mod ram_load;
pub use ram_load::{RamStager, SramStager, StagingError};
pub mod record;
pub mod sha256_verifier;
pub use sha256_verifier::Sha256Verifier;
mod single_loader;
pub use single_loader::*;
pub mod tlv;
pub mod validate;
pub use validate::boot_image_validate;
pub mod validate_once;
pub use validate_once::boot_image_validate_once;

#[cfg(test)]
mod test_util;

pub trait FatalErrorHandler {
    fn fatal_error(&mut self, code: u32) -> !;
}

static mut FATAL_ERROR_HANDLER: Option<&'static mut dyn FatalErrorHandler> = None;

/// Set the fatal error handler.
///
/// SAFETY: the handler must not be used or referenced anywhere else once it
/// has been passed in. Create a single instance and hand it over immediately.
pub fn set_fatal_error_handler(handler: &'static mut dyn FatalErrorHandler) {
    unsafe {
        FATAL_ERROR_HANDLER = Some(handler);
    }
}

#[inline(never)]
#[allow(clippy::empty_loop)]
pub fn fatal_error(code: u32) -> ! {
    #[allow(static_mut_refs)]
    if let Some(handler) = unsafe { FATAL_ERROR_HANDLER.as_mut() } {
        handler.fatal_error(code);
    } else {
        // No handler installed; hang.
        loop {}
    }
}
