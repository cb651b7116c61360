/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Fatal error codes reported by the MCU single-image loader.

--*/

#![cfg_attr(not(test), no_std)]

use core::num::NonZeroU32;

/// Fatal error code. Zero is reserved so that a cleared error register never
/// decodes as a valid code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct McuError(pub NonZeroU32);

impl McuError {
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("McuError cannot be 0"),
        }
    }

    pub const SINGLE_LOADER_CONFIGURATION: McuError = McuError::new_const(0x000b_0001);
    pub const SINGLE_LOADER_FLASH_AREA_OPEN: McuError = McuError::new_const(0x000b_0002);
    pub const SINGLE_LOADER_HEADER_LOAD: McuError = McuError::new_const(0x000b_0003);
    pub const SINGLE_LOADER_RAM_STAGING: McuError = McuError::new_const(0x000b_0004);
    pub const SINGLE_LOADER_VALIDATION: McuError = McuError::new_const(0x000b_0005);
    pub const SINGLE_LOADER_PERSISTENCE: McuError = McuError::new_const(0x000b_0006);
    pub const SINGLE_LOADER_ATTESTATION: McuError = McuError::new_const(0x000b_0007);
}

impl From<McuError> for u32 {
    fn from(err: McuError) -> u32 {
        err.0.get()
    }
}

impl From<McuError> for NonZeroU32 {
    fn from(err: McuError) -> NonZeroU32 {
        err.0
    }
}
