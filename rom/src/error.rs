// Licensed under the Apache-2.0 license

use mcu_error::McuError;

use crate::boot_record::AttestationError;
use crate::flash::FlashDrvError;
use crate::header::HeaderError;
use crate::ram_load::StagingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The primary slot could not be opened; there is nothing to boot.
    FlashAreaOpen(FlashDrvError),
    MissingStager,
    MissingRecorder,
}

/// Reason a boot attempt did not produce a boot response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootFault {
    Configuration(ConfigurationError),
    Load(HeaderError),
    Staging(StagingError),
    /// The image check failed or was ambiguous.
    Validation,
    /// The validation record could not be read or written.
    Persistence(FlashDrvError),
    /// The image is valid but its measurement or shared data could not be
    /// recorded.
    Attestation(AttestationError),
}

impl From<BootFault> for McuError {
    fn from(fault: BootFault) -> McuError {
        match fault {
            BootFault::Configuration(ConfigurationError::FlashAreaOpen(_)) => {
                McuError::SINGLE_LOADER_FLASH_AREA_OPEN
            }
            BootFault::Configuration(_) => McuError::SINGLE_LOADER_CONFIGURATION,
            BootFault::Load(_) => McuError::SINGLE_LOADER_HEADER_LOAD,
            BootFault::Staging(_) => McuError::SINGLE_LOADER_RAM_STAGING,
            BootFault::Validation => McuError::SINGLE_LOADER_VALIDATION,
            BootFault::Persistence(_) => McuError::SINGLE_LOADER_PERSISTENCE,
            BootFault::Attestation(_) => McuError::SINGLE_LOADER_ATTESTATION,
        }
    }
}
