/*++

Licensed under the Apache-2.0 license.

File Name:

    single_loader.rs

Abstract:

    Single image boot flow - validates the image in the primary slot and
    reports where it lives to the code that jumps to it.

--*/

use bitflags::bitflags;
use flash_image::ImageHeader;
use mcu_error::McuError;
use romtime::HexWord;

use crate::boot_record::BootRecorder;
use crate::boot_status::{FlowCheckpoint, SingleLoaderBootStatus};
use crate::error::{BootFault, ConfigurationError};
use crate::fih::{fih_eq, fih_not_eq, FihResult};
use crate::flash::{FlashAreaMap, FlashDrvError, FlashPartition, FLASH_AREA_IMAGE_PRIMARY};
use crate::header::HeaderLoader;
use crate::ram_load::RamStager;
use crate::validate::validate_source;
use crate::validate_once::validate_once;
use crate::{fatal_error, ImageSource, ImageVerifier};

/// How the primary image is checked before it is booted. Exactly one policy
/// is active per build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Validate on every boot.
    #[default]
    Always,
    /// Validate until the slot trailer records a successful validation.
    Once,
    /// No validation.
    Disabled,
}

bitflags! {
    /// Optional stages of the boot flow.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BootFeatures: u32 {
        const RAM_LOAD = 1 << 0;
        const MEASURED_BOOT = 1 << 1;
        const DATA_SHARING = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BootParameters {
    pub primary_area_id: u8,
    pub image_index: u8,
    pub validation: ValidationPolicy,
    pub features: BootFeatures,
    /// Whether this build carries a key able to decrypt images.
    pub decryption_key_present: bool,
}

impl Default for BootParameters {
    fn default() -> Self {
        Self {
            primary_area_id: FLASH_AREA_IMAGE_PRIMARY,
            image_index: 0,
            validation: ValidationPolicy::default(),
            features: BootFeatures::empty(),
            decryption_key_present: false,
        }
    }
}

/// Collaborators used by the loader.
pub struct SingleLoaderEnv<'a> {
    pub flash_map: &'a dyn FlashAreaMap<'a>,
    pub header_loader: &'a dyn HeaderLoader,
    pub verifier: &'a dyn ImageVerifier,
    /// Required with `BootFeatures::RAM_LOAD`.
    pub stager: Option<&'a mut dyn RamStager>,
    /// Required with `BootFeatures::MEASURED_BOOT` or `BootFeatures::DATA_SHARING`.
    pub recorder: Option<&'a mut dyn BootRecorder>,
    pub checkpoint: Option<&'a dyn FlowCheckpoint>,
}

/// Where the validated image lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootResponse {
    pub flash_dev_id: u8,
    pub image_off: usize,
    pub header: ImageHeader,
}

pub struct SingleLoader<'a> {
    env: SingleLoaderEnv<'a>,
    params: BootParameters,
}

fn report(checkpoint: Option<&dyn FlowCheckpoint>, status: SingleLoaderBootStatus) {
    if let Some(checkpoint) = checkpoint {
        checkpoint.set_flow_checkpoint(status.into());
    }
}

impl<'a> SingleLoader<'a> {
    /// Checks that every enabled feature has a collaborator.
    pub fn new(env: SingleLoaderEnv<'a>, params: BootParameters) -> Result<Self, BootFault> {
        if params.features.contains(BootFeatures::RAM_LOAD) && env.stager.is_none() {
            return Err(BootFault::Configuration(ConfigurationError::MissingStager));
        }
        if params
            .features
            .intersects(BootFeatures::MEASURED_BOOT | BootFeatures::DATA_SHARING)
            && env.recorder.is_none()
        {
            return Err(BootFault::Configuration(ConfigurationError::MissingRecorder));
        }
        if params.validation == ValidationPolicy::Disabled {
            romtime::warn!("[mcu-boot] image validation is disabled");
        }
        Ok(Self { env, params })
    }

    fn checkpoint(&self, status: SingleLoaderBootStatus) {
        report(self.env.checkpoint, status);
    }

    /// Runs one boot attempt. The slot is released on every path.
    pub fn boot(&mut self) -> Result<BootResponse, BootFault> {
        romtime::debug!("[mcu-boot] boot_go: single loader");
        self.checkpoint(SingleLoaderBootStatus::SingleLoaderStarted);

        let flash_map = self.env.flash_map;
        let area_id = self.params.primary_area_id;
        let slot = flash_map.open(area_id).map_err(|err| {
            romtime::error!("[mcu-boot] Failed to open flash area {}: {:?}", area_id, err);
            BootFault::Configuration(ConfigurationError::FlashAreaOpen(err))
        })?;
        self.checkpoint(SingleLoaderBootStatus::FlashAreaOpened);

        let result = self.boot_slot(&slot);

        flash_map.close(slot);
        self.checkpoint(SingleLoaderBootStatus::FlashAreaClosed);
        result
    }

    fn boot_slot(&mut self, slot: &FlashPartition) -> Result<BootResponse, BootFault> {
        let mut header = self.env.header_loader.load_header(slot).map_err(|err| {
            romtime::error!("[mcu-boot] Failed to load image header: {:?}", err);
            BootFault::Load(err)
        })?;
        self.checkpoint(SingleLoaderBootStatus::ImageHeaderLoaded);

        let staged = self.stage(&header, slot)?;

        self.checkpoint(SingleLoaderBootStatus::ValidationStarted);
        let mut storage_fault = None;
        // A staged copy is what runs, so that is what gets validated.
        let image = self.staged_image(staged);
        let rc = self.validate(slot, image, &mut header, &mut storage_fault);
        if fih_not_eq(rc, FihResult::SUCCESS) {
            self.checkpoint(SingleLoaderBootStatus::ValidationFailed);
            self.discard_staged(staged, &header);
            romtime::error!(
                "[mcu-boot] Image in {} failed validation: {}",
                slot.name(),
                HexWord(rc.raw())
            );
            return Err(match storage_fault {
                Some(err) => BootFault::Persistence(err),
                None => BootFault::Validation,
            });
        }
        self.checkpoint(SingleLoaderBootStatus::ValidationComplete);

        if let Err(fault) = self.record(&header, slot) {
            self.discard_staged(staged, &header);
            return Err(fault);
        }

        // Independent re-check of the validation result before the image is
        // handed out.
        if !fih_eq(rc, FihResult::SUCCESS) {
            romtime::error!("[mcu-boot] Validation result changed after check");
            self.discard_staged(staged, &header);
            return Err(BootFault::Validation);
        }

        let rsp = BootResponse {
            flash_dev_id: slot.device_id(),
            image_off: slot.base_offset(),
            header,
        };
        self.checkpoint(SingleLoaderBootStatus::BootResponseReady);
        Ok(rsp)
    }

    /// Returns whether a copy was staged.
    fn stage(&mut self, header: &ImageHeader, slot: &FlashPartition) -> Result<bool, BootFault> {
        if !self.params.features.contains(BootFeatures::RAM_LOAD) {
            return Ok(false);
        }
        let checkpoint = self.env.checkpoint;
        let stager = self
            .env
            .stager
            .as_deref_mut()
            .ok_or(BootFault::Configuration(ConfigurationError::MissingStager))?;
        stager.stage(header, slot).map_err(|err| {
            romtime::error!("[mcu-boot] Failed to copy image to RAM: {:?}", err);
            BootFault::Staging(err)
        })?;
        report(checkpoint, SingleLoaderBootStatus::ImageStagedToRam);
        Ok(true)
    }

    fn staged_image(&self, staged: bool) -> ImageSource<'_> {
        match self.env.stager.as_deref() {
            Some(stager) if staged => stager
                .staged()
                .map_or(ImageSource::Slot, ImageSource::Staged),
            _ => ImageSource::Slot,
        }
    }

    fn discard_staged(&mut self, staged: bool, header: &ImageHeader) {
        if !staged {
            return;
        }
        if let Some(stager) = self.env.stager.as_deref_mut() {
            stager.unstage(header);
        }
        self.checkpoint(SingleLoaderBootStatus::ImageRemovedFromRam);
    }

    fn validate(
        &self,
        slot: &FlashPartition,
        image: ImageSource,
        header: &mut ImageHeader,
        storage_fault: &mut Option<FlashDrvError>,
    ) -> FihResult {
        let verifier = self.env.verifier;
        let key = self.params.decryption_key_present;
        match self.params.validation {
            ValidationPolicy::Always => validate_source(verifier, slot, image, header, key),
            ValidationPolicy::Once => {
                validate_once(verifier, slot, image, header, key, storage_fault)
            }
            ValidationPolicy::Disabled => FihResult::SUCCESS,
        }
    }

    fn record(&mut self, header: &ImageHeader, slot: &FlashPartition) -> Result<(), BootFault> {
        let features = self.params.features;
        if !features.intersects(BootFeatures::MEASURED_BOOT | BootFeatures::DATA_SHARING) {
            return Ok(());
        }
        let image_index = self.params.image_index;
        let checkpoint = self.env.checkpoint;
        let recorder = self
            .env
            .recorder
            .as_deref_mut()
            .ok_or(BootFault::Configuration(ConfigurationError::MissingRecorder))?;

        if features.contains(BootFeatures::MEASURED_BOOT) {
            recorder
                .record_measurement(image_index, header, slot)
                .map_err(|err| {
                    romtime::error!(
                        "[mcu-boot] Failed to add image data to shared area: {:?}",
                        err
                    );
                    BootFault::Attestation(err)
                })?;
            report(checkpoint, SingleLoaderBootStatus::MeasurementRecorded);
        }
        if features.contains(BootFeatures::DATA_SHARING) {
            recorder
                .record_shared_data(header, slot, image_index)
                .map_err(|err| {
                    romtime::error!(
                        "[mcu-boot] Failed to add data to shared memory area: {:?}",
                        err
                    );
                    BootFault::Attestation(err)
                })?;
            report(checkpoint, SingleLoaderBootStatus::SharedDataRecorded);
        }
        Ok(())
    }
}

/// Runs the loader and halts through the fatal error handler if there is no
/// bootable image.
pub fn single_loader_start(env: SingleLoaderEnv, params: BootParameters) -> BootResponse {
    romtime::println!("[mcu-boot] Starting single image loader");
    match SingleLoader::new(env, params).and_then(|mut loader| loader.boot()) {
        Ok(rsp) => {
            romtime::println!(
                "[mcu-boot] Booting image from device {} at offset {}",
                rsp.flash_dev_id,
                HexWord(rsp.image_off as u32)
            );
            rsp
        }
        Err(fault) => {
            romtime::error!("[mcu-boot] Unable to find bootable image: {:?}", fault);
            fatal_error(McuError::from(fault).into());
        }
    }
}
