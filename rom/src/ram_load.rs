// Licensed under the Apache-2.0 license

//! Copying an image from its slot into executable RAM before it is validated.

use core::ops::Range;

use flash_image::{ImageFlags, ImageHeader};

use crate::flash::{FlashDrvError, FlashPartition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagingError {
    /// Load address is outside the RAM window.
    InvalidLoadAddress,
    ImageTooLarge,
    Flash(FlashDrvError),
}

pub trait RamStager {
    /// Copies the image into RAM. On error nothing may be left resident.
    fn stage(&mut self, header: &ImageHeader, slot: &FlashPartition) -> Result<(), StagingError>;

    /// Discards a staged copy. A no-op if nothing is staged.
    fn unstage(&mut self, header: &ImageHeader);

    /// The copy that will run, header first, or `None` if the image runs in
    /// place.
    fn staged(&self) -> Option<&[u8]>;
}

/// Stages images flagged `RAM_LOAD` into a fixed RAM window starting at
/// `base_addr`. Other images run in place and are not copied.
pub struct SramStager<'a> {
    sram: &'a mut [u8],
    base_addr: u32,
    staged: Option<Range<usize>>,
}

impl<'a> SramStager<'a> {
    pub fn new(sram: &'a mut [u8], base_addr: u32) -> Self {
        Self {
            sram,
            base_addr,
            staged: None,
        }
    }

    fn window(&self, header: &ImageHeader) -> Result<Range<usize>, StagingError> {
        let size = header.tlv_offset().ok_or(StagingError::ImageTooLarge)? as usize;
        let start = header
            .load_addr
            .checked_sub(self.base_addr)
            .ok_or(StagingError::InvalidLoadAddress)? as usize;
        if start >= self.sram.len() {
            return Err(StagingError::InvalidLoadAddress);
        }
        match start.checked_add(size) {
            Some(end) if end <= self.sram.len() => Ok(start..end),
            _ => Err(StagingError::ImageTooLarge),
        }
    }
}

impl RamStager for SramStager<'_> {
    fn stage(&mut self, header: &ImageHeader, slot: &FlashPartition) -> Result<(), StagingError> {
        // A new image replaces whatever was staged before.
        self.unstage(header);
        if !header.flags().contains(ImageFlags::RAM_LOAD) {
            romtime::debug!("[mcu-boot] image executes in place");
            return Ok(());
        }
        let range = self.window(header)?;
        romtime::debug!(
            "[mcu-boot] copying image to RAM at {:#x}, {} bytes",
            header.load_addr,
            range.len()
        );
        if let Err(err) = slot.read(0, &mut self.sram[range.clone()]) {
            self.sram[range].fill(0);
            return Err(StagingError::Flash(err));
        }
        self.staged = Some(range);
        Ok(())
    }

    fn unstage(&mut self, _header: &ImageHeader) {
        if let Some(range) = self.staged.take() {
            romtime::debug!("[mcu-boot] removing image from RAM");
            self.sram[range].fill(0);
        }
    }

    fn staged(&self) -> Option<&[u8]> {
        self.staged.clone().map(|range| &self.sram[range])
    }
}
