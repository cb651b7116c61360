// Licensed under the Apache-2.0 license

/// Progress checkpoints of the single image loader.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleLoaderBootStatus {
    SingleLoaderStarted = 0x0100,
    FlashAreaOpened = 0x0101,
    ImageHeaderLoaded = 0x0102,
    ImageStagedToRam = 0x0103,
    ValidationStarted = 0x0104,
    ValidationComplete = 0x0105,
    ValidationFailed = 0x0106,
    ImageRemovedFromRam = 0x0107,
    MeasurementRecorded = 0x0108,
    SharedDataRecorded = 0x0109,
    BootResponseReady = 0x010a,
    FlashAreaClosed = 0x010b,
}

impl From<SingleLoaderBootStatus> for u16 {
    fn from(status: SingleLoaderBootStatus) -> u16 {
        status as u16
    }
}

/// Destination for boot checkpoints, e.g. a flow status register.
pub trait FlowCheckpoint {
    fn set_flow_checkpoint(&self, checkpoint: u16);
}
