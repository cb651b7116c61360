// Licensed under the Apache-2.0 license

pub mod flash_map;
pub mod flash_partition;
pub mod hil;

pub use flash_map::{FlashAreaDescriptor, FlashAreaMap, StaticFlashMap, FLASH_AREA_IMAGE_PRIMARY};
pub use flash_partition::FlashPartition;
pub use hil::{FlashDrvError, FlashStorage};
