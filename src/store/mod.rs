pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::Result;
pub use disk::DiskStore;
pub use memory::MemoryStore;

/// Opens the disk store at the configured data directory.
pub fn open_store(config: &AppConfig) -> Result<DiskStore> {
    let data_dir = config.data_dir()?;
    DiskStore::open(&data_dir)
}
