use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::CONFIG_RECORD_SIZE;
use crate::hal::ConfigPersistence;

/// In-memory config slot; clones share the stored record
#[derive(Clone, Default)]
pub struct MemoryConfigPersistence {
    record: Arc<Mutex<Option<[u8; CONFIG_RECORD_SIZE]>>>,
}

impl MemoryConfigPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: [u8; CONFIG_RECORD_SIZE]) -> Self {
        let persistence = Self::new();
        *persistence.lock() = Some(record);
        persistence
    }

    pub fn stored(&self) -> Option<[u8; CONFIG_RECORD_SIZE]> {
        *self.lock()
    }

    /// Overwrites the slot with garbage
    pub fn corrupt(&self) {
        *self.lock() = Some([0xFF; CONFIG_RECORD_SIZE]);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<[u8; CONFIG_RECORD_SIZE]>> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigPersistence for MemoryConfigPersistence {
    fn load(&mut self) -> Result<Option<[u8; CONFIG_RECORD_SIZE]>> {
        Ok(*self.lock())
    }

    fn save(&mut self, record: &[u8; CONFIG_RECORD_SIZE]) -> Result<()> {
        *self.lock() = Some(*record);
        Ok(())
    }
}
