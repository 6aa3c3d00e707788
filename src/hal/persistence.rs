use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::traits::ConfigPersistence;
use crate::config::CONFIG_RECORD_SIZE;

/// Stores the raw configuration record in a small file
pub struct FileConfigPersistence {
    path: PathBuf,
}

impl FileConfigPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPersistence for FileConfigPersistence {
    fn load(&mut self) -> Result<Option<[u8; CONFIG_RECORD_SIZE]>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read config from {:?}", self.path))
            }
        };
        // A record of the wrong length is treated like a missing one
        Ok(<[u8; CONFIG_RECORD_SIZE]>::try_from(bytes.as_slice()).ok())
    }

    fn save(&mut self, record: &[u8; CONFIG_RECORD_SIZE]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&self.path, record)
            .with_context(|| format!("Failed to write config to {:?}", self.path))
    }
}
