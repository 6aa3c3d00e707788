use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::hal::{LogFile, LogStorage};

type Files = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// Log storage kept in memory; clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryLogStorage {
    files: Files,
    fail_open: Arc<AtomicBool>,
}

impl MemoryLogStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following open fail, like a missing card
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Release);
    }

    pub fn file_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogStorage for MemoryLogStorage {
    fn open_new_log_file(&mut self, name: &str) -> Result<Box<dyn LogFile>> {
        if self.fail_open.load(Ordering::Acquire) {
            bail!("storage unavailable");
        }
        let mut files = self.lock();
        let mut candidate = name.to_string();
        let mut suffix = 1;
        while files.contains_key(&candidate) {
            candidate = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        files.insert(candidate.clone(), Vec::new());
        Ok(Box::new(MemoryLogFile {
            name: candidate,
            files: self.files.clone(),
        }))
    }
}

struct MemoryLogFile {
    name: String,
    files: Files,
}

impl LogFile for MemoryLogFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut files = self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match files.get_mut(&self.name) {
            Some(file) => {
                file.extend_from_slice(bytes);
                Ok(bytes.len())
            }
            None => bail!("{} was removed", self.name),
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
