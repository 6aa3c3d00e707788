use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::traits::{LogFile, LogStorage};

const WRITE_BUFFER_SIZE: usize = 16 * 1024;

/// Recordings stored as files in one directory
pub struct FileLogStorage {
    dir: PathBuf,
}

impl FileLogStorage {
    /// Creates the directory if it doesn't exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Recording files in the directory, oldest name first
    pub fn list_logs(&self) -> Result<Vec<PathBuf>> {
        let mut logs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("dat") {
                logs.push(path);
            }
        }
        logs.sort();
        Ok(logs)
    }

    fn create(&self, name: &str) -> Result<(String, File)> {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
            None => (name.to_string(), String::new()),
        };

        let mut candidate = name.to_string();
        let mut suffix = 1;
        loop {
            let path = self.dir.join(&candidate);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((candidate, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!("{:?} exists, trying next name", path);
                    candidate = format!("{}_{}{}", stem, suffix, ext);
                    suffix += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to create log file {:?}", path))
                }
            }
        }
    }
}

impl LogStorage for FileLogStorage {
    fn open_new_log_file(&mut self, name: &str) -> Result<Box<dyn LogFile>> {
        let (name, file) = self.create(name)?;
        info!("Created log file {}", name);
        Ok(Box::new(FileLog {
            name,
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        }))
    }
}

struct FileLog {
    name: String,
    writer: BufWriter<File>,
}

impl LogFile for FileLog {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write to {}", self.name))?;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.name))
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.flush()?;
        self.writer
            .get_ref()
            .sync_all()
            .with_context(|| format!("Failed to sync {}", self.name))
    }
}
