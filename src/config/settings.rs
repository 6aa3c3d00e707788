use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Runtime settings of the host build. Every field has a default, so a
/// settings file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory receiving recording files
    pub data_dir: PathBuf,
    /// File holding the persisted sampling configuration record
    pub config_path: PathBuf,
    /// Listen address of the binary frame stream
    pub data_addr: String,
    /// Listen address of the `param=value` control channel
    pub control_addr: String,
    pub storage_queue_capacity: usize,
    pub network_queue_capacity: usize,
    pub storage_period_ms: u64,
    /// Upper bound of bytes written per storage iteration
    pub storage_batch_bytes: usize,
    pub network_period_ms: u64,
    pub power_period_ms: u64,
    pub encoder_rate_hz: u32,
    /// Seconds between two diagnostics reports, 0 disables them
    pub report_interval_s: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_path: PathBuf::from("data/config.bin"),
            data_addr: "0.0.0.0:8081".to_string(),
            control_addr: "0.0.0.0:8080".to_string(),
            storage_queue_capacity: 100,
            network_queue_capacity: 100,
            storage_period_ms: 10,
            storage_batch_bytes: 4096,
            network_period_ms: 50,
            power_period_ms: 1000,
            encoder_rate_hz: 10,
            report_interval_s: 30,
        }
    }
}

impl AppSettings {
    pub fn from_json(value: Value) -> Result<Self> {
        let settings: Self = serde_json::from_value(value).context("Invalid settings")?;
        Ok(settings.clamped())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings in {:?}", path))?;
        Ok(settings.clamped())
    }

    /// Raises zero queue capacities, periods and rates to 1. A zero-capacity
    /// queue would drop every frame and a zero period would spin.
    pub fn clamped(mut self) -> Self {
        fn at_least_one<T: PartialEq + From<u8>>(name: &str, value: &mut T) {
            if *value == T::from(0) {
                warn!("Setting {} is 0, using 1", name);
                *value = T::from(1);
            }
        }

        at_least_one("storage_queue_capacity", &mut self.storage_queue_capacity);
        at_least_one("network_queue_capacity", &mut self.network_queue_capacity);
        at_least_one("storage_period_ms", &mut self.storage_period_ms);
        at_least_one("network_period_ms", &mut self.network_period_ms);
        at_least_one("power_period_ms", &mut self.power_period_ms);
        at_least_one("encoder_rate_hz", &mut self.encoder_rate_hz);
        self
    }
}
