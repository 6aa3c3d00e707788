use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::hal::ConfigPersistence;

/// Size of the persisted record and of a CONFIG frame payload
pub const CONFIG_RECORD_SIZE: usize = 20;

/// Accelerometer full scale, in g
pub const ACCEL_RANGES: &[u32] = &[2, 4, 8, 16];
/// Gyroscope full scale, in deg/s
pub const GYRO_RANGES: &[u32] = &[250, 500, 1000, 2000];
/// Magnetometer full scale, in uT
pub const MAG_RANGES: &[u32] = &[2500];
/// Hz
pub const IMU_SAMPLE_RATES: &[u32] = &[10, 50, 100, 200];
/// Hz
pub const ADC_SAMPLE_RATES: &[u32] = &[10, 50, 100, 200, 400, 800, 1000];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    AccelRange,
    GyroRange,
    MagRange,
    ImuSampleRate,
    AdcSampleRate,
}

impl ConfigField {
    pub const ALL: [ConfigField; 5] = [
        ConfigField::AccelRange,
        ConfigField::GyroRange,
        ConfigField::MagRange,
        ConfigField::ImuSampleRate,
        ConfigField::AdcSampleRate,
    ];

    pub fn allowed(self) -> &'static [u32] {
        match self {
            Self::AccelRange => ACCEL_RANGES,
            Self::GyroRange => GYRO_RANGES,
            Self::MagRange => MAG_RANGES,
            Self::ImuSampleRate => IMU_SAMPLE_RATES,
            Self::AdcSampleRate => ADC_SAMPLE_RATES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AccelRange => "accel_range",
            Self::GyroRange => "gyro_range",
            Self::MagRange => "mag_range",
            Self::ImuSampleRate => "imu_sample_rate",
            Self::AdcSampleRate => "adc_sample_rate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{value} is not an allowed {field} (allowed: {allowed:?})")]
    InvalidValue {
        field: &'static str,
        value: u32,
        allowed: &'static [u32],
    },
}

/// Sampling parameters shared by every task and written at the head of
/// every recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    pub accel_range: u32,
    pub gyro_range: u32,
    pub mag_range: u32,
    pub imu_sample_rate: u32,
    pub adc_sample_rate: u32,
}

impl Default for ConfigData {
    /// First allowed value of every field
    fn default() -> Self {
        Self {
            accel_range: ACCEL_RANGES[0],
            gyro_range: GYRO_RANGES[0],
            mag_range: MAG_RANGES[0],
            imu_sample_rate: IMU_SAMPLE_RATES[0],
            adc_sample_rate: ADC_SAMPLE_RATES[0],
        }
    }
}

impl ConfigData {
    pub fn get(&self, field: ConfigField) -> u32 {
        match field {
            ConfigField::AccelRange => self.accel_range,
            ConfigField::GyroRange => self.gyro_range,
            ConfigField::MagRange => self.mag_range,
            ConfigField::ImuSampleRate => self.imu_sample_rate,
            ConfigField::AdcSampleRate => self.adc_sample_rate,
        }
    }

    fn set(&mut self, field: ConfigField, value: u32) {
        match field {
            ConfigField::AccelRange => self.accel_range = value,
            ConfigField::GyroRange => self.gyro_range = value,
            ConfigField::MagRange => self.mag_range = value,
            ConfigField::ImuSampleRate => self.imu_sample_rate = value,
            ConfigField::AdcSampleRate => self.adc_sample_rate = value,
        }
    }

    /// Every field must be in its allow-list.
    pub fn validate(&self) -> bool {
        self.first_invalid().is_none()
    }

    fn first_invalid(&self) -> Option<ConfigError> {
        ConfigField::ALL.into_iter().find_map(|field| {
            let value = self.get(field);
            (!field.allowed().contains(&value)).then_some(ConfigError::InvalidValue {
                field: field.name(),
                value,
                allowed: field.allowed(),
            })
        })
    }

    pub fn to_bytes(&self) -> [u8; CONFIG_RECORD_SIZE] {
        let mut out = [0u8; CONFIG_RECORD_SIZE];
        for (chunk, field) in out.chunks_exact_mut(4).zip(ConfigField::ALL) {
            chunk.copy_from_slice(&self.get(field).to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; CONFIG_RECORD_SIZE]) -> Self {
        let mut data = Self::default();
        for (chunk, field) in bytes.chunks_exact(4).zip(ConfigField::ALL) {
            data.set(field, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        data
    }
}

struct Inner {
    data: ConfigData,
    persistence: Box<dyn ConfigPersistence>,
}

impl Inner {
    fn save(&mut self) {
        if let Err(e) = self.persistence.save(&self.data.to_bytes()) {
            warn!("GlobalConfig: failed to persist config: {:#}", e);
        }
    }
}

/// Validated, persisted sampling configuration.
///
/// One instance lives for the whole process and is shared by reference.
/// Load and save are serialized by an internal mutex. Notifying tasks
/// after a change is the caller's job.
pub struct GlobalConfig {
    inner: Mutex<Inner>,
}

impl GlobalConfig {
    /// Creates the store holding defaults, without touching persistence.
    pub fn new(persistence: Box<dyn ConfigPersistence>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: ConfigData::default(),
                persistence,
            }),
        }
    }

    /// Creates the store and loads the persisted record.
    pub fn begin(persistence: Box<dyn ConfigPersistence>) -> Self {
        let config = Self::new(persistence);
        let data = config.load();
        info!("GlobalConfig: {:?}", data);
        config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reloads from persistence; an invalid or missing record is replaced
    /// by the defaults, which are persisted.
    pub fn load(&self) -> ConfigData {
        let mut inner = self.lock();
        let loaded = match inner.persistence.load() {
            Ok(Some(record)) => Some(ConfigData::from_bytes(&record)),
            Ok(None) => None,
            Err(e) => {
                warn!("GlobalConfig: failed to read persisted config: {:#}", e);
                None
            }
        };

        match loaded {
            Some(data) if data.validate() => inner.data = data,
            _ => {
                info!("GlobalConfig: setting default config");
                inner.data = ConfigData::default();
                inner.save();
            }
        }
        inner.data
    }

    pub fn get(&self) -> ConfigData {
        self.lock().data
    }

    /// Replaces the whole record; rejected unless every field is valid.
    pub fn set(&self, data: ConfigData) -> Result<(), ConfigError> {
        if let Some(err) = data.first_invalid() {
            return Err(err);
        }
        let mut inner = self.lock();
        inner.data = data;
        inner.save();
        Ok(())
    }

    /// Updates one field and persists immediately.
    pub fn set_field(&self, field: ConfigField, value: u32) -> Result<(), ConfigError> {
        if !field.allowed().contains(&value) {
            return Err(ConfigError::InvalidValue {
                field: field.name(),
                value,
                allowed: field.allowed(),
            });
        }
        let mut inner = self.lock();
        inner.data.set(field, value);
        inner.save();
        Ok(())
    }

    pub fn set_accel_range(&self, range: u32) -> Result<(), ConfigError> {
        self.set_field(ConfigField::AccelRange, range)
    }

    pub fn set_gyro_range(&self, range: u32) -> Result<(), ConfigError> {
        self.set_field(ConfigField::GyroRange, range)
    }

    pub fn set_mag_range(&self, range: u32) -> Result<(), ConfigError> {
        self.set_field(ConfigField::MagRange, range)
    }

    pub fn set_imu_sample_rate(&self, rate: u32) -> Result<(), ConfigError> {
        self.set_field(ConfigField::ImuSampleRate, rate)
    }

    pub fn set_adc_sample_rate(&self, rate: u32) -> Result<(), ConfigError> {
        self.set_field(ConfigField::AdcSampleRate, rate)
    }
}
