pub mod global;
pub mod settings;

pub use global::{
    ConfigData, ConfigError, ConfigField, GlobalConfig, ACCEL_RANGES, ADC_SAMPLE_RATES,
    CONFIG_RECORD_SIZE, GYRO_RANGES, IMU_SAMPLE_RATES, MAG_RANGES,
};
pub use settings::AppSettings;
