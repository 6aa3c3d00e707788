use anyhow::{bail, Result};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::ConfigData;
use crate::core::{AdcSample, FrameType, ImuSample, Payload, PowerFlags, PowerSample, ADC_CHANNELS};
use crate::hal::SensorDriver;

/// Last configuration applied to a simulated chip, readable from tests
pub type ConfigProbe = Arc<Mutex<Option<ConfigData>>>;

fn record(probe: &ConfigProbe, config: &ConfigData) {
    *probe.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(*config);
}

/// 9-axis IMU producing slow sine motion scaled to the configured ranges
pub struct SimulatedImu {
    present: bool,
    phase: f32,
    accel_range: f32,
    gyro_range: f32,
    probe: ConfigProbe,
}

impl SimulatedImu {
    pub fn new() -> Self {
        Self {
            present: true,
            phase: 0.0,
            accel_range: 2.0,
            gyro_range: 250.0,
            probe: Arc::new(Mutex::new(None)),
        }
    }

    /// A chip that does not answer on the bus
    pub fn missing() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn config_probe(&self) -> ConfigProbe {
        self.probe.clone()
    }

    fn apply(&mut self, config: &ConfigData) {
        self.accel_range = config.accel_range as f32;
        self.gyro_range = config.gyro_range as f32;
        record(&self.probe, config);
    }
}

impl Default for SimulatedImu {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for SimulatedImu {
    fn name(&self) -> &str {
        "IMU"
    }

    fn frame_type(&self) -> FrameType {
        FrameType::Imu
    }

    fn begin(&mut self, config: &ConfigData) -> Result<()> {
        if !self.present {
            bail!("IMU not detected");
        }
        self.apply(config);
        Ok(())
    }

    fn update(&mut self) -> Result<Payload> {
        self.phase = (self.phase + 0.05) % (2.0 * PI);
        let s = self.phase.sin();
        let c = self.phase.cos();
        Ok(Payload::Imu(ImuSample {
            accel: [0.1 * s * self.accel_range, 0.1 * c * self.accel_range, 1.0],
            gyro: [0.05 * s * self.gyro_range, 0.0, 0.05 * c * self.gyro_range],
            mag: [20.0 * c, 20.0 * s, -40.0],
        }))
    }

    fn reconfigure(&mut self, config: &ConfigData) -> Result<()> {
        self.begin(config)
    }
}

/// 8-channel ADC; channel n reads a ramp offset by n volts
pub struct SimulatedAdc {
    present: bool,
    step: u32,
    probe: ConfigProbe,
}

impl SimulatedAdc {
    pub fn new() -> Self {
        Self {
            present: true,
            step: 0,
            probe: Arc::new(Mutex::new(None)),
        }
    }

    pub fn missing() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn config_probe(&self) -> ConfigProbe {
        self.probe.clone()
    }
}

impl Default for SimulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for SimulatedAdc {
    fn name(&self) -> &str {
        "ADC"
    }

    fn frame_type(&self) -> FrameType {
        FrameType::Adc
    }

    fn begin(&mut self, config: &ConfigData) -> Result<()> {
        if !self.present {
            bail!("ADC not detected");
        }
        record(&self.probe, config);
        Ok(())
    }

    fn update(&mut self) -> Result<Payload> {
        self.step = (self.step + 1) % 1000;
        let ramp = self.step as f32 / 1000.0;
        let mut channels = [0.0f32; ADC_CHANNELS];
        for (n, channel) in channels.iter_mut().enumerate() {
            *channel = n as f32 + ramp;
        }
        Ok(Payload::Adc(AdcSample { channels }))
    }

    fn reconfigure(&mut self, config: &ConfigData) -> Result<()> {
        record(&self.probe, config);
        Ok(())
    }
}

/// Battery monitor whose low-power input can be toggled from outside
pub struct SimulatedPower {
    voltage: f32,
    current: f32,
    low_power: Arc<AtomicBool>,
}

impl SimulatedPower {
    pub fn new(voltage: f32, current: f32) -> Self {
        Self {
            voltage,
            current,
            low_power: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drives the low-power status pin
    pub fn low_power_switch(&self) -> Arc<AtomicBool> {
        self.low_power.clone()
    }
}

impl Default for SimulatedPower {
    fn default() -> Self {
        Self::new(12.0, 0.5)
    }
}

impl SensorDriver for SimulatedPower {
    fn name(&self) -> &str {
        "Power"
    }

    fn frame_type(&self) -> FrameType {
        FrameType::Power
    }

    fn begin(&mut self, _config: &ConfigData) -> Result<()> {
        Ok(())
    }

    fn update(&mut self) -> Result<Payload> {
        let low_power = self.low_power.load(Ordering::Acquire);
        Ok(Payload::Power(PowerSample {
            voltage: self.voltage,
            current: self.current,
            power: self.voltage * self.current,
            flags: PowerFlags::new(low_power, true),
        }))
    }
}

/// Quadrature counter turning at a constant speed
pub struct SimulatedEncoder {
    counts_per_sample: i64,
}

impl SimulatedEncoder {
    pub fn new(counts_per_sample: i64) -> Self {
        Self { counts_per_sample }
    }
}

impl Default for SimulatedEncoder {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SensorDriver for SimulatedEncoder {
    fn name(&self) -> &str {
        "QuadEncoder"
    }

    fn frame_type(&self) -> FrameType {
        FrameType::QuadEncoder
    }

    fn begin(&mut self, _config: &ConfigData) -> Result<()> {
        Ok(())
    }

    /// Count delta since the previous read
    fn update(&mut self) -> Result<Payload> {
        Ok(Payload::QuadEncoder(self.counts_per_sample))
    }
}
