use serde::{Deserialize, Serialize};
use std::fmt;

use super::codec::FrameError;
use crate::config::{ConfigData, CONFIG_RECORD_SIZE};

/// `[type:1][timestamp:8][dataSize:1]`
pub const HEADER_SIZE: usize = 10;

pub const ADC_CHANNELS: usize = 8;
pub const IMU_AXES: usize = 9;

pub const ADC_PAYLOAD_SIZE: usize = ADC_CHANNELS * 4;
pub const IMU_PAYLOAD_SIZE: usize = IMU_AXES * 4;
pub const POWER_PAYLOAD_SIZE: usize = 3 * 4 + 1;
pub const QUAD_ENCODER_PAYLOAD_SIZE: usize = 8;

/// Largest frame any sensor can produce
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + IMU_PAYLOAD_SIZE;

/// Frame type tag, first byte of every header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameType {
    Unknown = 0,
    Config = 1,
    Adc = 2,
    Imu = 3,
    Power = 4,
    Rtc = 5,
    Audio = 6,
    QuadEncoder = 7,
    Superframe = 255,
}

impl FrameType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Config),
            2 => Some(Self::Adc),
            3 => Some(Self::Imu),
            4 => Some(Self::Power),
            5 => Some(Self::Rtc),
            6 => Some(Self::Audio),
            7 => Some(Self::QuadEncoder),
            255 => Some(Self::Superframe),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Static payload size of the type. `None` for reserved codes and for
    /// superframes, whose size byte carries a frame count instead.
    pub fn payload_size(self) -> Option<usize> {
        match self {
            Self::Config => Some(CONFIG_RECORD_SIZE),
            Self::Adc => Some(ADC_PAYLOAD_SIZE),
            Self::Imu => Some(IMU_PAYLOAD_SIZE),
            Self::Power => Some(POWER_PAYLOAD_SIZE),
            Self::QuadEncoder => Some(QUAD_ENCODER_PAYLOAD_SIZE),
            Self::Unknown | Self::Rtc | Self::Audio | Self::Superframe => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Config => "CONFIG",
            Self::Adc => "ADC",
            Self::Imu => "IMU",
            Self::Power => "POWER",
            Self::Rtc => "RTC",
            Self::Audio => "AUDIO",
            Self::QuadEncoder => "QUAD_ENCODER",
            Self::Superframe => "SUPERFRAME",
        }
    }
}

/// One reading of every ADC channel, in volts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdcSample {
    pub channels: [f32; ADC_CHANNELS],
}

/// 9-axis IMU reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub mag: [f32; 3],
}

/// Power monitor status bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerFlags(pub u8);

impl PowerFlags {
    pub const LOW_POWER: u8 = 0x01;
    pub const SENSORS_ENABLED: u8 = 0x02;

    pub fn new(low_power: bool, sensors_enabled: bool) -> Self {
        let mut bits = 0;
        if low_power {
            bits |= Self::LOW_POWER;
        }
        if sensors_enabled {
            bits |= Self::SENSORS_ENABLED;
        }
        Self(bits)
    }

    pub fn low_power(self) -> bool {
        self.0 & Self::LOW_POWER != 0
    }

    pub fn sensors_enabled(self) -> bool {
        self.0 & Self::SENSORS_ENABLED != 0
    }
}

/// Volts, amperes and watts as reported by the power monitor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerSample {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
    pub flags: PowerFlags,
}

/// Type-specific content of a frame. Every variant has a fixed wire size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Config(ConfigData),
    Adc(AdcSample),
    Imu(ImuSample),
    Power(PowerSample),
    /// Encoder counts accumulated since the previous sample
    QuadEncoder(i64),
}

impl Payload {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Config(_) => FrameType::Config,
            Self::Adc(_) => FrameType::Adc,
            Self::Imu(_) => FrameType::Imu,
            Self::Power(_) => FrameType::Power,
            Self::QuadEncoder(_) => FrameType::QuadEncoder,
        }
    }

    pub fn data_size(&self) -> usize {
        match self {
            Self::Config(_) => CONFIG_RECORD_SIZE,
            Self::Adc(_) => ADC_PAYLOAD_SIZE,
            Self::Imu(_) => IMU_PAYLOAD_SIZE,
            Self::Power(_) => POWER_PAYLOAD_SIZE,
            Self::QuadEncoder(_) => QUAD_ENCODER_PAYLOAD_SIZE,
        }
    }

    /// Writes exactly `data_size()` bytes; `out` must be that long.
    fn write(&self, out: &mut [u8]) {
        match self {
            Self::Config(data) => out.copy_from_slice(&data.to_bytes()),
            Self::Adc(sample) => put_f32s(out, &sample.channels),
            Self::Imu(sample) => {
                put_f32s(&mut out[0..12], &sample.accel);
                put_f32s(&mut out[12..24], &sample.gyro);
                put_f32s(&mut out[24..36], &sample.mag);
            }
            Self::Power(sample) => {
                put_f32s(&mut out[0..12], &[sample.voltage, sample.current, sample.power]);
                out[12] = sample.flags.0;
            }
            Self::QuadEncoder(count) => out.copy_from_slice(&count.to_le_bytes()),
        }
    }

    /// Reads a payload of `frame_type` from exactly its static size in bytes.
    pub(crate) fn read(frame_type: FrameType, bytes: &[u8]) -> Result<Self, FrameError> {
        let payload = match frame_type {
            FrameType::Config => {
                let mut record = [0u8; CONFIG_RECORD_SIZE];
                record.copy_from_slice(bytes);
                Self::Config(ConfigData::from_bytes(&record))
            }
            FrameType::Adc => {
                let mut channels = [0.0; ADC_CHANNELS];
                get_f32s(bytes, &mut channels);
                Self::Adc(AdcSample { channels })
            }
            FrameType::Imu => {
                let mut sample = ImuSample::default();
                get_f32s(&bytes[0..12], &mut sample.accel);
                get_f32s(&bytes[12..24], &mut sample.gyro);
                get_f32s(&bytes[24..36], &mut sample.mag);
                Self::Imu(sample)
            }
            FrameType::Power => {
                let mut values = [0.0; 3];
                get_f32s(&bytes[0..12], &mut values);
                Self::Power(PowerSample {
                    voltage: values[0],
                    current: values[1],
                    power: values[2],
                    flags: PowerFlags(bytes[12]),
                })
            }
            FrameType::QuadEncoder => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Self::QuadEncoder(i64::from_le_bytes(raw))
            }
            other => return Err(FrameError::UnsupportedType(other)),
        };
        Ok(payload)
    }
}

fn put_f32s(out: &mut [u8], values: &[f32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn get_f32s(bytes: &[u8], values: &mut [f32]) {
    for (chunk, value) in bytes.chunks_exact(4).zip(values.iter_mut()) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

pub(crate) fn write_header(out: &mut [u8], type_code: u8, timestamp: u64, size: u8) {
    out[0] = type_code;
    out[1..9].copy_from_slice(&timestamp.to_le_bytes());
    out[9] = size;
}

/// Typed, self-describing record passed from sensor tasks to workers.
///
/// Frames move by value through the queues: each consumer receives its own
/// clone and the frame is released when the consumer drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    /// Microseconds since the Unix epoch
    pub timestamp: u64,
    pub payload: Payload,
}

impl DataFrame {
    pub fn new(timestamp: u64, payload: Payload) -> Self {
        Self { timestamp, payload }
    }

    pub fn config(timestamp: u64, data: ConfigData) -> Self {
        Self::new(timestamp, Payload::Config(data))
    }

    pub fn frame_type(&self) -> FrameType {
        self.payload.frame_type()
    }

    pub fn data_size(&self) -> usize {
        self.payload.data_size()
    }

    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.data_size()
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Writes header and payload to the front of `buffer`.
    ///
    /// Returns the number of bytes written, always `total_size()`.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let total = self.total_size();
        if buffer.len() < total {
            return Err(FrameError::BufferTooSmall {
                needed: total,
                available: buffer.len(),
            });
        }
        write_header(
            &mut buffer[..HEADER_SIZE],
            self.frame_type().code(),
            self.timestamp,
            self.data_size() as u8,
        );
        self.payload.write(&mut buffer[HEADER_SIZE..total]);
        Ok(total)
    }

    /// Appends the serialized frame to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        let total = self.total_size();
        out.resize(start + total, 0);
        write_header(
            &mut out[start..start + HEADER_SIZE],
            self.frame_type().code(),
            self.timestamp,
            self.data_size() as u8,
        );
        self.payload.write(&mut out[start + HEADER_SIZE..start + total]);
        total
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_size());
        self.write_to(&mut out);
        out
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} @{}us] ", self.frame_type().name(), self.timestamp)?;
        match &self.payload {
            Payload::Config(data) => write!(
                f,
                "accel={} gyro={} mag={} imu_rate={} adc_rate={}",
                data.accel_range,
                data.gyro_range,
                data.mag_range,
                data.imu_sample_rate,
                data.adc_sample_rate
            ),
            Payload::Adc(sample) => write!(f, "{:?}", sample.channels),
            Payload::Imu(sample) => write!(
                f,
                "accel={:?} gyro={:?} mag={:?}",
                sample.accel, sample.gyro, sample.mag
            ),
            Payload::Power(sample) => write!(
                f,
                "{:.3}V {:.3}A {:.3}W flags={:#04x}",
                sample.voltage, sample.current, sample.power, sample.flags.0
            ),
            Payload::QuadEncoder(count) => write!(f, "count={}", count),
        }
    }
}
