use nextwheel::config::{
    ConfigData, ACCEL_RANGES, ADC_SAMPLE_RATES, GYRO_RANGES, IMU_SAMPLE_RATES, MAG_RANGES,
};
use nextwheel::core::{
    AdcSample, DataFrame, FrameError, FrameReader, FrameType, ImuSample, Payload, PowerFlags,
    PowerSample, HEADER_SIZE,
};

fn imu_frame(timestamp: u64) -> DataFrame {
    DataFrame::new(
        timestamp,
        Payload::Imu(ImuSample {
            accel: [0.1, 0.2, 9.81],
            gyro: [1.0, -1.0, 0.5],
            mag: [20.0, -5.0, 40.0],
        }),
    )
}

#[test]
fn test_frame_sizes_per_type() {
    assert_eq!(imu_frame(0).total_size(), 46);
    assert_eq!(DataFrame::new(0, Payload::Adc(AdcSample::default())).total_size(), 42);
    assert_eq!(DataFrame::new(0, Payload::QuadEncoder(3)).total_size(), 18);
    assert_eq!(DataFrame::config(0, ConfigData::default()).total_size(), 30);
    assert_eq!(
        DataFrame::new(0, Payload::Power(PowerSample::default())).total_size(),
        23
    );
}

#[test]
fn test_serialize_writes_header_then_payload() {
    let frame = imu_frame(1_700_000_000_000_000);
    let mut buffer = [0u8; 64];

    let written = frame.serialize(&mut buffer).unwrap();

    assert_eq!(written, 46);
    assert_eq!(buffer[0], FrameType::Imu.code());
    assert_eq!(&buffer[1..9], &1_700_000_000_000_000u64.to_le_bytes());
    assert_eq!(buffer[9], 36);
    assert_eq!(&buffer[HEADER_SIZE..HEADER_SIZE + 4], &0.1f32.to_le_bytes());
    assert_eq!(&buffer[42..46], &40.0f32.to_le_bytes());
}

#[test]
fn test_serialize_rejects_small_buffer() {
    let frame = imu_frame(1);
    let mut buffer = [0u8; 20];

    assert_eq!(
        frame.serialize(&mut buffer),
        Err(FrameError::BufferTooSmall {
            needed: 46,
            available: 20
        })
    );
}

#[test]
fn test_power_payload_layout() {
    let frame = DataFrame::new(
        7,
        Payload::Power(PowerSample {
            voltage: 12.5,
            current: 0.75,
            power: 9.375,
            flags: PowerFlags::new(true, true),
        }),
    );
    let bytes = frame.to_bytes();

    assert_eq!(bytes.len(), 23);
    assert_eq!(&bytes[10..14], &12.5f32.to_le_bytes());
    assert_eq!(bytes[22], PowerFlags::LOW_POWER | PowerFlags::SENSORS_ENABLED);
}

#[test]
fn test_clone_is_independent() {
    let original = imu_frame(100);
    let mut copy = original.clone();
    copy.set_timestamp(200);
    if let Payload::Imu(sample) = &mut copy.payload {
        sample.accel[0] = 5.0;
    }

    assert_eq!(original.timestamp, 100);
    assert_eq!(original, imu_frame(100));
}

#[test]
fn test_decode_reads_back_frame() {
    let frame = DataFrame::new(42, Payload::QuadEncoder(-12));
    let (decoded, used) = DataFrame::decode(&frame.to_bytes()).unwrap();

    assert_eq!(decoded, frame);
    assert_eq!(used, 18);
}

#[test]
fn test_decode_rejects_reserved_and_unknown_codes() {
    let mut bytes = DataFrame::new(1, Payload::QuadEncoder(1)).to_bytes();

    bytes[0] = 5;
    assert_eq!(
        DataFrame::decode(&bytes),
        Err(FrameError::UnsupportedType(FrameType::Rtc))
    );

    bytes[0] = 99;
    assert_eq!(DataFrame::decode(&bytes), Err(FrameError::UnknownType(99)));
}

#[test]
fn test_decode_rejects_wrong_size_byte() {
    let mut bytes = imu_frame(1).to_bytes();
    bytes[9] = 32;

    assert!(matches!(
        DataFrame::decode(&bytes),
        Err(FrameError::SizeMismatch {
            frame_type: FrameType::Imu,
            expected: 36,
            found: 32
        })
    ));
}

#[test]
fn test_frame_reader_walks_recording() {
    let mut recording = Vec::new();
    DataFrame::config(1, ConfigData::default()).write_to(&mut recording);
    imu_frame(2).write_to(&mut recording);
    DataFrame::new(3, Payload::QuadEncoder(8)).write_to(&mut recording);

    let frames: Vec<DataFrame> = FrameReader::new(&recording)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].payload, Payload::Config(ConfigData::default()));
    assert_eq!(frames[1], imu_frame(2));
    assert_eq!(frames[2].timestamp, 3);
}

#[test]
fn test_frame_reader_reports_truncated_tail() {
    let mut recording = imu_frame(1).to_bytes();
    recording.extend_from_slice(&imu_frame(2).to_bytes()[..30]);

    let results: Vec<_> = FrameReader::new(&recording).collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(FrameError::Truncated { .. })));
}

fn config_from(pick: fn(&[u32]) -> u32) -> ConfigData {
    ConfigData {
        accel_range: pick(ACCEL_RANGES),
        gyro_range: pick(GYRO_RANGES),
        mag_range: pick(MAG_RANGES),
        imu_sample_rate: pick(IMU_SAMPLE_RATES),
        adc_sample_rate: pick(ADC_SAMPLE_RATES),
    }
}

fn smallest(list: &[u32]) -> u32 {
    list[0]
}

fn largest(list: &[u32]) -> u32 {
    list[list.len() - 1]
}

fn boundary_frames() -> Vec<DataFrame> {
    vec![
        DataFrame::config(0, config_from(smallest)),
        DataFrame::config(u64::MAX, config_from(largest)),
        DataFrame::new(
            1,
            Payload::Adc(AdcSample {
                channels: [0.0, -0.0, 3.3, -3.3, f32::MAX, f32::MIN, f32::EPSILON, 1.5],
            }),
        ),
        imu_frame(u64::MAX),
        DataFrame::new(
            2,
            Payload::Power(PowerSample {
                voltage: 0.0,
                current: -1.25,
                power: f32::MAX,
                flags: PowerFlags(0),
            }),
        ),
        DataFrame::new(
            3,
            Payload::Power(PowerSample {
                voltage: 14.4,
                current: 2.0,
                power: 28.8,
                flags: PowerFlags(0xFF),
            }),
        ),
        DataFrame::new(4, Payload::QuadEncoder(0)),
        DataFrame::new(5, Payload::QuadEncoder(i64::MIN)),
        DataFrame::new(6, Payload::QuadEncoder(i64::MAX)),
    ]
}

#[test]
fn test_every_payload_decodes_to_itself() {
    for frame in boundary_frames() {
        let bytes = frame.to_bytes();
        let (decoded, used) = DataFrame::decode(&bytes).unwrap();

        assert_eq!(decoded, frame, "{:?}", frame.frame_type());
        assert_eq!(used, frame.total_size());
        assert_eq!(bytes.len(), frame.total_size());
    }
}

#[test]
fn test_serialize_needs_exactly_total_size() {
    for frame in boundary_frames() {
        let size = frame.total_size();
        assert_eq!(size, HEADER_SIZE + frame.data_size());

        let mut exact = vec![0u8; size];
        assert_eq!(frame.serialize(&mut exact), Ok(size), "{:?}", frame.frame_type());
        assert_eq!(exact, frame.to_bytes());

        let mut short = vec![0u8; size - 1];
        assert_eq!(
            frame.serialize(&mut short),
            Err(FrameError::BufferTooSmall {
                needed: size,
                available: size - 1
            }),
            "{:?}",
            frame.frame_type()
        );
    }
}
