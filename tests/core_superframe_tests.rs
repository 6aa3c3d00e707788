use nextwheel::config::ConfigData;
use nextwheel::core::{DataFrame, FrameError, Packet, Payload, Superframe, HEADER_SIZE, MAX_SUBFRAMES};

fn encoder_frames(count: usize) -> Vec<DataFrame> {
    (0..count)
        .map(|i| DataFrame::new(i as u64, Payload::QuadEncoder(i as i64)))
        .collect()
}

#[test]
fn test_superframe_header_counts_frames() {
    let frames = encoder_frames(3);
    let mut out = Vec::new();

    let len = Superframe::encode_into(1_000, &frames, &mut out).unwrap();

    assert_eq!(len, HEADER_SIZE + 3 * 18);
    assert_eq!(out[0], 255);
    assert_eq!(&out[1..9], &1_000u64.to_le_bytes());
    assert_eq!(out[9], 3);
    assert_eq!(&out[HEADER_SIZE..HEADER_SIZE + 18], frames[0].to_bytes().as_slice());
}

#[test]
fn test_superframe_keeps_order() {
    let superframe = Superframe {
        timestamp: 9,
        frames: encoder_frames(10),
    };
    let bytes = superframe.to_bytes().unwrap();

    let (decoded, used) = Superframe::decode(&bytes).unwrap();

    assert_eq!(used, bytes.len());
    assert_eq!(decoded, superframe);
}

#[test]
fn test_superframe_limit_is_one_count_byte() {
    let mut out = Vec::new();
    assert!(Superframe::encode_into(0, &encoder_frames(MAX_SUBFRAMES), &mut out).is_ok());

    let mut out = Vec::new();
    assert_eq!(
        Superframe::encode_into(0, &encoder_frames(256), &mut out),
        Err(FrameError::TooManyFrames { count: 256, max: 255 })
    );
    assert!(out.is_empty());
}

#[test]
fn test_superframe_missing_frames_detected() {
    let mut bytes = Superframe {
        timestamp: 0,
        frames: encoder_frames(4),
    }
    .to_bytes()
    .unwrap();
    bytes[9] = 6;

    assert_eq!(
        Superframe::decode(&bytes),
        Err(FrameError::CountMismatch { declared: 6, found: 4 })
    );
}

#[test]
fn test_packet_distinguishes_plain_frames() {
    let config = DataFrame::config(5, ConfigData::default());
    let (packet, _) = Packet::decode(&config.to_bytes()).unwrap();
    assert_eq!(packet, Packet::Frame(config.clone()));
    assert_eq!(packet.frames(), &[config]);

    let bytes = Superframe {
        timestamp: 1,
        frames: encoder_frames(2),
    }
    .to_bytes()
    .unwrap();
    let (packet, used) = Packet::decode(&bytes).unwrap();
    assert!(matches!(packet, Packet::Superframe(_)));
    assert_eq!(packet.frames().len(), 2);
    assert_eq!(used, bytes.len());
}
