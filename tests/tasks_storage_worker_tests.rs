use nextwheel::config::{ConfigData, GlobalConfig};
use nextwheel::core::{DataFrame, FrameReader, FrameType, ImuSample, Payload};
use nextwheel::engine::{BaseCommand, FanOut, FrameQueue, Runnable};
use nextwheel::hal::mock::{MemoryConfigPersistence, MemoryLogStorage};
use nextwheel::observability::TaskMetrics;
use nextwheel::tasks::{Shared, StorageCommand, StorageWorker};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    worker: StorageWorker,
    storage: MemoryLogStorage,
    imu: FanOut,
    shared: Shared,
}

fn fixture(batch_bytes: usize) -> Fixture {
    let storage = MemoryLogStorage::new();
    let shared = Shared::new(Arc::new(GlobalConfig::begin(Box::new(
        MemoryConfigPersistence::new(),
    ))));
    let mut worker = StorageWorker::new(
        FrameQueue::new("storage", 100),
        Box::new(storage.clone()),
        shared.clone(),
        Arc::new(TaskMetrics::new("storage_worker")),
        Duration::from_millis(10),
        batch_bytes,
    );
    let imu = FanOut::new(Arc::new(TaskMetrics::new("imu_sensor")));
    worker.add_source(imu.clone());
    Fixture {
        worker,
        storage,
        imu,
        shared,
    }
}

fn imu_frame(timestamp: u64) -> DataFrame {
    DataFrame::new(
        timestamp,
        Payload::Imu(ImuSample {
            accel: [timestamp as f32, 0.0, 1.0],
            ..ImuSample::default()
        }),
    )
}

fn recorded(storage: &MemoryLogStorage) -> Vec<DataFrame> {
    let names = storage.file_names();
    assert_eq!(names.len(), 1, "expected exactly one recording");
    let bytes = storage.contents(&names[0]).unwrap();
    FrameReader::new(&bytes).collect::<Result<_, _>>().unwrap()
}

#[test]
fn test_recording_starts_with_config_frame() {
    let mut f = fixture(4096);

    assert!(!f.imu.send_data(&imu_frame(0)));

    f.worker.handle_command(StorageCommand::StartRecording);
    let state = f.shared.state.snapshot();
    assert!(state.recording);
    assert_eq!(state.filename, f.storage.file_names()[0]);
    assert!(state.filename.starts_with("log_") && state.filename.ends_with(".dat"));
    assert_eq!(f.imu.len(), 1);

    for ts in 1..=5 {
        assert!(f.imu.send_data(&imu_frame(ts)));
    }
    assert_eq!(f.worker.flush_queue(), 5);

    let frames = recorded(&f.storage);
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[0].payload, Payload::Config(ConfigData::default()));
    for (i, frame) in frames[1..].iter().enumerate() {
        assert_eq!(frame, &imu_frame(i as u64 + 1));
    }
}

#[test]
fn test_stop_recording_detaches_from_sensors() {
    let mut f = fixture(4096);
    f.worker.handle_command(StorageCommand::StartRecording);
    f.imu.send_data(&imu_frame(1));

    f.worker.handle_command(StorageCommand::StopRecording);

    let state = f.shared.state.snapshot();
    assert!(!state.recording);
    assert!(state.filename.is_empty());
    assert!(f.imu.is_empty());
    assert!(!f.imu.send_data(&imu_frame(2)));

    // The frame queued before the stop is still written
    assert_eq!(recorded(&f.storage).len(), 2);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let mut f = fixture(4096);

    f.worker.handle_command(StorageCommand::StopRecording);
    assert!(f.storage.file_names().is_empty());

    f.worker.handle_command(StorageCommand::StartRecording);
    f.worker.handle_command(StorageCommand::StartRecording);
    assert_eq!(f.imu.len(), 1);
    assert!(f.imu.send_data(&imu_frame(1)));
    f.worker.flush_queue();

    let frames = recorded(&f.storage);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].frame_type(), FrameType::Config);
}

#[test]
fn test_config_change_mid_recording() {
    let mut f = fixture(4096);
    f.worker.handle_command(StorageCommand::StartRecording);
    for ts in 1..=3 {
        f.imu.send_data(&imu_frame(ts));
    }

    f.shared.config.set_imu_sample_rate(100).unwrap();
    f.worker.on_command(BaseCommand::ConfigUpdated);

    f.imu.send_data(&imu_frame(10));
    f.imu.send_data(&imu_frame(11));
    f.worker.flush_queue();

    let frames = recorded(&f.storage);
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].payload, Payload::Config(ConfigData::default()));
    match &frames[1].payload {
        Payload::Config(config) => assert_eq!(config.imu_sample_rate, 100),
        other => panic!("expected a config frame, got {:?}", other),
    }
    assert_eq!(frames[2], imu_frame(10));
    assert_eq!(frames[3], imu_frame(11));
}

#[test]
fn test_config_update_while_idle_writes_nothing() {
    let mut f = fixture(4096);
    f.worker.on_command(BaseCommand::ConfigUpdated);
    assert!(f.storage.file_names().is_empty());
}

#[test]
fn test_batch_respects_byte_budget() {
    let mut f = fixture(100);
    f.worker.handle_command(StorageCommand::StartRecording);
    for ts in 1..=5 {
        f.imu.send_data(&imu_frame(ts));
    }

    assert_eq!(f.worker.flush_queue(), 2);
    assert_eq!(f.worker.flush_queue(), 2);
    assert_eq!(f.worker.flush_queue(), 1);
    assert_eq!(f.worker.flush_queue(), 0);
    assert_eq!(recorded(&f.storage).len(), 6);
}

#[test]
fn test_open_failure_leaves_worker_idle() {
    let mut f = fixture(4096);
    f.storage.set_fail_open(true);

    f.worker.handle_command(StorageCommand::StartRecording);

    assert!(!f.worker.is_recording());
    assert!(!f.shared.state.is_recording());
    assert!(f.imu.is_empty());

    f.storage.set_fail_open(false);
    f.worker.handle_command(StorageCommand::StartRecording);
    assert!(f.worker.is_recording());
}

#[test]
fn test_commands_via_mailbox_are_applied_by_step() {
    let mut f = fixture(4096);
    let commands = f.worker.commands();

    assert!(commands.send(StorageCommand::StartRecording));
    f.worker.step();
    assert!(f.shared.state.is_recording());

    assert!(commands.send(StorageCommand::StopRecording));
    f.worker.step();
    assert!(!f.shared.state.is_recording());
}
