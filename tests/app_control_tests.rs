use nextwheel::app::{serve_control, Button, Buttons, ControlError, ControlMessage};
use nextwheel::config::{ConfigData, CONFIG_RECORD_SIZE};
use nextwheel::hal::mock::{
    MemoryConfigPersistence, MemoryLogStorage, MemoryTransport, RecordingToneOutput,
    SimulatedAdc, SimulatedEncoder, SimulatedImu, SimulatedPower,
};
use nextwheel::{AppParts, AppSettings, NextWheelApp, SensorSet};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

fn app(persistence: MemoryConfigPersistence) -> NextWheelApp {
    let (transport, transport_events) = MemoryTransport::new();
    let parts = AppParts {
        sensors: SensorSet {
            adc: Box::new(SimulatedAdc::new()),
            imu: Box::new(SimulatedImu::new()),
            power: Box::new(SimulatedPower::default()),
            encoder: Box::new(SimulatedEncoder::default()),
        },
        storage: Box::new(MemoryLogStorage::new()),
        persistence: Box::new(persistence),
        transport: Arc::new(transport),
        transport_events,
        tone_output: Box::new(RecordingToneOutput::new()),
    };
    NextWheelApp::new(&AppSettings::default(), parts)
}

fn stored_config(persistence: &MemoryConfigPersistence) -> ConfigData {
    let record: [u8; CONFIG_RECORD_SIZE] = persistence.stored().unwrap();
    ConfigData::from_bytes(&record)
}

#[test]
fn test_recording_requests_checked_against_state() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();

    assert_eq!(controller.respond("recording=stop_recording"), "ERR Not recording");
    assert_eq!(controller.respond("recording=start_recording"), "OK");

    app.shared().state.set_recording("log_x.dat");
    assert_eq!(controller.respond("recording=start_recording"), "ERR Already recording");
    assert_eq!(controller.respond("recording=stop_recording"), "OK");
}

#[test]
fn test_field_setters_validate_and_persist() {
    let persistence = MemoryConfigPersistence::new();
    let app = app(persistence.clone());
    let controller = app.controller();

    assert!(controller.respond("accel_range=3").starts_with("ERR"));
    assert_eq!(stored_config(&persistence).accel_range, 2);

    assert_eq!(controller.respond("accel_range=8"), "OK");
    assert_eq!(stored_config(&persistence).accel_range, 8);
    assert_eq!(controller.config().accel_range, 8);
}

#[test]
fn test_queries_answer_json() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();
    controller.respond("imu_sample_rate=200");

    let config: serde_json::Value = serde_json::from_str(&controller.respond("config")).unwrap();
    assert_eq!(config["imu_sample_rate"], 200);
    assert_eq!(config["mag_range"], 2500);

    let state: serde_json::Value =
        serde_json::from_str(&controller.respond("system_state")).unwrap();
    assert_eq!(state["recording"], false);
    assert_eq!(state["streaming"], false);
}

#[test]
fn test_config_update_reaches_every_task() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();

    // storage, network, four sensors and the tone task
    assert_eq!(controller.broadcast_config_update(), 7);
    assert_eq!(controller.respond("config_update"), "OK");
}

#[test]
fn test_set_time_moves_clock() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();

    assert_eq!(controller.respond("set_time=975628800"), "OK");
    let name = app.shared().clock.log_file_name();
    assert!(name.starts_with("log_2000-12-01_00-00-0"), "{}", name);
}

#[test]
fn test_set_time_rejects_out_of_range_seconds() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();
    let before = app.shared().clock.now_us();

    let too_large = (i64::MAX as u64 / 1_000_000 + 1).to_string();
    for value in [too_large.as_str(), "9223372036854775808", "10000000000000"] {
        assert!(
            matches!(
                ControlMessage::parse("set_time", value),
                Err(ControlError::InvalidValue { .. })
            ),
            "{}",
            value
        );
        assert!(controller
            .respond(&format!("set_time={}", value))
            .starts_with("ERR invalid value"));
    }

    // Clock untouched and still usable
    let after = app.shared().clock.now_us();
    assert!(after >= before && after < before + 10_000_000);
    assert_eq!(
        ControlMessage::parse("set_time", &(i64::MAX as u64 / 1_000_000).to_string()),
        Ok(ControlMessage::SetTime(i64::MAX as u64 / 1_000_000))
    );
}

#[test]
fn test_unknown_and_malformed_requests() {
    let app = app(MemoryConfigPersistence::new());
    let controller = app.controller();

    assert_eq!(controller.respond("reboot"), "ERR unknown parameter 'reboot'");
    assert!(controller.respond("set_time=yesterday").starts_with("ERR invalid value"));
    assert_eq!(
        controller.handle_control(ControlMessage::StopRecording),
        Err(ControlError::NotRecording)
    );
}

#[test]
fn test_buttons_fire_on_rising_edge_only() {
    let app = app(MemoryConfigPersistence::new());
    let mut buttons = Buttons::new(app.controller());

    assert!(buttons.update(Button::StartRecording, true));
    assert!(!buttons.update(Button::StartRecording, true));
    assert!(!buttons.update(Button::StartRecording, false));
    assert!(buttons.update(Button::StartRecording, true));

    assert!(!buttons.update(Button::StopRecording, false));
    assert!(buttons.update(Button::StopRecording, true));
}

#[tokio::test]
async fn test_control_server_answers_lines() {
    let app = app(MemoryConfigPersistence::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_control(listener, app.controller()));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"recording=stop_recording\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().unwrap(), "ERR Not recording");

    writer.write_all(b"gyro_range=500\nsystem_state\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().unwrap(), "OK");
    let state: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(state["filename"], "");

    server.abort();
    assert_eq!(app.controller().config().gyro_range, 500);
}
