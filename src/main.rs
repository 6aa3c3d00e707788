use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use nextwheel::app::serve_control;
use nextwheel::hal::mock::{SimulatedAdc, SimulatedEncoder, SimulatedImu, SimulatedPower};
use nextwheel::hal::{FileConfigPersistence, FileLogStorage, LogToneOutput, TcpTransport};
use nextwheel::{AppParts, AppSettings, NextWheelApp, SensorSet};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match std::env::args().nth(1) {
        Some(path) => AppSettings::from_file(&PathBuf::from(path))?,
        None => AppSettings::default(),
    };
    info!("NextWheel data logger starting");

    let (transport, transport_events) = TcpTransport::bind(&settings.data_addr).await?;
    let control = TcpListener::bind(&settings.control_addr)
        .await
        .with_context(|| format!("Failed to bind control listener on {}", settings.control_addr))?;

    let parts = AppParts {
        sensors: SensorSet {
            adc: Box::new(SimulatedAdc::new()),
            imu: Box::new(SimulatedImu::new()),
            power: Box::new(SimulatedPower::default()),
            encoder: Box::new(SimulatedEncoder::default()),
        },
        storage: Box::new(FileLogStorage::new(&settings.data_dir)?),
        persistence: Box::new(FileConfigPersistence::new(&settings.config_path)),
        transport,
        transport_events,
        tone_output: Box::new(LogToneOutput),
    };

    let mut app = NextWheelApp::new(&settings, parts);
    app.start()?;

    let controller = app.controller();
    let control_server = tokio::spawn(serve_control(control, controller.clone()));

    let monitor = app.monitor();
    let report_every = Duration::from_secs(settings.report_interval_s.max(1));
    let mut reports = tokio::time::interval(report_every);
    reports.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = reports.tick(), if settings.report_interval_s > 0 => {
                info!("\n{}", monitor.generate_report(&controller.state()));
            }
        }
    }

    info!("Shutting down");
    control_server.abort();
    // Joining task threads blocks; keep it off the runtime's worker threads
    tokio::task::spawn_blocking(move || app.stop()).await?;
    Ok(())
}
