//! Converts a recording file into CSV rows, one per frame, on stdout.

use anyhow::{bail, Context, Result};
use std::io::{self, BufWriter, Write};

use nextwheel::core::{DataFrame, FrameReader, Payload};

fn row(frame: &DataFrame) -> String {
    let values: Vec<String> = match &frame.payload {
        Payload::Config(config) => vec![
            config.accel_range.to_string(),
            config.gyro_range.to_string(),
            config.mag_range.to_string(),
            config.imu_sample_rate.to_string(),
            config.adc_sample_rate.to_string(),
        ],
        Payload::Adc(sample) => sample.channels.iter().map(|v| v.to_string()).collect(),
        Payload::Imu(sample) => sample
            .accel
            .iter()
            .chain(&sample.gyro)
            .chain(&sample.mag)
            .map(|v| v.to_string())
            .collect(),
        Payload::Power(sample) => vec![
            sample.voltage.to_string(),
            sample.current.to_string(),
            sample.power.to_string(),
            sample.flags.0.to_string(),
        ],
        Payload::QuadEncoder(delta) => vec![delta.to_string()],
    };
    format!("{},{},{}", frame.frame_type().name(), frame.timestamp, values.join(","))
}

fn main() -> Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: dat_to_csv <recording.dat>");
    };
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "type,timestamp_us,values...")?;

    let mut reader = FrameReader::new(&bytes);
    loop {
        let offset = reader.offset();
        match reader.next() {
            Some(Ok(frame)) => writeln!(out, "{}", row(&frame))?,
            Some(Err(e)) => {
                out.flush()?;
                bail!("{} is corrupt at byte {}: {}", path, offset, e);
            }
            None => break,
        }
    }
    out.flush()?;
    Ok(())
}
