//! Line-oriented control channel: `param=value` requests, one reply line each.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::controller::AppController;
use crate::config::{ConfigError, ConfigField};
use crate::core::clock::MAX_UNIX_SECONDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    StartRecording,
    StopRecording,
    /// Unix time in seconds
    SetTime(u64),
    /// Apply persisted configuration changes to the running tasks
    ConfigUpdate,
    SetField(ConfigField, u32),
    GetConfig,
    GetSystemState,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),
    #[error("invalid value '{value}' for {param}")]
    InvalidValue { param: String, value: String },
    #[error("Already recording")]
    AlreadyRecording,
    #[error("Not recording")]
    NotRecording,
    #[error("command queue full")]
    Busy,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControlMessage {
    pub fn parse(param: &str, value: &str) -> Result<Self, ControlError> {
        let invalid = || ControlError::InvalidValue {
            param: param.to_string(),
            value: value.to_string(),
        };

        match param {
            "recording" => match value {
                "start_recording" => Ok(Self::StartRecording),
                "stop_recording" => Ok(Self::StopRecording),
                _ => Err(invalid()),
            },
            "set_time" => value
                .parse()
                .ok()
                .filter(|&secs| secs <= MAX_UNIX_SECONDS)
                .map(Self::SetTime)
                .ok_or_else(invalid),
            "config_update" => Ok(Self::ConfigUpdate),
            "config" => Ok(Self::GetConfig),
            "system_state" => Ok(Self::GetSystemState),
            _ => match ConfigField::from_name(param) {
                Some(field) => value
                    .parse()
                    .map(|v| Self::SetField(field, v))
                    .map_err(|_| invalid()),
                None => Err(ControlError::UnknownParam(param.to_string())),
            },
        }
    }

    /// Parses `param=value`, or a bare `param`
    pub fn parse_line(line: &str) -> Result<Self, ControlError> {
        let line = line.trim();
        match line.split_once('=') {
            Some((param, value)) => Self::parse(param.trim(), value.trim()),
            None => Self::parse(line, ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    Ok,
    Json(String),
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlReply::Ok => write!(f, "OK"),
            ControlReply::Json(json) => write!(f, "{}", json),
        }
    }
}

/// Accepts control connections until the listener fails.
pub async fn serve_control(listener: TcpListener, controller: AppController) -> Result<()> {
    info!("Control server listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept control connection")?;
        debug!("Control client connected from {}", peer);
        let controller = controller.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, controller).await {
                debug!("Control connection from {} closed: {:#}", peer, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, controller: AppController) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut reply = controller.respond(&line);
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recording() {
        assert_eq!(
            ControlMessage::parse_line("recording=start_recording"),
            Ok(ControlMessage::StartRecording)
        );
        assert_eq!(
            ControlMessage::parse_line("recording = stop_recording"),
            Ok(ControlMessage::StopRecording)
        );
        assert!(matches!(
            ControlMessage::parse_line("recording=pause"),
            Err(ControlError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_field_setter() {
        assert_eq!(
            ControlMessage::parse_line("imu_sample_rate=100"),
            Ok(ControlMessage::SetField(ConfigField::ImuSampleRate, 100))
        );
        assert!(ControlMessage::parse_line("gyro_range=fast").is_err());
    }

    #[test]
    fn test_parse_queries_and_unknown() {
        assert_eq!(ControlMessage::parse_line("config"), Ok(ControlMessage::GetConfig));
        assert_eq!(ControlMessage::parse_line("config_update"), Ok(ControlMessage::ConfigUpdate));
        assert_eq!(
            ControlMessage::parse_line("set_time=1700000000"),
            Ok(ControlMessage::SetTime(1_700_000_000))
        );
        assert_eq!(
            ControlMessage::parse_line("reboot=1"),
            Err(ControlError::UnknownParam("reboot".to_string()))
        );
    }
}
