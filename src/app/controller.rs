use log::{debug, info};

use super::control::{ControlError, ControlMessage, ControlReply};
use crate::config::ConfigData;
use crate::engine::{BaseCommand, MailboxSender, StateSnapshot};
use crate::tasks::{Shared, StorageCommand};

/// Cloneable entry point for everything that drives the device:
/// buttons, the control channel and the binary.
///
/// Every method is non-blocking and allocation-free on the command
/// path, so it can be called from interrupt-like contexts.
#[derive(Clone)]
pub struct AppController {
    shared: Shared,
    storage: MailboxSender<StorageCommand>,
    mailboxes: Vec<(String, MailboxSender<BaseCommand>)>,
}

impl AppController {
    pub fn new(
        shared: Shared,
        storage: MailboxSender<StorageCommand>,
        mailboxes: Vec<(String, MailboxSender<BaseCommand>)>,
    ) -> Self {
        Self {
            shared,
            storage,
            mailboxes,
        }
    }

    /// False when the storage mailbox is full
    pub fn start_recording(&self) -> bool {
        self.storage.send(StorageCommand::StartRecording)
    }

    pub fn stop_recording(&self) -> bool {
        self.storage.send(StorageCommand::StopRecording)
    }

    pub fn set_time(&self, unix_seconds: u64) {
        self.shared.clock.set_unix_time(unix_seconds);
        info!("Time set to {}", self.shared.clock.wall_time());
    }

    /// Tells every task to re-read the configuration. Returns how many
    /// mailboxes accepted the notification.
    pub fn broadcast_config_update(&self) -> usize {
        let delivered = self
            .mailboxes
            .iter()
            .filter(|(name, mailbox)| {
                let accepted = mailbox.send(BaseCommand::ConfigUpdated);
                if !accepted {
                    debug!("{}: mailbox full, config update not delivered", name);
                }
                accepted
            })
            .count();
        info!("Config update sent to {}/{} tasks", delivered, self.mailboxes.len());
        delivered
    }

    pub fn state(&self) -> StateSnapshot {
        self.shared.state.snapshot()
    }

    pub fn config(&self) -> ConfigData {
        self.shared.config.get()
    }

    pub fn handle_control(&self, message: ControlMessage) -> Result<ControlReply, ControlError> {
        debug!("Control: {:?}", message);
        match message {
            ControlMessage::StartRecording => {
                if self.shared.state.is_recording() {
                    return Err(ControlError::AlreadyRecording);
                }
                if !self.start_recording() {
                    return Err(ControlError::Busy);
                }
            }
            ControlMessage::StopRecording => {
                if !self.shared.state.is_recording() {
                    return Err(ControlError::NotRecording);
                }
                if !self.stop_recording() {
                    return Err(ControlError::Busy);
                }
            }
            ControlMessage::SetTime(seconds) => self.set_time(seconds),
            ControlMessage::ConfigUpdate => {
                self.broadcast_config_update();
            }
            ControlMessage::SetField(field, value) => {
                self.shared.config.set_field(field, value)?;
                info!("Config {} = {}", field.name(), value);
            }
            ControlMessage::GetConfig => {
                let json = serde_json::to_string(&self.config()).unwrap_or_else(|_| "{}".to_string());
                return Ok(ControlReply::Json(json));
            }
            ControlMessage::GetSystemState => {
                return Ok(ControlReply::Json(self.shared.state.to_json()));
            }
        }
        Ok(ControlReply::Ok)
    }

    /// Parses and executes one control line, rendering the reply line.
    pub fn respond(&self, line: &str) -> String {
        match ControlMessage::parse_line(line).and_then(|message| self.handle_control(message)) {
            Ok(reply) => reply.to_string(),
            Err(e) => format!("ERR {}", e),
        }
    }
}
