use anyhow::Result;

use crate::config::{ConfigData, CONFIG_RECORD_SIZE};
use crate::core::{FrameType, Payload};

/// Identifies one connected stream client
pub type ClientId = u32;

/// Trait implemented by sensor chips
pub trait SensorDriver: Send + 'static {
    fn name(&self) -> &str;

    /// Kind of frame this sensor produces
    fn frame_type(&self) -> FrameType;

    /// Detect and initialize the chip with the given ranges
    fn begin(&mut self, config: &ConfigData) -> Result<()>;

    /// Take one reading
    fn update(&mut self) -> Result<Payload>;

    /// Apply a new configuration to an initialized chip
    fn reconfigure(&mut self, _config: &ConfigData) -> Result<()> {
        Ok(())
    }
}

/// Filesystem holding recordings
pub trait LogStorage: Send {
    /// Creates a new, empty log file. Never truncates an existing one.
    fn open_new_log_file(&mut self, name: &str) -> Result<Box<dyn LogFile>>;
}

/// An open recording
pub trait LogFile: Send {
    fn name(&self) -> &str;

    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Force buffered bytes to the medium
    fn flush(&mut self) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Non-volatile slot holding the sampling configuration record
pub trait ConfigPersistence: Send {
    /// The stored record, or None when nothing was ever saved
    fn load(&mut self) -> Result<Option<[u8; CONFIG_RECORD_SIZE]>>;

    fn save(&mut self, record: &[u8; CONFIG_RECORD_SIZE]) -> Result<()>;
}

/// Client connection changes reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(ClientId),
    Disconnected(ClientId),
}

/// Binary message channel to stream clients.
///
/// Sends never block; a client that cannot keep up loses messages.
pub trait Transport: Send + Sync {
    /// Number of clients the message was queued for
    fn send_to_all(&self, bytes: &[u8]) -> usize;

    fn send_to(&self, client: ClientId, bytes: &[u8]) -> bool;

    fn connected_clients(&self) -> usize;
}

/// Speaker driven with square-wave tones
pub trait ToneOutput: Send + 'static {
    fn tone(&mut self, frequency_hz: u32);

    fn silence(&mut self);
}

impl ToneOutput for Box<dyn ToneOutput> {
    fn tone(&mut self, frequency_hz: u32) {
        (**self).tone(frequency_hz)
    }

    fn silence(&mut self) {
        (**self).silence()
    }
}
