//! Simulated collaborators for hosts without the wheel hardware, and for tests.

pub mod persistence;
pub mod sensors;
pub mod storage;
pub mod tone;
pub mod transport;

pub use persistence::MemoryConfigPersistence;
pub use sensors::{ConfigProbe, SimulatedAdc, SimulatedEncoder, SimulatedImu, SimulatedPower};
pub use storage::MemoryLogStorage;
pub use tone::RecordingToneOutput;
pub use transport::MemoryTransport;
