pub mod mock;
pub mod persistence;
pub mod storage;
pub mod tcp;
pub mod tone;
pub mod traits;

pub use persistence::FileConfigPersistence;
pub use storage::FileLogStorage;
pub use tcp::TcpTransport;
pub use tone::LogToneOutput;
pub use traits::{
    ClientId, ConfigPersistence, LogFile, LogStorage, SensorDriver, ToneOutput, Transport,
    TransportEvent,
};
