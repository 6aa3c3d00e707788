pub mod network_worker;
pub mod sensor;
pub mod storage_worker;
pub mod tone;

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::core::Clock;
use crate::engine::SystemState;

pub use network_worker::NetworkWorker;
pub use sensor::{RateSource, SampleObserver, SamplingMode, SensorTask};
pub use storage_worker::{StorageCommand, StorageWorker, STORAGE_MAILBOX_CAPACITY};
pub use tone::{Sound, ToneHandle, ToneStep, ToneTask, SOUND_QUEUE_CAPACITY, SOUND_STEPS};

/// Process-wide state every task reads
#[derive(Clone)]
pub struct Shared {
    pub config: Arc<GlobalConfig>,
    pub state: SystemState,
    pub clock: Clock,
}

impl Shared {
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        Self {
            config,
            state: SystemState::new(),
            clock: Clock::new(),
        }
    }
}
