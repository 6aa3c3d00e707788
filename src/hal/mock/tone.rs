use std::sync::{Arc, Mutex};

use crate::hal::ToneOutput;

/// Records the output level sequence; `None` is silence
#[derive(Clone, Default)]
pub struct RecordingToneOutput {
    events: Arc<Mutex<Vec<Option<u32>>>>,
}

impl RecordingToneOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Option<u32>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, event: Option<u32>) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl ToneOutput for RecordingToneOutput {
    fn tone(&mut self, frequency_hz: u32) {
        self.push(Some(frequency_hz));
    }

    fn silence(&mut self) {
        self.push(None);
    }
}
