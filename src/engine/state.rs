use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Lifecycle of a task thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Created,
    Running,
    /// Setup failed; the thread idles until stopped
    Halted { reason: String },
    Stopped,
}

impl TaskState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &TaskState) -> bool {
        use TaskState::*;

        matches!(
            (self, target),
            (Created, Running) |
            (Running, Halted { .. }) |
            (Running, Stopped) |
            (Halted { .. }, Stopped) |
            // A stopped task may be started again
            (Stopped, Running)
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Halted { .. } => "Halted",
            Self::Stopped => "Stopped",
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Created
    }
}

/// Copy of the device status at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub streaming: bool,
    pub recording: bool,
    /// Current recording file; empty when not recording
    pub filename: String,
}

/// Device-wide status shared by the workers and the control surface.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    inner: Arc<Mutex<StateSnapshot>>,
}

impl SystemState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_recording(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .recording
    }

    pub fn is_streaming(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .streaming
    }

    pub fn set_recording(&self, filename: &str) {
        let mut state = self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.recording = true;
        state.filename = filename.to_string();
    }

    pub fn clear_recording(&self) {
        let mut state = self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.recording = false;
        state.filename.clear();
    }

    /// Returns the previous value
    pub fn set_streaming(&self, streaming: bool) -> bool {
        let mut state = self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut state.streaming, streaming)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
