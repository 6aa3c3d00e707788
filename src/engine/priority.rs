use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Scheduling priority of a task, mirroring the RTOS levels 0-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Lowest,
    Low,
    Medium,
    /// Workers whose data loss is costly (storage)
    High,
    /// Sensor sampling: a missed sample cannot be recovered
    Highest,
}

impl Priority {
    /// RTOS priority level (higher = more urgent)
    pub fn level(&self) -> u8 {
        match self {
            Priority::Lowest => 0,
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Highest => 4,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level().cmp(&other.level())
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Processor the scheduler should pin a task to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreAffinity {
    Core(u8),
    Any,
}

impl Default for CoreAffinity {
    fn default() -> Self {
        CoreAffinity::Any
    }
}

impl fmt::Display for CoreAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreAffinity::Core(id) => write!(f, "{}", id),
            CoreAffinity::Any => write!(f, "any"),
        }
    }
}
