use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock shared by every task.
///
/// Holds an offset from the host clock so `set_time` requests can move
/// the device's notion of "now" without touching the host.
/// Largest Unix time, in seconds, whose microsecond value fits an `i64`
pub const MAX_UNIX_SECONDS: u64 = i64::MAX as u64 / 1_000_000;

#[derive(Debug, Clone, Default)]
pub struct Clock {
    offset_us: Arc<AtomicI64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    fn host_us() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }

    /// Microseconds since the Unix epoch
    pub fn now_us(&self) -> u64 {
        let now = Self::host_us().saturating_add(self.offset_us.load(Ordering::Relaxed));
        now.max(0) as u64
    }

    /// Seconds above `MAX_UNIX_SECONDS` are clamped to it.
    pub fn set_unix_time(&self, seconds: u64) {
        let target = i64::try_from(seconds.min(MAX_UNIX_SECONDS))
            .ok()
            .and_then(|s| s.checked_mul(1_000_000))
            .unwrap_or(i64::MAX);
        self.offset_us
            .store(target.saturating_sub(Self::host_us()), Ordering::Relaxed);
    }

    pub fn wall_time(&self) -> DateTime<Utc> {
        let us = self.now_us() as i64;
        Utc.timestamp_micros(us).single().unwrap_or_default()
    }

    /// `log_YYYY-MM-DD_HH-MM-SS.dat` for the current wall time
    pub fn log_file_name(&self) -> String {
        self.wall_time()
            .format("log_%Y-%m-%d_%H-%M-%S.dat")
            .to_string()
    }
}
