use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest the timer thread sleeps before re-checking its settings
const MAX_SLEEP: Duration = Duration::from_millis(20);

struct TimerShared {
    period_us: AtomicU64,
    generation: AtomicU64,
    running: AtomicBool,
}

/// Periodic hardware-style timer.
///
/// Every expiry gives a single-slot semaphore without blocking. Expiries
/// that arrive while the sampler is still busy coalesce into one, so a
/// slow consumer skips samples instead of falling behind. Deadlines are
/// computed from the previous deadline, not from wake-up time.
pub struct SampleTimer {
    shared: Arc<TimerShared>,
    ticks: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl SampleTimer {
    pub fn start(name: &str, period: Duration) -> Result<Self> {
        let shared = Arc::new(TimerShared {
            period_us: AtomicU64::new(period_to_us(period)),
            generation: AtomicU64::new(0),
            running: AtomicBool::new(true),
        });
        let (tx, ticks) = bounded(1);

        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(format!("{}-timer", name))
            .spawn(move || {
                let shared = thread_shared;
                let mut generation = shared.generation.load(Ordering::Acquire);
                let mut period = Duration::from_micros(shared.period_us.load(Ordering::Acquire));
                let mut deadline = Instant::now() + period;

                while shared.running.load(Ordering::Acquire) {
                    let current = shared.generation.load(Ordering::Acquire);
                    if current != generation {
                        generation = current;
                        period = Duration::from_micros(shared.period_us.load(Ordering::Acquire));
                        deadline = Instant::now() + period;
                    }

                    let now = Instant::now();
                    if now >= deadline {
                        // A full slot means the previous tick is still pending
                        let _ = tx.try_send(());
                        deadline += period;
                        if deadline <= now {
                            deadline = now + period;
                        }
                        continue;
                    }
                    thread::sleep((deadline - now).min(MAX_SLEEP));
                }
            })
            .with_context(|| format!("failed to spawn timer thread for {}", name))?;

        Ok(Self {
            shared,
            ticks,
            thread: Some(thread),
        })
    }

    /// Reprograms the alarm; the next expiry is one new period from now.
    pub fn set_period(&self, period: Duration) {
        let period_us = period_to_us(period);
        self.shared.period_us.store(period_us, Ordering::Release);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        while self.ticks.try_recv().is_ok() {}
        debug!("timer period set to {}us", period_us);
    }

    pub fn period(&self) -> Duration {
        Duration::from_micros(self.shared.period_us.load(Ordering::Acquire))
    }

    /// Takes the tick semaphore, waiting at most `timeout`.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.ticks.recv_timeout(timeout).is_ok()
    }

    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SampleTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn period_to_us(period: Duration) -> u64 {
    (period.as_micros() as u64).max(1)
}

/// Converts a sample rate into a timer period
pub fn period_for_rate(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Fixed-cadence sleeper for worker loops.
///
/// Each wake-up is scheduled relative to the previous one. After an
/// overrun longer than a full period the schedule restarts from now.
pub struct Pacer {
    period: Duration,
    last_wake: Instant,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_wake: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn wait(&mut self) {
        let next = self.last_wake + self.period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
            self.last_wake = next;
        } else if now - next > self.period {
            self.last_wake = now;
        } else {
            self.last_wake = next;
        }
    }
}
