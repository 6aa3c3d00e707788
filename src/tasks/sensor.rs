use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::Shared;
use crate::config::ConfigData;
use crate::core::DataFrame;
use crate::engine::{period_for_rate, BaseCommand, FanOut, Pacer, Runnable, SampleTimer};
use crate::hal::SensorDriver;
use crate::observability::TaskMetrics;

/// Upper bound on one wait for a timer tick
const TICK_WAIT: Duration = Duration::from_millis(250);

/// Where a timer-driven sensor takes its sample rate from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    ImuRate,
    AdcRate,
    Fixed(u32),
}

impl RateSource {
    pub fn rate_hz(&self, config: &ConfigData) -> u32 {
        match self {
            RateSource::ImuRate => config.imu_sample_rate,
            RateSource::AdcRate => config.adc_sample_rate,
            RateSource::Fixed(hz) => *hz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Sample, then sleep until the next period
    Periodic(Duration),
    /// Sample on every tick of a dedicated timer
    Timer(RateSource),
}

/// Called with every sample before it is published
pub type SampleObserver = Box<dyn FnMut(&DataFrame) + Send>;

/// Samples one sensor and publishes each reading to its fan-out.
pub struct SensorTask {
    name: String,
    driver: Box<dyn SensorDriver>,
    mode: SamplingMode,
    shared: Shared,
    fanout: FanOut,
    observer: Option<SampleObserver>,
    timer: Option<SampleTimer>,
    pacer: Option<Pacer>,
}

impl SensorTask {
    pub fn new(driver: Box<dyn SensorDriver>, mode: SamplingMode, shared: Shared, fanout: FanOut) -> Self {
        Self {
            name: fanout.metrics().task_name().to_string(),
            driver,
            mode,
            shared,
            fanout,
            observer: None,
            timer: None,
            pacer: None,
        }
    }

    pub fn with_observer(mut self, observer: SampleObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn fanout(&self) -> &FanOut {
        &self.fanout
    }

    fn metrics(&self) -> &Arc<TaskMetrics> {
        self.fanout.metrics()
    }

    fn timer_period(&self, source: RateSource) -> Duration {
        period_for_rate(source.rate_hz(&self.shared.config.get()))
    }

    /// Takes one reading and publishes it. False when the read failed
    /// or not every consumer accepted the frame.
    pub fn sample_once(&mut self) -> bool {
        let payload = match self.driver.update() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{}: read failed: {:#}", self.name, e);
                self.metrics().record_error();
                return false;
            }
        };
        let frame = DataFrame::new(self.shared.clock.now_us(), payload);
        if let Some(observer) = self.observer.as_mut() {
            observer(&frame);
        }
        self.fanout.send_data(&frame)
    }
}

impl Runnable for SensorTask {
    fn setup(&mut self) -> Result<()> {
        let config = self.shared.config.get();
        self.driver
            .begin(&config)
            .with_context(|| format!("{} init failed", self.driver.name()))?;

        match self.mode {
            SamplingMode::Timer(source) => {
                let period = self.timer_period(source);
                info!("{}: {} every {:?}", self.name, self.driver.frame_type().name(), period);
                self.timer = Some(SampleTimer::start(&self.name, period)?);
            }
            SamplingMode::Periodic(period) => {
                info!("{}: {} every {:?}", self.name, self.driver.frame_type().name(), period);
                self.pacer = Some(Pacer::new(period));
            }
        }
        Ok(())
    }

    fn on_command(&mut self, command: BaseCommand) {
        match command {
            BaseCommand::ConfigUpdated => {
                let config = self.shared.config.get();
                if let Err(e) = self.driver.reconfigure(&config) {
                    error!("{}: reconfigure failed: {:#}", self.name, e);
                    self.metrics().record_error();
                }
                if let (Some(timer), SamplingMode::Timer(source)) = (self.timer.as_ref(), self.mode) {
                    let period = period_for_rate(source.rate_hz(&config));
                    timer.set_period(period);
                    info!("{}: config updated, sampling every {:?}", self.name, period);
                } else {
                    info!("{}: config updated", self.name);
                }
            }
        }
    }

    fn step(&mut self) {
        let due = if let Some(timer) = self.timer.as_ref() {
            timer.wait(TICK_WAIT)
        } else if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
            true
        } else {
            false
        };
        if due {
            let start = self.metrics().start_processing();
            self.sample_once();
            self.metrics().finish_processing(start);
        }
    }

    fn teardown(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
    }
}
