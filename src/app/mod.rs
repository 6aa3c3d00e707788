pub mod buttons;
pub mod control;
pub mod controller;

use anyhow::Result;
use crossbeam_channel::Receiver;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppSettings, GlobalConfig};
use crate::core::{DataFrame, Payload};
use crate::engine::{CoreAffinity, FanOut, FrameQueue, Priority, Runnable, Task, TaskSpec, TaskState};
use crate::hal::{ConfigPersistence, LogStorage, SensorDriver, ToneOutput, Transport, TransportEvent};
use crate::observability::{MetricsCollector, StatusMonitor};
use crate::tasks::tone::LOW_BATTERY_SOUND;
use crate::tasks::{
    NetworkWorker, RateSource, SampleObserver, SamplingMode, SensorTask, Shared, StorageWorker,
    ToneHandle, ToneTask,
};

pub use buttons::{Button, Buttons};
pub use control::{serve_control, ControlError, ControlMessage, ControlReply};
pub use controller::AppController;

pub struct SensorSet {
    pub adc: Box<dyn SensorDriver>,
    pub imu: Box<dyn SensorDriver>,
    pub power: Box<dyn SensorDriver>,
    pub encoder: Box<dyn SensorDriver>,
}

/// Collaborators the application is built from
pub struct AppParts {
    pub sensors: SensorSet,
    pub storage: Box<dyn LogStorage>,
    pub persistence: Box<dyn ConfigPersistence>,
    pub transport: Arc<dyn Transport>,
    pub transport_events: Receiver<TransportEvent>,
    pub tone_output: Box<dyn ToneOutput>,
}

/// Plays the low-battery warning when the low-power flag rises
pub fn low_battery_observer(tones: ToneHandle) -> SampleObserver {
    let mut was_low = false;
    Box::new(move |frame: &DataFrame| {
        if let Payload::Power(sample) = &frame.payload {
            let low = sample.flags.low_power();
            if low && !was_low {
                warn!("Low battery: {:.2} V", sample.voltage);
                tones.play(LOW_BATTERY_SOUND);
            }
            was_low = low;
        }
    })
}

/// Owns every task and wires sensors, workers and the control surface.
///
/// Construction only builds the object graph; nothing runs before
/// [`NextWheelApp::start`]. A stopped application cannot be restarted.
pub struct NextWheelApp {
    shared: Shared,
    collector: MetricsCollector,
    controller: AppController,
    tasks: Vec<Task>,
    runnables: Vec<Box<dyn Runnable>>,
}

impl NextWheelApp {
    pub fn new(settings: &AppSettings, parts: AppParts) -> Self {
        let settings = &settings.clone().clamped();
        let config = Arc::new(GlobalConfig::begin(parts.persistence));
        let shared = Shared::new(config);
        let mut collector = MetricsCollector::new();
        let mut tasks = Vec::new();
        let mut runnables: Vec<Box<dyn Runnable>> = Vec::new();

        let tone_task = ToneTask::new(parts.tone_output);
        let tones = tone_task.handle();

        let storage_queue = FrameQueue::new("storage", settings.storage_queue_capacity);
        let mut storage = StorageWorker::new(
            storage_queue,
            parts.storage,
            shared.clone(),
            collector.track("storage_worker"),
            Duration::from_millis(settings.storage_period_ms),
            settings.storage_batch_bytes,
        )
        .with_tones(tones.clone());

        let network_queue = FrameQueue::new("network", settings.network_queue_capacity);
        let network_handle = network_queue.handle();
        let network = NetworkWorker::new(
            network_queue,
            parts.transport,
            parts.transport_events,
            shared.clone(),
            collector.track("network_worker"),
            Duration::from_millis(settings.network_period_ms),
        )
        .with_tones(tones.clone());

        let sensors = parts.sensors;
        let sensor_plan = [
            ("adc_sensor", sensors.adc, SamplingMode::Timer(RateSource::AdcRate), Priority::Highest),
            ("imu_sensor", sensors.imu, SamplingMode::Timer(RateSource::ImuRate), Priority::Highest),
            (
                "encoder_sensor",
                sensors.encoder,
                SamplingMode::Timer(RateSource::Fixed(settings.encoder_rate_hz)),
                Priority::Highest,
            ),
            (
                "power_sensor",
                sensors.power,
                SamplingMode::Periodic(Duration::from_millis(settings.power_period_ms)),
                Priority::High,
            ),
        ];

        let mut sensor_tasks = Vec::new();
        for (name, driver, mode, priority) in sensor_plan {
            let fanout = FanOut::new(collector.track(name));
            fanout.register(&network_handle);
            storage.add_source(fanout.clone());

            let mut sensor = SensorTask::new(driver, mode, shared.clone(), fanout);
            if name == "power_sensor" {
                sensor = sensor.with_observer(low_battery_observer(tones.clone()));
            }
            let spec = TaskSpec::new(name)
                .with_priority(priority)
                .with_core(CoreAffinity::Core(1));
            sensor_tasks.push((Task::new(spec), Box::new(sensor) as Box<dyn Runnable>));
        }

        let storage_commands = storage.commands();
        tasks.push(Task::new(
            TaskSpec::new("storage_worker")
                .with_priority(Priority::High)
                .with_core(CoreAffinity::Core(0)),
        ));
        runnables.push(Box::new(storage));
        tasks.push(Task::new(
            TaskSpec::new("network_worker")
                .with_priority(Priority::Medium)
                .with_core(CoreAffinity::Core(1)),
        ));
        runnables.push(Box::new(network));
        for (task, runnable) in sensor_tasks {
            tasks.push(task);
            runnables.push(runnable);
        }
        tasks.push(Task::new(
            TaskSpec::new("tone")
                .with_priority(Priority::Low)
                .with_core(CoreAffinity::Core(0)),
        ));
        runnables.push(Box::new(tone_task));

        let mailboxes = tasks
            .iter()
            .map(|task| (task.name().to_string(), task.commands()))
            .collect();
        let controller = AppController::new(shared.clone(), storage_commands, mailboxes);

        Self {
            shared,
            collector,
            controller,
            tasks,
            runnables,
        }
    }

    /// Starts workers before sensors so no early sample goes unconsumed.
    pub fn start(&mut self) -> Result<()> {
        if self.runnables.is_empty() {
            warn!("NextWheelApp: already started");
            return Ok(());
        }
        for (task, runnable) in self.tasks.iter_mut().zip(self.runnables.drain(..)) {
            task.start(runnable)?;
        }
        info!("NextWheelApp: {} tasks started", self.tasks.len());
        Ok(())
    }

    /// Stops sensors before workers so the workers can drain.
    pub fn stop(&mut self) {
        for task in self.tasks.iter_mut().rev() {
            task.stop();
        }
    }

    pub fn controller(&self) -> AppController {
        self.controller.clone()
    }

    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn monitor(&self) -> StatusMonitor {
        StatusMonitor::new(self.collector.clone())
    }

    pub fn task_states(&self) -> Vec<(String, TaskState)> {
        self.tasks
            .iter()
            .map(|task| (task.name().to_string(), task.state()))
            .collect()
    }
}

impl Drop for NextWheelApp {
    fn drop(&mut self) {
        self.stop();
    }
}
