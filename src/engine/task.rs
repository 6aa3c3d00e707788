use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::mailbox::{BaseCommand, Mailbox, MailboxSender, BASE_MAILBOX_CAPACITY};
use super::priority::{CoreAffinity, Priority};
use super::state::TaskState;

/// Host threads need far more than the RTOS default of 2 KB
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

const HALT_POLL: Duration = Duration::from_millis(50);

/// Scheduling parameters of a task.
///
/// Priority and core are advisory on a host OS and are only reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub stack_size: usize,
    pub priority: Priority,
    pub core: CoreAffinity,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: DEFAULT_STACK_SIZE,
            priority: Priority::default(),
            core: CoreAffinity::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_core(mut self, core: CoreAffinity) -> Self {
        self.core = core;
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }
}

/// Body of a task. The shared loop drains the control mailbox, then
/// calls [`Runnable::step`] once, until the task is stopped.
pub trait Runnable: Send + 'static {
    /// One-time bring-up. An error halts the task.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_command(&mut self, command: BaseCommand);

    /// One loop iteration. Must return within a bounded time so that
    /// commands and stop requests are observed.
    fn step(&mut self);

    fn teardown(&mut self) {}
}

impl Runnable for Box<dyn Runnable> {
    fn setup(&mut self) -> Result<()> {
        (**self).setup()
    }

    fn on_command(&mut self, command: BaseCommand) {
        (**self).on_command(command)
    }

    fn step(&mut self) {
        (**self).step()
    }

    fn teardown(&mut self) {
        (**self).teardown()
    }
}

/// A named long-running activity on its own thread with a control mailbox.
pub struct Task {
    spec: TaskSpec,
    mailbox: Mailbox<BaseCommand>,
    shutdown: Arc<AtomicBool>,
    state: Arc<Mutex<TaskState>>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            mailbox: Mailbox::new(BASE_MAILBOX_CAPACITY),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(TaskState::Created)),
            handle: None,
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn commands(&self) -> MailboxSender<BaseCommand> {
        self.mailbox.sender()
    }

    /// Non-blocking; false when the mailbox is full
    pub fn send_command(&self, command: BaseCommand) -> bool {
        self.mailbox.send(command)
    }

    pub fn state(&self) -> TaskState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Spawns the task thread. Starting a running task is a no-op.
    pub fn start<R: Runnable>(&mut self, runnable: R) -> Result<()> {
        if self.is_running() {
            warn!("{}: already running", self.spec.name);
            return Ok(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.shutdown.store(false, Ordering::Release);
        set_state(&self.state, TaskState::Running);

        let spec = self.spec.clone();
        let mailbox = self.mailbox.clone();
        let shutdown = self.shutdown.clone();
        let state = self.state.clone();
        let handle = thread::Builder::new()
            .name(spec.name.clone())
            .stack_size(spec.stack_size)
            .spawn(move || run_loop(spec, runnable, mailbox, shutdown, state))
            .with_context(|| format!("failed to spawn task {}", self.spec.name))?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Requests a stop and waits for the current iteration to finish.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::Release);
        if handle.join().is_err() {
            error!("{}: task thread panicked", self.spec.name);
        }
        set_state(&self.state, TaskState::Stopped);
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_state(state: &Mutex<TaskState>, next: TaskState) {
    let mut current = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if !current.can_transition_to(&next) {
        debug!("unexpected task state change {} -> {}", current.name(), next.name());
    }
    *current = next;
}

fn run_loop<R: Runnable>(
    spec: TaskSpec,
    mut runnable: R,
    mailbox: Mailbox<BaseCommand>,
    shutdown: Arc<AtomicBool>,
    state: Arc<Mutex<TaskState>>,
) {
    info!(
        "{}::run priority: {} core: {}",
        spec.name,
        spec.priority.level(),
        spec.core
    );

    if let Err(err) = runnable.setup() {
        error!("{}: setup failed, halting: {:#}", spec.name, err);
        set_state(&state, TaskState::Halted { reason: format!("{:#}", err) });
        while !shutdown.load(Ordering::Acquire) {
            thread::sleep(HALT_POLL);
        }
        return;
    }

    while !shutdown.load(Ordering::Acquire) {
        for command in mailbox.drain() {
            runnable.on_command(command);
        }
        runnable.step();
    }

    runnable.teardown();
    debug!("{}: exited", spec.name);
}
