use anyhow::{anyhow, Result};
use nextwheel::engine::{
    BaseCommand, CoreAffinity, Priority, Runnable, Task, TaskSpec, TaskState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Clone, Default)]
struct Counters {
    steps: Arc<AtomicUsize>,
    commands: Arc<AtomicUsize>,
    teardowns: Arc<AtomicUsize>,
}

struct Counting(Counters);

impl Runnable for Counting {
    fn on_command(&mut self, _command: BaseCommand) {
        self.0.commands.fetch_add(1, Ordering::SeqCst);
    }

    fn step(&mut self) {
        self.0.steps.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
    }

    fn teardown(&mut self) {
        self.0.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct Broken;

impl Runnable for Broken {
    fn setup(&mut self) -> Result<()> {
        Err(anyhow!("IMU not detected"))
    }

    fn on_command(&mut self, _command: BaseCommand) {}

    fn step(&mut self) {
        panic!("step must not run after a failed setup");
    }
}

fn spec(name: &str) -> TaskSpec {
    TaskSpec::new(name)
        .with_priority(Priority::Highest)
        .with_core(CoreAffinity::Core(1))
}

#[test]
fn test_task_runs_until_stopped() {
    let counters = Counters::default();
    let mut task = Task::new(spec("counting"));

    task.start(Counting(counters.clone())).unwrap();
    assert!(task.is_running());
    assert!(wait_until(Duration::from_secs(1), || counters.steps.load(Ordering::SeqCst) > 5));

    task.stop();
    assert!(!task.is_running());
    assert_eq!(task.state(), TaskState::Stopped);
    assert_eq!(counters.teardowns.load(Ordering::SeqCst), 1);

    let steps = counters.steps.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(counters.steps.load(Ordering::SeqCst), steps);
}

#[test]
fn test_commands_reach_the_task() {
    let counters = Counters::default();
    let mut task = Task::new(spec("commands"));
    task.start(Counting(counters.clone())).unwrap();

    assert!(task.send_command(BaseCommand::ConfigUpdated));
    assert!(task.commands().send(BaseCommand::ConfigUpdated));
    assert!(wait_until(Duration::from_secs(1), || counters.commands.load(Ordering::SeqCst) == 2));

    task.stop();
}

#[test]
fn test_mailbox_holds_ten_commands_before_start() {
    let task = Task::new(spec("idle"));
    for _ in 0..10 {
        assert!(task.send_command(BaseCommand::ConfigUpdated));
    }
    assert!(!task.send_command(BaseCommand::ConfigUpdated));
}

#[test]
fn test_second_start_is_ignored() {
    let first = Counters::default();
    let second = Counters::default();
    let mut task = Task::new(spec("twice"));

    task.start(Counting(first.clone())).unwrap();
    task.start(Counting(second.clone())).unwrap();
    thread::sleep(Duration::from_millis(30));
    task.stop();

    assert!(first.steps.load(Ordering::SeqCst) > 0);
    assert_eq!(second.steps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_setup_halts_task() {
    let mut task = Task::new(spec("broken"));
    task.start(Broken).unwrap();

    assert!(wait_until(Duration::from_secs(1), || matches!(task.state(), TaskState::Halted { .. })));
    assert!(task.is_running());

    if let TaskState::Halted { reason } = task.state() {
        assert!(reason.contains("IMU not detected"));
    }

    task.stop();
    assert_eq!(task.state(), TaskState::Stopped);
}

#[test]
fn test_task_can_restart_after_stop() {
    let counters = Counters::default();
    let mut task = Task::new(spec("restart"));

    task.start(Counting(counters.clone())).unwrap();
    task.stop();
    let before = counters.steps.load(Ordering::SeqCst);

    task.start(Counting(counters.clone())).unwrap();
    assert!(wait_until(Duration::from_secs(1), || counters.steps.load(Ordering::SeqCst) > before));
    task.stop();
    assert_eq!(counters.teardowns.load(Ordering::SeqCst), 2);
}
