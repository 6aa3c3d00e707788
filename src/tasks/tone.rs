use log::{debug, info};
use std::thread;
use std::time::Duration;

use crate::engine::{BaseCommand, Mailbox, MailboxSender, Runnable};
use crate::hal::ToneOutput;

pub const SOUND_STEPS: usize = 8;
pub const SOUND_QUEUE_CAPACITY: usize = 10;

/// Upper bound on one wait for the next sound
const SOUND_WAIT: Duration = Duration::from_millis(1000);

/// One segment of a sound; frequency 0 is a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToneStep {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

const fn step(frequency_hz: u32, duration_ms: u32) -> ToneStep {
    ToneStep { frequency_hz, duration_ms }
}

const END: ToneStep = step(0, 0);

pub type Sound = [ToneStep; SOUND_STEPS];

pub const START_RECORDING_SOUND: Sound = [
    step(1500, 250), step(0, 250), step(1500, 250), step(0, 250),
    END, END, END, END,
];

pub const STOP_RECORDING_SOUND: Sound = [
    step(1000, 1000), step(0, 1000), step(1000, 1000), step(0, 1000),
    END, END, END, END,
];

pub const START_STREAMING_SOUND: Sound = START_RECORDING_SOUND;

pub const STOP_STREAMING_SOUND: Sound = STOP_RECORDING_SOUND;

pub const LOW_BATTERY_SOUND: Sound = [
    step(1000, 100), step(0, 100), step(1000, 100), step(0, 100),
    step(1000, 100), step(0, 100), step(1000, 100), step(0, 100),
];

/// Queues sounds for the tone task without waiting for playback.
#[derive(Clone)]
pub struct ToneHandle {
    sounds: MailboxSender<Sound>,
}

impl ToneHandle {
    /// False when the sound queue is full and the sound was dropped
    pub fn play(&self, sound: Sound) -> bool {
        self.sounds.send(sound)
    }
}

/// Plays queued sounds one after another on a tone output.
pub struct ToneTask<O: ToneOutput> {
    output: O,
    sounds: Mailbox<Sound>,
}

impl<O: ToneOutput> ToneTask<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            sounds: Mailbox::new(SOUND_QUEUE_CAPACITY),
        }
    }

    pub fn handle(&self) -> ToneHandle {
        ToneHandle {
            sounds: self.sounds.sender(),
        }
    }

    /// Sounds waiting to be played
    pub fn pending(&self) -> usize {
        self.sounds.len()
    }

    /// Waits up to `timeout` for a sound and plays it to the end.
    pub fn play_next(&mut self, timeout: Duration) -> bool {
        match self.sounds.recv_timeout(timeout) {
            Some(sound) => {
                self.play(&sound);
                true
            }
            None => false,
        }
    }

    fn play(&mut self, sound: &Sound) {
        for segment in sound.iter().filter(|segment| segment.duration_ms > 0) {
            if segment.frequency_hz == 0 {
                self.output.silence();
            } else {
                self.output.tone(segment.frequency_hz);
            }
            thread::sleep(Duration::from_millis(u64::from(segment.duration_ms)));
        }
        self.output.silence();
    }
}

impl<O: ToneOutput> Runnable for ToneTask<O> {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.output.silence();
        info!("ToneTask: ready");
        Ok(())
    }

    fn on_command(&mut self, command: BaseCommand) {
        debug!("ToneTask: ignoring {:?}", command);
    }

    fn step(&mut self) {
        self.play_next(SOUND_WAIT);
    }
}
