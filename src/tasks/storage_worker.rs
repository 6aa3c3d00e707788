use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::tone::{ToneHandle, START_RECORDING_SOUND, STOP_RECORDING_SOUND};
use super::Shared;
use crate::buffers::BufferPool;
use crate::core::{DataFrame, MAX_FRAME_SIZE};
use crate::engine::{BaseCommand, FanOut, FrameQueue, Mailbox, MailboxSender, Pacer, QueueHandle, Runnable};
use crate::hal::{LogFile, LogStorage};
use crate::observability::TaskMetrics;

pub const STORAGE_MAILBOX_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCommand {
    StartRecording,
    StopRecording,
}

/// Writes sensor frames to a log file while recording.
///
/// The worker's queue is registered on the sensors only while a file is
/// open, so nothing is sampled into it between recordings. Every file
/// starts with a CONFIG frame, and a new CONFIG frame is written
/// whenever the configuration changes mid-recording.
pub struct StorageWorker {
    queue: FrameQueue,
    handle: QueueHandle,
    commands: Mailbox<StorageCommand>,
    storage: Box<dyn LogStorage>,
    sources: Vec<FanOut>,
    shared: Shared,
    metrics: Arc<TaskMetrics>,
    pool: BufferPool,
    batch_bytes: usize,
    pacer: Pacer,
    tones: Option<ToneHandle>,
    file: Option<Box<dyn LogFile>>,
    file_bytes: u64,
}

impl StorageWorker {
    pub fn new(
        queue: FrameQueue,
        storage: Box<dyn LogStorage>,
        shared: Shared,
        metrics: Arc<TaskMetrics>,
        period: Duration,
        batch_bytes: usize,
    ) -> Self {
        let batch_bytes = batch_bytes.max(MAX_FRAME_SIZE);
        Self {
            handle: queue.handle(),
            queue,
            commands: Mailbox::new(STORAGE_MAILBOX_CAPACITY),
            storage,
            sources: Vec::new(),
            shared,
            metrics,
            pool: BufferPool::new(batch_bytes),
            batch_bytes,
            pacer: Pacer::new(period),
            tones: None,
            file: None,
            file_bytes: 0,
        }
    }

    pub fn with_tones(mut self, tones: ToneHandle) -> Self {
        self.tones = Some(tones);
        self
    }

    /// Sensor whose frames are recorded
    pub fn add_source(&mut self, source: FanOut) {
        self.sources.push(source);
    }

    pub fn commands(&self) -> MailboxSender<StorageCommand> {
        self.commands.sender()
    }

    pub fn queue_handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.file.is_some()
    }

    pub fn handle_command(&mut self, command: StorageCommand) {
        debug!("StorageWorker: received {:?}", command);
        match command {
            StorageCommand::StartRecording => self.start_recording(),
            StorageCommand::StopRecording => self.stop_recording(),
        }
    }

    fn start_recording(&mut self) {
        if self.file.is_some() {
            debug!("StorageWorker: already recording");
            return;
        }

        let name = self.shared.clock.log_file_name();
        let file = match self.storage.open_new_log_file(&name) {
            Ok(file) => file,
            Err(e) => {
                error!("StorageWorker: cannot open {}: {:#}", name, e);
                self.metrics.record_error();
                return;
            }
        };
        info!("StorageWorker: recording to {}", file.name());
        self.shared.state.set_recording(file.name());
        self.file = Some(file);
        self.file_bytes = 0;

        let stale = self.queue.clear();
        if stale > 0 {
            debug!("StorageWorker: discarded {} stale frames", stale);
        }
        self.write_config_frame();
        for source in &self.sources {
            source.register(&self.handle);
        }
        if let Some(tones) = &self.tones {
            tones.play(START_RECORDING_SOUND);
        }
    }

    fn stop_recording(&mut self) {
        if self.file.is_none() {
            debug!("StorageWorker: not recording");
            return;
        }

        for source in &self.sources {
            source.unregister(&self.handle);
        }
        // Frames sampled before the stop still belong to this recording
        while self.flush_queue() > 0 {}

        if let Some(file) = self.file.take() {
            let name = file.name().to_string();
            match file.close() {
                Ok(()) => info!("StorageWorker: closed {} ({} bytes)", name, self.file_bytes),
                Err(e) => {
                    error!("StorageWorker: closing {} failed: {:#}", name, e);
                    self.metrics.record_error();
                }
            }
        }
        self.shared.state.clear_recording();
        if let Some(tones) = &self.tones {
            tones.play(STOP_RECORDING_SOUND);
        }
    }

    fn on_config_updated(&mut self) {
        let discarded = self.queue.clear();
        if discarded > 0 {
            self.metrics.record_dropped(discarded);
        }
        if self.file.is_some() {
            info!("StorageWorker: config updated, {} queued frames discarded", discarded);
            self.write_config_frame();
        }
    }

    fn write_config_frame(&mut self) {
        let frame = DataFrame::config(self.shared.clock.now_us(), self.shared.config.get());
        let mut buffer = self.pool.get();
        frame.write_to(&mut buffer);
        self.write_batch(&buffer, 1);
    }

    /// Writes one batch of queued frames, at most the byte budget, and
    /// flushes the file. Returns the number of frames taken off the queue.
    pub fn flush_queue(&mut self) -> usize {
        let mut buffer = self.pool.get();
        let mut taken = 0;
        while buffer.len() + MAX_FRAME_SIZE <= self.batch_bytes {
            match self.queue.try_dequeue() {
                Some(frame) => {
                    frame.write_to(&mut buffer);
                    taken += 1;
                }
                None => break,
            }
        }

        if taken > 0 {
            if self.file.is_some() {
                self.write_batch(&buffer, taken);
            } else {
                self.metrics.record_dropped(taken);
            }
        }
        taken
    }

    fn write_batch(&mut self, bytes: &[u8], frames: usize) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        match file.write(bytes).and_then(|written| file.flush().map(|()| written)) {
            Ok(written) => {
                if written < bytes.len() {
                    warn!("StorageWorker: short write {} of {} bytes", written, bytes.len());
                }
                self.file_bytes += written as u64;
                self.metrics.record_bytes(written);
                self.metrics.record_delivered(frames);
            }
            Err(e) => {
                error!("StorageWorker: write to {} failed: {:#}", file.name(), e);
                self.metrics.record_error();
            }
        }
    }
}

impl Runnable for StorageWorker {
    fn on_command(&mut self, command: BaseCommand) {
        match command {
            BaseCommand::ConfigUpdated => self.on_config_updated(),
        }
    }

    fn step(&mut self) {
        self.pacer.wait();
        while let Some(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
        let start = self.metrics.start_processing();
        if self.flush_queue() > 0 {
            self.metrics.finish_processing(start);
        }
    }

    fn teardown(&mut self) {
        self.stop_recording();
    }
}
