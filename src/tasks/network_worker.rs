use crossbeam_channel::Receiver;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

use super::tone::{ToneHandle, START_STREAMING_SOUND, STOP_STREAMING_SOUND};
use super::Shared;
use crate::buffers::BufferPool;
use crate::core::{DataFrame, Superframe, HEADER_SIZE, MAX_FRAME_SIZE, MAX_SUBFRAMES};
use crate::engine::{BaseCommand, FrameQueue, Pacer, QueueHandle, Runnable};
use crate::hal::{ClientId, Transport, TransportEvent};
use crate::observability::TaskMetrics;

/// Streams queued frames to connected clients as superframes.
///
/// Each iteration drains the whole queue; the frames are packed into
/// superframes of at most 255 sub-frames stamped with the send time.
/// With no client connected the drained frames are discarded.
pub struct NetworkWorker {
    queue: FrameQueue,
    transport: Arc<dyn Transport>,
    events: Receiver<TransportEvent>,
    shared: Shared,
    metrics: Arc<TaskMetrics>,
    pool: BufferPool,
    batch: Vec<DataFrame>,
    pacer: Pacer,
    tones: Option<ToneHandle>,
}

impl NetworkWorker {
    pub fn new(
        queue: FrameQueue,
        transport: Arc<dyn Transport>,
        events: Receiver<TransportEvent>,
        shared: Shared,
        metrics: Arc<TaskMetrics>,
        period: Duration,
    ) -> Self {
        Self {
            queue,
            transport,
            events,
            shared,
            metrics,
            pool: BufferPool::new(HEADER_SIZE + MAX_SUBFRAMES * MAX_FRAME_SIZE),
            batch: Vec::with_capacity(MAX_SUBFRAMES),
            pacer: Pacer::new(period),
            tones: None,
        }
    }

    pub fn with_tones(mut self, tones: ToneHandle) -> Self {
        self.tones = Some(tones);
        self
    }

    /// Handle to register on every sensor's fan-out
    pub fn queue_handle(&self) -> QueueHandle {
        self.queue.handle()
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(client) => {
                let was_streaming = self.shared.state.set_streaming(true);
                info!("NetworkWorker: client {} connected", client);
                self.send_config_to(client);
                if !was_streaming {
                    if let Some(tones) = &self.tones {
                        tones.play(START_STREAMING_SOUND);
                    }
                }
            }
            TransportEvent::Disconnected(client) => {
                info!("NetworkWorker: client {} disconnected", client);
                if self.transport.connected_clients() == 0 && self.shared.state.set_streaming(false) {
                    if let Some(tones) = &self.tones {
                        tones.play(STOP_STREAMING_SOUND);
                    }
                }
            }
        }
    }

    /// Handles pending connection events
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    fn config_frame(&self) -> Vec<u8> {
        DataFrame::config(self.shared.clock.now_us(), self.shared.config.get()).to_bytes()
    }

    fn send_config_to(&self, client: ClientId) {
        if !self.transport.send_to(client, &self.config_frame()) {
            debug!("NetworkWorker: config not delivered to client {}", client);
        }
    }

    fn on_config_updated(&mut self) {
        let discarded = self.queue.clear();
        if discarded > 0 {
            self.metrics.record_dropped(discarded);
        }
        if self.transport.connected_clients() > 0 {
            let delivered = self.transport.send_to_all(&self.config_frame());
            info!("NetworkWorker: config sent to {} clients", delivered);
        }
    }

    /// Drains the queue. Returns the number of superframes sent.
    pub fn flush_queue(&mut self) -> usize {
        let mut sent = 0;
        loop {
            self.batch.clear();
            while self.batch.len() < MAX_SUBFRAMES {
                match self.queue.try_dequeue() {
                    Some(frame) => self.batch.push(frame),
                    None => break,
                }
            }
            let drained = self.batch.len();
            if drained == 0 {
                break;
            }

            if self.transport.connected_clients() == 0 {
                self.metrics.record_dropped(drained);
            } else {
                let mut buffer = self.pool.get();
                match Superframe::encode_into(self.shared.clock.now_us(), &self.batch, &mut buffer) {
                    Ok(len) => {
                        let clients = self.transport.send_to_all(&buffer);
                        debug!("NetworkWorker: {} frames to {} clients", drained, clients);
                        self.metrics.record_delivered(drained);
                        self.metrics.record_bytes(len);
                        sent += 1;
                    }
                    Err(e) => {
                        error!("NetworkWorker: superframe encoding failed: {}", e);
                        self.metrics.record_error();
                    }
                }
            }

            if drained < MAX_SUBFRAMES {
                break;
            }
        }
        sent
    }
}

impl Runnable for NetworkWorker {
    fn on_command(&mut self, command: BaseCommand) {
        match command {
            BaseCommand::ConfigUpdated => self.on_config_updated(),
        }
    }

    fn step(&mut self) {
        self.pacer.wait();
        self.poll_events();
        let start = self.metrics.start_processing();
        if self.flush_queue() > 0 {
            self.metrics.finish_processing(start);
        }
    }
}
