use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::DataFrame;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(u64);

/// Bounded queue of frames owned by one consumer.
pub struct FrameQueue {
    id: QueueId,
    name: Arc<str>,
    tx: Sender<DataFrame>,
    rx: Receiver<DataFrame>,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(name: &str, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            id: QueueId(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed)),
            name: Arc::from(name),
            tx,
            rx,
            capacity,
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Producer-side handle for registering with a fan-out
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            id: self.id,
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }

    /// Waits up to `timeout` for a frame. A zero timeout never blocks.
    pub fn dequeue(&self, timeout: Duration) -> Option<DataFrame> {
        if timeout.is_zero() {
            return self.try_dequeue();
        }
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_dequeue(&self) -> Option<DataFrame> {
        self.rx.try_recv().ok()
    }

    /// Discards everything queued, returning how many frames were dropped
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Cloneable sending side of a [`FrameQueue`]
#[derive(Clone)]
pub struct QueueHandle {
    id: QueueId,
    name: Arc<str>,
    tx: Sender<DataFrame>,
}

impl QueueHandle {
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking enqueue; hands the frame back when the queue is full
    pub fn try_send(&self, frame: DataFrame) -> Result<(), DataFrame> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(frame) | TrySendError::Disconnected(frame) => frame,
        })
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
