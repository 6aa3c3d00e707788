use log::debug;
use std::sync::{Arc, Mutex};

use super::queue::{QueueHandle, QueueId};
use crate::core::DataFrame;
use crate::observability::TaskMetrics;

/// Set of consumer queues a sensor publishes into.
///
/// Registration may change at any time from any thread; a publish sees
/// either the old or the new set, never a partial one.
#[derive(Clone)]
pub struct FanOut {
    queues: Arc<Mutex<Vec<QueueHandle>>>,
    metrics: Arc<TaskMetrics>,
}

impl FanOut {
    pub fn new(metrics: Arc<TaskMetrics>) -> Self {
        Self {
            queues: Arc::new(Mutex::new(Vec::new())),
            metrics,
        }
    }

    /// Adds a consumer. Registering the same queue twice delivers twice.
    pub fn register(&self, queue: &QueueHandle) -> bool {
        let mut queues = self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        queues.push(queue.clone());
        true
    }

    /// Removes every registration of `queue`; false if none existed.
    pub fn unregister(&self, queue: &QueueHandle) -> bool {
        let mut queues = self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = queues.len();
        queues.retain(|q| q.id() != queue.id());
        queues.len() != before
    }

    pub fn is_registered(&self, id: QueueId) -> bool {
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|q| q.id() == id)
    }

    pub fn len(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offers an independent copy of `frame` to every registered queue
    /// without blocking. Returns true only if every queue accepted it;
    /// false when nothing is registered.
    pub fn send_data(&self, frame: &DataFrame) -> bool {
        let queues = self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if queues.is_empty() {
            return false;
        }

        let mut all_accepted = true;
        for queue in queues.iter() {
            if queue.try_send(frame.clone()).is_err() {
                debug!("{}: queue '{}' full, frame dropped", self.metrics.task_name(), queue.name());
                self.metrics.record_dropped(1);
                all_accepted = false;
            }
        }
        if all_accepted {
            self.metrics.record_published();
        }
        all_accepted
    }

    /// Publishes where every consumer accepted the frame
    pub fn sent_count(&self) -> u64 {
        self.metrics.frames_published()
    }

    pub fn metrics(&self) -> &Arc<TaskMetrics> {
        &self.metrics
    }
}
