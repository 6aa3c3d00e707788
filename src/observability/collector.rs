use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use super::TaskMetrics;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub task_name: String,
    pub frames_published: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub bytes_out: u64,
    pub errors_count: u64,
    pub avg_latency_us: u64,
}

#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: BTreeMap<String, Arc<TaskMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_name: impl Into<String>, metrics: Arc<TaskMetrics>) {
        self.metrics.insert(task_name.into(), metrics);
    }

    /// Creates and registers counters for `task_name`
    pub fn track(&mut self, task_name: &str) -> Arc<TaskMetrics> {
        let metrics = Arc::new(TaskMetrics::new(task_name));
        self.register(task_name, metrics.clone());
        metrics
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(name, metrics)| {
                (
                    name.clone(),
                    MetricsSnapshot {
                        task_name: metrics.task_name().to_string(),
                        frames_published: metrics.frames_published(),
                        frames_delivered: metrics.frames_delivered(),
                        frames_dropped: metrics.frames_dropped(),
                        bytes_out: metrics.bytes_out(),
                        errors_count: metrics.errors_count(),
                        avg_latency_us: metrics.avg_latency_us(),
                    },
                )
            })
            .collect()
    }
}
