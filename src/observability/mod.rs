pub mod metrics;
pub mod collector;
pub mod monitor;

pub use metrics::TaskMetrics;
pub use collector::{MetricsCollector, MetricsSnapshot};
pub use monitor::StatusMonitor;
