use super::MetricsCollector;
use crate::engine::StateSnapshot;

/// Renders periodic human-readable status reports.
pub struct StatusMonitor {
    collector: MetricsCollector,
}

impl StatusMonitor {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }

    pub fn generate_report(&self, state: &StateSnapshot) -> String {
        let mut report = format!(
            "=== Status ===\nrecording: {}{}\nstreaming: {}\n",
            state.recording,
            if state.recording {
                format!(" ({})", state.filename)
            } else {
                String::new()
            },
            state.streaming
        );

        let snapshot = self.collector.snapshot();
        if snapshot.is_empty() {
            report.push_str("No tasks registered\n");
            return report;
        }

        for (name, metrics) in snapshot.iter() {
            report.push_str(&format!(
                "\n[{}]\n  Published: {}  Delivered: {}  Dropped: {}\n  Bytes out: {}\n  Errors: {}\n",
                name,
                metrics.frames_published,
                metrics.frames_delivered,
                metrics.frames_dropped,
                metrics.bytes_out,
                if metrics.errors_count > 0 {
                    format!("{} error{}", metrics.errors_count, if metrics.errors_count == 1 { "" } else { "s" })
                } else {
                    "0 errors".to_string()
                },
            ));
            if metrics.avg_latency_us > 0 {
                report.push_str(&format!("  Avg Latency: {}μs\n", metrics.avg_latency_us));
            }
        }

        report
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }
}
