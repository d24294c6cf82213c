//! Collector metrics
//!
//! Holds the latest telemetry snapshot plus a few counters about the
//! telemetry link itself. Counters are plain atomics; the snapshot sits
//! behind a read-write lock that is only held to copy it in or out.

use parking_lot::RwLock;
use queuepilot::MetricsSnapshot;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// State exported by the collector
pub struct CollectorMetrics {
    start_time: Instant,

    /// Valid frames received
    pub frames_received: AtomicU64,
    /// Frames that could not be decoded
    pub frames_rejected: AtomicU64,
    /// Currently open telemetry connections
    pub active_connections: AtomicUsize,

    latest: RwLock<Option<MetricsSnapshot>>,
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames_received: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            active_connections: AtomicUsize::new(0),
            latest: RwLock::new(None),
        }
    }

    pub fn record_snapshot(&self, snapshot: MetricsSnapshot) {
        *self.latest.write() = Some(snapshot);
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Most recent valid snapshot, if any arrived yet
    pub fn latest(&self) -> Option<MetricsSnapshot> {
        *self.latest.read()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    ///
    /// Pipeline gauges are omitted until the first frame arrives.
    pub fn export_prometheus(&self) -> String {
        let mut output = String::with_capacity(1024);

        metric(
            &mut output,
            "queuepilot_collector_uptime_seconds",
            "gauge",
            "Time since collector start in seconds",
            self.uptime_seconds(),
        );
        metric(
            &mut output,
            "queuepilot_telemetry_frames_received_total",
            "counter",
            "Telemetry frames decoded successfully",
            self.frames_received.load(Ordering::Relaxed),
        );
        metric(
            &mut output,
            "queuepilot_telemetry_frames_rejected_total",
            "counter",
            "Telemetry frames that failed to decode",
            self.frames_rejected.load(Ordering::Relaxed),
        );
        metric(
            &mut output,
            "queuepilot_telemetry_connections_active",
            "gauge",
            "Currently open telemetry connections",
            self.active_connections.load(Ordering::Relaxed),
        );

        if let Some(snapshot) = self.latest() {
            metric(
                &mut output,
                "queuepilot_producer_rate",
                "gauge",
                "Producer rate in items per second",
                snapshot.producer_rate,
            );
            metric(
                &mut output,
                "queuepilot_produced_total",
                "gauge",
                "Items produced since pipeline start",
                snapshot.produced_total,
            );
            metric(
                &mut output,
                "queuepilot_consumed_total",
                "gauge",
                "Items consumed since pipeline start",
                snapshot.consumed_total,
            );
            metric(
                &mut output,
                "queuepilot_queue_occupancy",
                "gauge",
                "Items currently in the queue",
                snapshot.occupancy,
            );
            metric(
                &mut output,
                "queuepilot_queue_threshold",
                "gauge",
                "Occupancy above which the producer slows down",
                snapshot.queue_threshold,
            );
        }

        output
    }
}

fn metric(
    output: &mut String,
    name: &str,
    kind: &str,
    help: &str,
    value: impl std::fmt::Display,
) {
    // Writing to a String cannot fail
    let _ = write!(
        output,
        "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n\n"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_before_first_frame() {
        let metrics = CollectorMetrics::new();
        metrics.record_rejected();

        let output = metrics.export_prometheus();
        assert!(output.contains("queuepilot_collector_uptime_seconds"));
        assert!(output.contains("queuepilot_telemetry_frames_rejected_total 1"));
        assert!(output.contains("queuepilot_telemetry_frames_received_total 0"));
        assert!(!output.contains("queuepilot_queue_occupancy"));
        assert!(metrics.latest().is_none());
    }

    #[test]
    fn test_export_latest_snapshot() {
        let metrics = CollectorMetrics::new();
        metrics.record_snapshot(MetricsSnapshot {
            producer_rate: 10.0,
            produced_total: 50,
            consumed_total: 40,
            occupancy: 10,
            queue_threshold: 5,
        });
        metrics.record_snapshot(MetricsSnapshot {
            producer_rate: 9.0,
            produced_total: 60,
            consumed_total: 52,
            occupancy: 8,
            queue_threshold: 5,
        });

        let output = metrics.export_prometheus();
        assert!(output.contains("# TYPE queuepilot_producer_rate gauge"));
        assert!(output.contains("queuepilot_producer_rate 9\n"));
        assert!(output.contains("queuepilot_produced_total 60\n"));
        assert!(output.contains("queuepilot_consumed_total 52\n"));
        assert!(output.contains("queuepilot_queue_occupancy 8\n"));
        assert!(output.contains("queuepilot_queue_threshold 5\n"));
        assert!(output.contains("queuepilot_telemetry_frames_received_total 2\n"));
    }

    #[test]
    fn test_connection_gauge() {
        let metrics = CollectorMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();

        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 1);
        assert!(
            metrics
                .export_prometheus()
                .contains("queuepilot_telemetry_connections_active 1\n")
        );
    }
}
