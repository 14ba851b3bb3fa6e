use anyhow::Result;
use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Metric names emitted by the console core
#[derive(Debug, Clone)]
pub struct ConsoleMetrics {
    // Repository metrics
    pub repository_calls_total: &'static str,
    pub repository_call_duration: &'static str,

    // Timetable metrics
    pub grid_builds_total: &'static str,
    pub slot_upserts_total: &'static str,
    pub grid_occupied_slots: &'static str,
    pub stale_fetches_discarded_total: &'static str,

    // Attendance metrics
    pub attendance_updates_total: &'static str,
    pub attendance_records_loaded: &'static str,

    // Marks config cache metrics
    pub cache_lookups_total: &'static str,

    // Export metrics
    pub export_operations_total: &'static str,
    pub export_file_size_bytes: &'static str,

    // Error metrics
    pub errors_total: &'static str,
}

impl Default for ConsoleMetrics {
    fn default() -> Self {
        Self {
            repository_calls_total: "campus_console_repository_calls_total",
            repository_call_duration: "campus_console_repository_call_duration_seconds",

            grid_builds_total: "campus_console_grid_builds_total",
            slot_upserts_total: "campus_console_slot_upserts_total",
            grid_occupied_slots: "campus_console_grid_occupied_slots",
            stale_fetches_discarded_total: "campus_console_stale_fetches_discarded_total",

            attendance_updates_total: "campus_console_attendance_updates_total",
            attendance_records_loaded: "campus_console_attendance_records_loaded",

            cache_lookups_total: "campus_console_cache_lookups_total",

            export_operations_total: "campus_console_export_operations_total",
            export_file_size_bytes: "campus_console_export_file_size_bytes",

            errors_total: "campus_console_errors_total",
        }
    }
}

impl ConsoleMetrics {
    /// Install the process-wide recorder
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record one repository round trip
    pub fn record_repository_call(&self, operation: &'static str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(self.repository_calls_total, "operation" => operation, "status" => status).increment(1);
        histogram!(self.repository_call_duration, "operation" => operation).record(duration.as_secs_f64());

        if !success {
            self.record_error("repository", operation);
        }
    }

    /// Record a grid rebuilt for a view and its occupancy
    pub fn record_grid_build(&self, view_kind: &'static str, occupied: usize) {
        counter!(self.grid_builds_total, "view" => view_kind).increment(1);
        gauge!(self.grid_occupied_slots, "view" => view_kind).set(occupied as f64);
    }

    /// Record the outcome of a slot upsert
    pub fn record_slot_upsert(&self, outcome: &'static str) {
        counter!(self.slot_upserts_total, "outcome" => outcome).increment(1);
    }

    /// A fetch result arrived after its selection was replaced
    pub fn record_stale_fetch(&self, view_kind: &'static str) {
        counter!(self.stale_fetches_discarded_total, "view" => view_kind).increment(1);
    }

    /// Record an attendance status change
    pub fn record_attendance_update(&self, status: &'static str) {
        counter!(self.attendance_updates_total, "status" => status).increment(1);
    }

    /// Size of the ledger just loaded
    pub fn record_attendance_loaded(&self, count: usize) {
        histogram!(self.attendance_records_loaded).record(count as f64);
    }

    /// Record a marks config cache hit or miss
    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        counter!(self.cache_lookups_total, "result" => result).increment(1);
    }

    /// Record a finished export
    pub fn record_export(&self, format: &'static str, size_bytes: u64) {
        counter!(self.export_operations_total, "format" => format).increment(1);
        histogram!(self.export_file_size_bytes, "format" => format).record(size_bytes as f64);
    }

    /// Record an error by kind
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(self.errors_total, "type" => error_type, "operation" => operation).increment(1);
    }
}

/// Times one repository call and reports it when finished
pub struct MetricsTimer<'a> {
    metrics: &'a ConsoleMetrics,
    operation: &'static str,
    start: Instant,
}

impl<'a> MetricsTimer<'a> {
    /// Start timing a repository call
    pub fn start(metrics: &'a ConsoleMetrics, operation: &'static str) -> Self {
        Self {
            metrics,
            operation,
            start: Instant::now(),
        }
    }

    /// Record the call's duration and outcome
    pub fn finish(self, success: bool) {
        self.metrics
            .record_repository_call(self.operation, self.start.elapsed(), success);
    }
}
