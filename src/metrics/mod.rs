//! Prometheus metrics for roster generation and the assignment lifecycle
//!
//! This module provides metrics tracking for:
//! - Generation: runs, events created, dates skipped, slots by selection tier, run duration
//! - Lifecycle: actions by kind and result
//! - Notifications: deliveries by channel and result
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, or never happens, metrics operations are no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

use crate::models::ActionKind;
use crate::scheduler::{GenerationReport, SelectionTier};

// ============================================================================
// Metrics Storage
// ============================================================================

struct RotaMetrics {
    generation_runs: Counter,
    events_created: Counter,
    dates_skipped: Counter,
    slots_filled: CounterVec,
    generation_duration: Histogram,
    actions: CounterVec,
    deliveries: CounterVec,
}

static METRICS: OnceLock<RotaMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Register all metrics with the default registry
///
/// Safe to call more than once; only the first call registers.
///
/// ```ignore
/// if let Err(e) = rota::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = RotaMetrics {
        generation_runs: register_counter!(
            "rota_generation_runs_total",
            "Total number of roster generation runs"
        )?,
        events_created: register_counter!(
            "rota_generation_events_created_total",
            "Total events created by roster generation"
        )?,
        dates_skipped: register_counter!(
            "rota_generation_dates_skipped_total",
            "Total candidate dates skipped because an event already existed"
        )?,
        slots_filled: register_counter_vec!(
            "rota_generation_slots_total",
            "Role slots filled by generation, by selection tier",
            &["tier"]
        )?,
        generation_duration: register_histogram!(
            "rota_generation_duration_seconds",
            "Roster generation run duration in seconds",
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
        )?,
        actions: register_counter_vec!(
            "rota_lifecycle_actions_total",
            "Lifecycle actions by kind and result",
            &["action", "result"]
        )?,
        deliveries: register_counter_vec!(
            "rota_notification_deliveries_total",
            "Notification deliveries by channel and result",
            &["channel", "result"]
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "metrics already initialized")?;
    Ok(())
}

pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
    }
}

pub fn start_generation_timer() -> MetricsTimer {
    MetricsTimer {
        timer: METRICS.get().map(|m| m.generation_duration.start_timer()),
    }
}

pub fn record_generation_run(report: &GenerationReport) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.generation_runs.inc();
    m.events_created.inc_by(report.created.len() as f64);
    m.dates_skipped.inc_by(report.skipped.len() as f64);
}

pub fn record_slot(tier: SelectionTier) {
    if let Some(m) = METRICS.get() {
        m.slots_filled.with_label_values(&[tier.as_str()]).inc();
    }
}

/// Record a lifecycle action; `result` is `applied`, `rejected` or `error`
pub fn record_action(action: ActionKind, result: &str) {
    if let Some(m) = METRICS.get() {
        m.actions
            .with_label_values(&[action.as_str(), result])
            .inc();
    }
}

pub fn record_delivery(channel: &str, success: bool) {
    if let Some(m) = METRICS.get() {
        let result = if success { "success" } else { "failure" };
        m.deliveries.with_label_values(&[channel, result]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
