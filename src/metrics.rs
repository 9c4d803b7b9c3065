// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Capp operator.
//!
//! All metrics carry the `capp_operator_` prefix and live in
//! [`METRICS_REGISTRY`], which the admin server exposes on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation** - outcomes, durations and requeues per controller
//! - **Dependents** - creates, updates, deletes and deferred prunes per kind
//! - **Revisions** - snapshots appended and pruned
//! - **Leader Election** - whether this replica is the active one
//!
//! # Example
//!
//! ```rust,no_run
//! use capp_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Capp", std::time::Duration::from_millis(120));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "capp_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by controller and outcome
///
/// Labels:
/// - `controller`: `Capp` or `CappRevision`
/// - `status`: `success`, `error` or `requeue`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by controller and status",
    );
    let counter = CounterVec::new(opts, &["controller", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by controller",
    )
    .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["controller"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeues
///
/// Labels:
/// - `controller`: `Capp` or `CappRevision`
/// - `reason`: `conflict`, `error` or `timeout`
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeues by controller and reason",
    );
    let counter = CounterVec::new(opts, &["controller", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of errors by controller and error category
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by controller and error category",
    );
    let counter = CounterVec::new(opts, &["controller", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Dependent Object Metrics
// ============================================================================

/// Dependent objects written, by kind and action
///
/// Labels:
/// - `kind`: `DomainMapping`, `Certificate`, `CNAMERecord`
/// - `action`: `create`, `update`, `delete`
pub static DEPENDENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dependents_total"),
        "Dependent objects written by kind and action",
    );
    let counter = CounterVec::new(opts, &["kind", "action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Certificate prunes postponed because the new DNS record is not resolvable yet
pub static DEFERRED_PRUNES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_deferred_prunes_total"),
        "Stale dependent prunes postponed until the replacement is ready",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Revision Metrics
// ============================================================================

/// Revision history operations
///
/// Labels:
/// - `action`: `created`, `adopted`, `pruned`
pub static REVISIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_revisions_total"),
        "CappRevision operations by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Leader Election Metrics
// ============================================================================

/// 1 while this replica holds the leader lease, 0 otherwise
pub static LEADER_STATUS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Current leader election status (1 = leader, 0 = follower)",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `controller` - The controller that ran (e.g., `Capp`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `controller` - The controller that requeued
/// * `reason` - `conflict`, `error` or `timeout`
pub fn record_reconciliation_requeue(controller: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "requeue"])
        .inc();
    REQUEUE_TOTAL.with_label_values(&[controller, reason]).inc();
}

/// Record an error
pub fn record_error(controller: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[controller, error_type])
        .inc();
}

/// Record a write to a dependent object
pub fn record_dependent(kind: &str, action: &str) {
    DEPENDENTS_TOTAL.with_label_values(&[kind, action]).inc();
}

/// Record a prune postponed until the replacement is ready
pub fn record_deferred_prune(kind: &str) {
    DEFERRED_PRUNES_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a revision history operation
pub fn record_revision(action: &str) {
    REVISIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Record whether this replica currently leads
pub fn record_leader_status(is_leader: bool) {
    LEADER_STATUS.set(if is_leader { 1.0 } else { 0.0 });
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
