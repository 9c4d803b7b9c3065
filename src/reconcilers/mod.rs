// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `Capp` resources.
//!
//! Two controllers watch `Capp`s independently:
//!
//! 1. **Capp controller** ([`reconcile_capp`]) - runs every resource manager in
//!    a fixed order (domain mapping, certificate, DNS record), then refreshes
//!    the route status from the observed `DomainMapping`.
//! 2. **Revision controller** ([`reconcile_capp_revision`]) - when the spec,
//!    labels or annotations changed, brings the `CappRevision` history up to
//!    date.
//!
//! Both return an [`Outcome`] instead of an action so they stay independent of
//! the controller runtime. Optimistic-concurrency conflicts become a timed
//! requeue; every other failure is surfaced as a
//! [`ReconcileError`](crate::errors::ReconcileError).
//!
//! # Example: Reconciling against the in-memory store
//!
//! ```rust,no_run
//! use capp_operator::config::ControllerConfig;
//! use capp_operator::context::Context;
//! use capp_operator::events::MemoryRecorder;
//! use capp_operator::reconcilers::reconcile_capp;
//! use capp_operator::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), capp_operator::errors::ReconcileError> {
//! let ctx = Context::new(
//!     MemoryStore::new(),
//!     Arc::new(MemoryRecorder::new()),
//!     ControllerConfig::default(),
//! );
//! reconcile_capp(&ctx, "apps", "web").await?;
//! # Ok(())
//! # }
//! ```

pub mod capp;
pub mod capp_revision;
pub mod changes;
pub mod managers;
pub mod resource_client;
pub mod revisions;
pub mod route_status;
pub mod status;

pub use capp::reconcile_capp;
pub use capp_revision::reconcile_capp_revision;

use crate::errors::ReconcileError;
use crate::metrics;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Result of a successful reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Converged; wait for the next notification.
    Done,
    /// Retry after the delay, without surfacing an error.
    RequeueAfter(Duration),
}

/// Turn an optimistic-concurrency conflict into a timed requeue.
///
/// Any other error is returned unchanged.
pub(crate) fn requeue_on_conflict(
    controller: &str,
    result: Result<Outcome, ReconcileError>,
    delay: Duration,
) -> Result<Outcome, ReconcileError> {
    match result {
        Err(e) if e.is_conflict() => {
            info!(
                "{} hit a conflict, requeueing in {}s: {}",
                controller,
                delay.as_secs(),
                e
            );
            metrics::record_reconciliation_requeue(controller, "conflict");
            Ok(Outcome::RequeueAfter(delay))
        }
        other => other,
    }
}

/// Run `reconciliation` for `namespace`/`name` with a deadline.
///
/// On expiry the future is dropped, cancelling any in-flight store call, and
/// [`ReconcileError::Timeout`] is returned so the error policy requeues.
///
/// # Errors
///
/// Returns the reconciliation's own error, or [`ReconcileError::Timeout`].
pub async fn with_deadline<F>(
    deadline: Duration,
    namespace: &str,
    name: &str,
    reconciliation: F,
) -> Result<Outcome, ReconcileError>
where
    F: Future<Output = Result<Outcome, ReconcileError>>,
{
    match tokio::time::timeout(deadline, reconciliation).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(
                "Reconciliation of Capp {}/{} exceeded {}s and was cancelled",
                namespace,
                name,
                deadline.as_secs()
            );
            Err(ReconcileError::Timeout {
                namespace: namespace.to_string(),
                name: name.to_string(),
                seconds: deadline.as_secs(),
            })
        }
    }
}
