// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Capp` reconciliation: dependents and route status.
//!
//! One pass fetches the `Capp` once and hands it to every resource manager in
//! order. All managers run even when an earlier one fails; their errors are
//! aggregated. The status is then refreshed from the observed `DomainMapping`
//! and written only if it changed.

use super::route_status::observe_route_status;
use super::status::{
    conditions_changed, status_changed, update_condition_in_memory, CONDITION_TYPE_READY,
    REASON_DEPENDENTS_FAILED, REASON_DEPENDENTS_READY,
};
use super::{requeue_on_conflict, Outcome};
use crate::constants::CAPP_CONTROLLER_NAME;
use crate::context::Context;
use crate::crd::{Capp, CappStatus, RouteStatus};
use crate::errors::{ManagerError, ReconcileError};
use crate::store::ObjectStore;
use tracing::{debug, error, info};

/// Reconcile the `Capp` `namespace`/`name`.
///
/// A `Capp` that no longer exists or is being deleted needs nothing: its
/// dependents carry no finalizers and are garbage collected with it.
///
/// # Errors
///
/// - [`ReconcileError::Fetch`] if the `Capp` cannot be read
/// - [`ReconcileError::Managers`] if any resource manager failed
/// - [`ReconcileError::Status`] if the status cannot be refreshed
///
/// Conflicts are never returned; they yield [`Outcome::RequeueAfter`].
pub async fn reconcile_capp<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<Outcome, ReconcileError> {
    let result = reconcile_capp_inner(ctx, namespace, name).await;
    requeue_on_conflict(CAPP_CONTROLLER_NAME, result, ctx.config.conflict_requeue)
}

async fn reconcile_capp_inner<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<Outcome, ReconcileError> {
    let capp = ctx
        .store
        .get::<Capp>(namespace, name)
        .await
        .map_err(|source| ReconcileError::Fetch {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

    let Some(capp) = capp else {
        debug!("Capp {}/{} no longer exists", namespace, name);
        return Ok(Outcome::Done);
    };

    if capp.metadata.deletion_timestamp.is_some() {
        debug!("Capp {}/{} is being deleted, skipping", namespace, name);
        return Ok(Outcome::Done);
    }

    info!("Reconciling Capp: {}/{}", namespace, name);

    let mut failures = Vec::new();
    for manager in &ctx.managers {
        debug!(kind = manager.kind(), "Running resource manager");
        if let Err(e) = manager.manage(&capp).await {
            error!(
                "Resource manager {} failed for Capp {}/{}: {}",
                manager.kind(),
                namespace,
                name,
                e
            );
            failures.push(e);
        }
    }

    // A conflict means our view is stale; requeue before writing status from it.
    if failures.iter().any(ManagerError::is_conflict) {
        return Err(ReconcileError::Managers {
            namespace: namespace.to_string(),
            name: name.to_string(),
            errors: failures,
        });
    }

    let route_status = observe_route_status(&ctx.store, &capp)
        .await
        .map_err(|source| ReconcileError::Status {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

    let desired = desired_status(&capp, route_status, &failures);
    if status_needs_update(capp.status.as_ref(), &desired) {
        let mut updated = capp.clone();
        updated.status = Some(desired);
        ctx.store
            .update_status(&updated)
            .await
            .map_err(|source| ReconcileError::Status {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?;
        debug!("Updated status of Capp {}/{}", namespace, name);
    } else {
        debug!("Status of Capp {}/{} unchanged, skipping update", namespace, name);
    }

    if failures.is_empty() {
        Ok(Outcome::Done)
    } else {
        Err(ReconcileError::Managers {
            namespace: namespace.to_string(),
            name: name.to_string(),
            errors: failures,
        })
    }
}

/// Status `capp` should carry after a pass with the given manager `failures`.
///
/// `revisionInfo` belongs to the revision controller and is kept as is.
#[must_use]
pub fn desired_status(
    capp: &Capp,
    route_status: RouteStatus,
    failures: &[ManagerError],
) -> CappStatus {
    let mut status = capp.status.clone().unwrap_or_default();
    status.route_status = route_status;
    status.observed_generation = capp.metadata.generation;

    if failures.is_empty() {
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            "True",
            REASON_DEPENDENTS_READY,
            "All dependents reconciled",
        );
    } else {
        let kinds: Vec<&str> = failures.iter().map(|f| f.kind.as_str()).collect();
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_TYPE_READY,
            "False",
            REASON_DEPENDENTS_FAILED,
            &format!("Failed to reconcile {}", kinds.join(", ")),
        );
    }
    status
}

/// Whether `desired` differs from `current` in anything but condition timestamps.
#[must_use]
pub fn status_needs_update(current: Option<&CappStatus>, desired: &CappStatus) -> bool {
    let Some(current) = current else {
        return true;
    };
    current.route_status != desired.route_status
        || conditions_changed(&current.conditions, &desired.conditions)
        || status_changed(&current.observed_generation, &desired.observed_generation)
}

#[cfg(test)]
#[path = "capp_tests.rs"]
mod capp_tests;
