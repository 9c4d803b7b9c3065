// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CappRevision` history maintenance.
//!
//! Runs only when the spec, labels or annotations of a `Capp` changed since
//! the last successful pass, as reported by the context's
//! [`ChangeTracker`](super::changes::ChangeTracker). The action itself comes
//! from [`revisions::decide`](super::revisions::decide); this module executes
//! it and keeps `status.revisionInfo` pointing at the head of the history.

use super::revisions::{decide, owned_revisions, revision_name, RevisionAction};
use super::{requeue_on_conflict, Outcome};
use crate::constants::{CAPP_REVISION_CONTROLLER_NAME, FIRST_REVISION_NUMBER, KIND_CAPP_REVISION};
use crate::context::Context;
use crate::crd::{Capp, CappRevision, CappRevisionSpec, CappTemplate, RevisionInfo};
use crate::errors::{ReconcileError, StoreError};
use crate::events::Notification;
use crate::labels::{ownership_labels, EVENT_REVISION_CREATED, EVENT_REVISION_CREATION_FAILED};
use crate::metrics;
use crate::store::ObjectStore;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Bring the revision history of the `Capp` `namespace`/`name` up to date.
///
/// # Errors
///
/// - [`ReconcileError::Fetch`] if the `Capp` cannot be read
/// - [`ReconcileError::Revision`] if listing, creating, updating or pruning
///   revisions fails
/// - [`ReconcileError::Status`] if `status.revisionInfo` cannot be written
///
/// Conflicts are never returned; they yield [`Outcome::RequeueAfter`]. A
/// revision name already taken by an object the `Capp` does not own is
/// returned as [`ReconcileError::Revision`].
pub async fn reconcile_capp_revision<S: ObjectStore>(
    ctx: &Context<S>,
    namespace: &str,
    name: &str,
) -> Result<Outcome, ReconcileError> {
    let result = reconcile_capp_revision_inner(ctx, namespace, name).await;
    requeue_on_conflict(
        CAPP_REVISION_CONTROLLER_NAME,
        result,
        ctx.config.conflict_requeue,
    )
}

async fn reconcile_capp_revision_inner<S: ObjectStore>(
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
        // Revisions go with the Capp through their owner references.
        ctx.revision_tracker.forget(namespace, name);
        return Ok(Outcome::Done);
    };

    if capp.metadata.deletion_timestamp.is_some() {
        return Ok(Outcome::Done);
    }

    let changes = ctx.revision_tracker.classify(&capp);
    if !changes.triggers_revision() {
        debug!(
            "Capp {}/{} has no spec, label or annotation change, skipping revisions",
            namespace, name
        );
        return Ok(Outcome::Done);
    }
    debug!(?changes, "Reconciling revisions of Capp {}/{}", namespace, name);

    let revision_error = |source: StoreError| ReconcileError::Revision {
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    };

    let candidates: Vec<CappRevision> = ctx
        .store
        .list(namespace, &BTreeMap::new())
        .await
        .map_err(revision_error)?;
    let revisions = owned_revisions(&capp, candidates);

    let action = decide(&capp, &revisions, ctx.config.revisions_to_keep);
    let head = apply(ctx, &capp, &revisions, &action)
        .await
        .map_err(revision_error)?;

    sync_revision_info(ctx, &capp, head)
        .await
        .map_err(|source| ReconcileError::Status {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        })?;

    ctx.revision_tracker.record(&capp);
    Ok(Outcome::Done)
}

/// Execute `action`, returning the revision info the history ends up with.
async fn apply<S: ObjectStore>(
    ctx: &Context<S>,
    capp: &Capp,
    revisions: &[CappRevision],
    action: &RevisionAction,
) -> Result<Option<RevisionInfo>, StoreError> {
    let count = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
    let namespace = capp.namespace_or_default();

    match action {
        RevisionAction::NoOp => {
            debug!(
                "Revision history of Capp {}/{} is up to date",
                namespace,
                capp.name_any()
            );
            Ok(revisions.last().map(|latest| RevisionInfo {
                latest_revision: latest.name_any(),
                revision_count: count(revisions.len()),
            }))
        }
        RevisionAction::CreateFirst => {
            let created = create_revision(ctx, capp, FIRST_REVISION_NUMBER).await?;
            metrics::record_revision("create");
            Ok(Some(RevisionInfo {
                latest_revision: created.name_any(),
                revision_count: 1,
            }))
        }
        RevisionAction::Append { number, prune } => {
            let created = create_revision(ctx, capp, *number).await?;
            metrics::record_revision("append");
            for stale in prune {
                match ctx.store.delete::<CappRevision>(&namespace, stale).await {
                    Ok(()) | Err(StoreError::NotFound { .. }) => {
                        info!("Pruned CappRevision {}/{}", namespace, stale);
                        metrics::record_revision("prune");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(Some(RevisionInfo {
                latest_revision: created.name_any(),
                revision_count: count(revisions.len() + 1 - prune.len()),
            }))
        }
        RevisionAction::Adopt { name } => {
            let Some(mut revision) = revisions.iter().find(|r| r.name_any() == *name).cloned()
            else {
                return Ok(None);
            };
            revision
                .labels_mut()
                .extend(ownership_labels(&capp.name_any()));
            if let Some(owner) = capp.controller_owner_ref(&()) {
                // At most one controller reference: a stale one from an
                // earlier Capp of the same name is replaced.
                let references = revision.owner_references_mut();
                references.retain(|r| r.controller != Some(true) || r.uid == owner.uid);
                if !references.iter().any(|r| r.uid == owner.uid) {
                    references.push(owner);
                }
            }
            let adopted = ctx.store.update(&revision).await?;
            info!("Adopted CappRevision {}/{}", namespace, adopted.name_any());
            metrics::record_revision("adopt");
            Ok(Some(RevisionInfo {
                latest_revision: adopted.name_any(),
                revision_count: count(revisions.len()),
            }))
        }
    }
}

/// The revision numbered `number` of `capp`, snapshotting its current state.
#[must_use]
pub fn build_revision(capp: &Capp, number: i64) -> CappRevision {
    CappRevision {
        metadata: ObjectMeta {
            name: Some(revision_name(&capp.name_any(), number)),
            namespace: capp.namespace(),
            labels: Some(ownership_labels(&capp.name_any())),
            owner_references: capp.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: CappRevisionSpec {
            revision_number: number,
            capp_template: CappTemplate {
                spec: capp.spec.clone(),
                labels: capp.labels().clone(),
                annotations: capp.annotations().clone(),
            },
        },
    }
}

async fn create_revision<S: ObjectStore>(
    ctx: &Context<S>,
    capp: &Capp,
    number: i64,
) -> Result<CappRevision, StoreError> {
    let desired = build_revision(capp, number);
    let name = desired.name_any();
    match ctx.store.create(&desired).await {
        Ok(created) => {
            info!(
                "Created {} {}/{}",
                KIND_CAPP_REVISION,
                capp.namespace_or_default(),
                name
            );
            ctx.recorder
                .publish(
                    capp,
                    Notification::normal(
                        EVENT_REVISION_CREATED,
                        format!("Created {KIND_CAPP_REVISION} {name}"),
                    ),
                )
                .await;
            Ok(created)
        }
        Err(e) => {
            ctx.recorder
                .publish(
                    capp,
                    Notification::warning(
                        EVENT_REVISION_CREATION_FAILED,
                        format!("Failed to create {KIND_CAPP_REVISION} {name}"),
                    ),
                )
                .await;
            Err(e)
        }
    }
}

/// Write `head` to `status.revisionInfo` when it differs.
async fn sync_revision_info<S: ObjectStore>(
    ctx: &Context<S>,
    capp: &Capp,
    head: Option<RevisionInfo>,
) -> Result<(), StoreError> {
    let current = capp.status.as_ref().and_then(|s| s.revision_info.clone());
    if head.is_none() || current == head {
        return Ok(());
    }
    let mut updated = capp.clone();
    updated.status.get_or_insert_with(Default::default).revision_info = head;
    ctx.store.update_status(&updated).await?;
    Ok(())
}

#[cfg(test)]
#[path = "capp_revision_tests.rs"]
mod capp_revision_tests;
