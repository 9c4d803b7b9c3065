// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Revision history state machine.
//!
//! Given a `Capp` and the revisions that belong to it, [`decide`] returns
//! the single action that brings the history up to date. It is pure: the
//! revision reconciler executes the action against the store.
//!
//! # States
//!
//! | History | Latest revision vs. current spec | Action |
//! |---|---|---|
//! | empty | - | [`RevisionAction::CreateFirst`] |
//! | non-empty | equivalent, fully owned | [`RevisionAction::NoOp`] |
//! | non-empty | equivalent, ownership partly lost | [`RevisionAction::Adopt`] |
//! | non-empty | different | [`RevisionAction::Append`] |
//!
//! Specs are compared after [`normalized_spec`]: a TLS secret has no effect
//! while TLS is disabled, so it is ignored then. Labels and annotations are
//! stored in each snapshot but never compared.

use crate::constants::FIRST_REVISION_NUMBER;
use crate::crd::{Capp, CappRevision, CappSpec};
use crate::labels::CAPP_RESOURCE_KEY;
use kube::ResourceExt;

/// What to do with the revision history of a `Capp`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevisionAction {
    /// No history yet: snapshot the spec as revision 1.
    CreateFirst,
    /// The latest revision already matches.
    NoOp,
    /// The latest revision matches but lost its ownership label or owner
    /// reference: repair it in place, no new lineage point.
    Adopt { name: String },
    /// The spec changed: snapshot it as `number` and delete `prune`, the
    /// oldest revisions beyond the retention bound.
    Append { number: i64, prune: Vec<String> },
}

/// Name of revision `number` of the `Capp` named `capp_name`.
#[must_use]
pub fn revision_name(capp_name: &str, number: i64) -> String {
    format!("{capp_name}-v{number}")
}

/// `spec` with fields that have no effect cleared.
#[must_use]
pub fn normalized_spec(spec: &CappSpec) -> CappSpec {
    let mut normalized = spec.clone();
    if !normalized.route_spec.tls_enabled {
        normalized.route_spec.tls_secret.clear();
    }
    normalized
}

/// Semantic equality of two specs.
#[must_use]
pub fn specs_equivalent(a: &CappSpec, b: &CappSpec) -> bool {
    normalized_spec(a) == normalized_spec(b)
}

fn has_label(revision: &CappRevision, capp: &Capp) -> bool {
    revision.labels().get(CAPP_RESOURCE_KEY) == Some(&capp.name_any())
}

fn has_owner_reference(revision: &CappRevision, capp: &Capp) -> bool {
    let Some(uid) = capp.uid() else {
        return false;
    };
    revision
        .owner_references()
        .iter()
        .any(|owner| owner.uid == uid)
}

/// `true` when `revision` carries both the ownership label and an owner
/// reference to `capp`. A `Capp` without a uid cannot be referenced, so the
/// label alone counts then.
#[must_use]
pub fn is_fully_owned(revision: &CappRevision, capp: &Capp) -> bool {
    has_label(revision, capp) && (capp.uid().is_none() || has_owner_reference(revision, capp))
}

/// Revisions of `capp` among `candidates`, oldest first.
///
/// A revision belongs to a `Capp` if it carries its ownership label or an
/// owner reference to it.
#[must_use]
pub fn owned_revisions(capp: &Capp, candidates: Vec<CappRevision>) -> Vec<CappRevision> {
    let mut owned: Vec<CappRevision> = candidates
        .into_iter()
        .filter(|r| has_label(r, capp) || has_owner_reference(r, capp))
        .collect();
    owned.sort_by_key(|r| r.spec.revision_number);
    owned
}

/// Decide the next step for the history `revisions` of `capp`.
///
/// `revisions` must be sorted oldest first, as [`owned_revisions`] returns
/// them. `keep` is the retention bound, at least 1.
#[must_use]
pub fn decide(capp: &Capp, revisions: &[CappRevision], keep: usize) -> RevisionAction {
    let Some(latest) = revisions.last() else {
        return RevisionAction::CreateFirst;
    };

    if specs_equivalent(&latest.spec.capp_template.spec, &capp.spec) {
        if is_fully_owned(latest, capp) {
            return RevisionAction::NoOp;
        }
        return RevisionAction::Adopt {
            name: latest.name_any(),
        };
    }

    let keep = keep.max(1);
    let excess = (revisions.len() + 1).saturating_sub(keep);
    RevisionAction::Append {
        number: latest
            .spec
            .revision_number
            .max(FIRST_REVISION_NUMBER - 1)
            + 1,
        prune: revisions
            .iter()
            .take(excess)
            .map(ResourceExt::name_any)
            .collect(),
    }
}

#[cfg(test)]
#[path = "revisions_tests.rs"]
mod revisions_tests;
