// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Change classification for `Capp` notifications.
//!
//! The revision reconciler only cares about changes to the spec, the labels
//! or the annotations of a `Capp`. Status writes, resourceVersion bumps and
//! managed-fields churn must not wake it. [`classify_change`] compares those
//! three sub-trees of two versions of an object; [`ChangeTracker`] applies the
//! same comparison over a watch stream by remembering a SHA-256 fingerprint of
//! the last version handled per object.
//!
//! Fingerprints carry the object uid. A `Capp` deleted and recreated under the
//! same name is a new object and counts as changed everywhere, even when the
//! delete was never observed.

use crate::crd::Capp;
use kube::ResourceExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Which parts of a `Capp` changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub spec: bool,
    pub labels: bool,
    pub annotations: bool,
}

impl ChangeSet {
    /// Everything changed: used for objects seen for the first time.
    #[must_use]
    pub fn all() -> Self {
        Self {
            spec: true,
            labels: true,
            annotations: true,
        }
    }

    /// Whether the revision reconciler must run.
    #[must_use]
    pub fn triggers_revision(&self) -> bool {
        self.spec || self.labels || self.annotations
    }
}

/// Compare `old` and `new` on spec, labels and annotations.
///
/// With no `old` version, or an `old` with another uid, every part counts as
/// changed.
#[must_use]
pub fn classify_change(old: Option<&Capp>, new: &Capp) -> ChangeSet {
    match old {
        Some(old) if old.uid() == new.uid() => ChangeSet {
            spec: old.spec != new.spec,
            labels: old.labels() != new.labels(),
            annotations: old.annotations() != new.annotations(),
        },
        _ => ChangeSet::all(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Fingerprint {
    uid: Option<String>,
    spec: [u8; 32],
    labels: [u8; 32],
    annotations: [u8; 32],
}

fn digest<T: Serialize>(value: &T) -> [u8; 32] {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    Sha256::digest(bytes).into()
}

impl Fingerprint {
    fn of(capp: &Capp) -> Self {
        Self {
            uid: capp.uid(),
            spec: digest(&capp.spec),
            labels: digest(capp.labels()),
            annotations: digest(capp.annotations()),
        }
    }
}

/// Remembers the last handled version of each `Capp`.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct ChangeTracker {
    seen: Arc<Mutex<HashMap<(String, String), Fingerprint>>>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(capp: &Capp) -> (String, String) {
        (capp.namespace().unwrap_or_default(), capp.name_any())
    }

    /// What changed in `capp` since the last [`ChangeTracker::record`].
    #[must_use]
    pub fn classify(&self, capp: &Capp) -> ChangeSet {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let current = Fingerprint::of(capp);
        match seen.get(&Self::key(capp)) {
            Some(previous) if previous.uid == current.uid => ChangeSet {
                spec: previous.spec != current.spec,
                labels: previous.labels != current.labels,
                annotations: previous.annotations != current.annotations,
            },
            _ => ChangeSet::all(),
        }
    }

    /// Mark the current version of `capp` as handled.
    pub fn record(&self, capp: &Capp) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(capp), Fingerprint::of(capp));
    }

    /// Drop the entry of a deleted `Capp`.
    pub fn forget(&self, namespace: &str, name: &str) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(namespace.to_string(), name.to_string()));
    }
}

#[cfg(test)]
#[path = "changes_tests.rs"]
mod changes_tests;
