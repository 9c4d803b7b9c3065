// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry of every kind the operator reads or writes.
//!
//! Built once at first use and read-only afterwards. `crdgen` uses the owned
//! entries to emit CRD manifests; startup logs the full table.

use crate::crd::{Capp, CappRevision};
use crate::dependents::dns_record::CNAMERecord;
use crate::dependents::domain_mapping::DomainMapping;
use crate::dependents::{acme, pki};
use kube::Resource;
use std::sync::LazyLock;

/// One entry of the kind registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindInfo {
    pub api_version: String,
    pub kind: String,
    pub plural: String,
    /// `true` for CRDs this operator installs, `false` for foreign kinds.
    pub owned: bool,
}

impl KindInfo {
    fn of<K: Resource<DynamicType = ()>>(owned: bool) -> Self {
        Self {
            api_version: K::api_version(&()).to_string(),
            kind: K::kind(&()).to_string(),
            plural: K::plural(&()).to_string(),
            owned,
        }
    }
}

static KINDS: LazyLock<Vec<KindInfo>> = LazyLock::new(|| {
    vec![
        KindInfo::of::<Capp>(true),
        KindInfo::of::<CappRevision>(true),
        KindInfo::of::<DomainMapping>(false),
        KindInfo::of::<pki::Certificate>(false),
        KindInfo::of::<acme::Certificate>(false),
        KindInfo::of::<CNAMERecord>(false),
    ]
});

/// All known kinds.
#[must_use]
pub fn known_kinds() -> &'static [KindInfo] {
    &KINDS
}

/// Kinds whose CRDs this operator installs.
pub fn owned_kinds() -> impl Iterator<Item = &'static KindInfo> {
    KINDS.iter().filter(|k| k.owned)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
