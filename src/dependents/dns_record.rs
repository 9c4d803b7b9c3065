// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Crossplane DNS provider `CNAMERecord`.
//!
//! The provider reports `Ready=True` once the record is published and
//! resolvable. That condition gates certificate pruning.

use crate::crd::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Record parameters handed to the DNS provider.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CnameParameters {
    /// Fully qualified record name.
    pub name: String,
    pub zone: String,
    /// Canonical name the record points at.
    pub target: String,
    pub ttl: i32,
}

#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "record.dns.crossplane.io",
    version = "v1alpha1",
    kind = "CNAMERecord",
    namespaced,
    status = "CnameRecordStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CnameRecordSpec {
    pub for_provider: CnameParameters,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CnameRecordStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl CNAMERecord {
    /// `true` once the provider reports the record as resolvable.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| super::is_ready(&s.conditions))
    }
}
