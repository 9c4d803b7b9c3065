// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dependent kinds created on behalf of a [`Capp`](crate::crd::Capp).
//!
//! None of these CRDs are installed by this operator. They belong to the
//! serving engine, the certificate issuers and the DNS provider. Only the
//! fields the operator reads or writes are modelled; `PartialEq` on each spec
//! is the structural equality used to decide whether an update is needed.
//!
//! - [`domain_mapping::DomainMapping`] - Knative `serving.knative.dev/v1beta1`
//! - [`pki::Certificate`] - internal PKI `cert.dana.io/v1alpha1`
//! - [`acme::Certificate`] - cert-manager `cert-manager.io/v1`
//! - [`dns_record::CNAMERecord`] - Crossplane `record.dns.crossplane.io/v1alpha1`

pub mod acme;
pub mod dns_record;
pub mod domain_mapping;
pub mod pki;

use crate::crd::Condition;

/// `true` when `conditions` carry `Ready=True`.
#[must_use]
pub fn is_ready(conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .any(|c| c.r#type == "Ready" && c.status == "True")
}
