// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! Every dependent object and every `CappRevision` carries [`CAPP_RESOURCE_KEY`]
//! with the owning `Capp` name as value. Listing by this label is how managers
//! find stale objects after a rename.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on objects created by this operator
pub const MANAGED_BY_CAPP_OPERATOR: &str = "capp-operator";

// ============================================================================
// Capp-Specific Labels
// ============================================================================

/// Ownership label binding a dependent object or revision to its parent `Capp` by name
pub const CAPP_RESOURCE_KEY: &str = "rcs.dana.io/parent-capp";

// ============================================================================
// Event Reasons
// ============================================================================

/// Event reason emitted when a `DomainMapping` is created
pub const EVENT_DOMAIN_MAPPING_CREATED: &str = "DomainMappingCreated";

/// Event reason emitted when creating a `DomainMapping` fails
pub const EVENT_DOMAIN_MAPPING_CREATION_FAILED: &str = "DomainMappingCreationFailed";

/// Event reason emitted when a `Certificate` is created
pub const EVENT_CERTIFICATE_CREATED: &str = "CertificateCreated";

/// Event reason emitted when creating a `Certificate` fails
pub const EVENT_CERTIFICATE_CREATION_FAILED: &str = "CertificateCreationFailed";

/// Event reason emitted when a DNS record is created
pub const EVENT_DNS_RECORD_CREATED: &str = "DNSRecordCreated";

/// Event reason emitted when creating a DNS record fails
pub const EVENT_DNS_RECORD_CREATION_FAILED: &str = "DNSRecordCreationFailed";

/// Event reason emitted when a `CappRevision` is created
pub const EVENT_REVISION_CREATED: &str = "CappRevisionCreated";

/// Event reason emitted when creating a `CappRevision` fails
pub const EVENT_REVISION_CREATION_FAILED: &str = "CappRevisionCreationFailed";

/// Labels stamped on every object owned by the `Capp` named `capp_name`.
#[must_use]
pub fn ownership_labels(capp_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CAPP_RESOURCE_KEY.to_string(), capp_name.to_string()),
        (
            K8S_MANAGED_BY.to_string(),
            MANAGED_BY_CAPP_OPERATOR.to_string(),
        ),
    ])
}

/// Selector matching every object owned by the `Capp` named `capp_name`.
///
/// Only the ownership key is selected on, so objects created before the
/// managed-by label existed are still found.
#[must_use]
pub fn ownership_selector(capp_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(CAPP_RESOURCE_KEY.to_string(), capp_name.to_string())])
}
