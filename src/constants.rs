// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Capp operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the Capp CRDs
pub const API_GROUP: &str = "rcs.dana.io";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "rcs.dana.io/v1alpha1";

/// Kind name for `Capp` resource
pub const KIND_CAPP: &str = "Capp";

/// Kind name for `CappRevision` resource
pub const KIND_CAPP_REVISION: &str = "CappRevision";

/// Kind name for Knative `DomainMapping` resource
pub const KIND_DOMAIN_MAPPING: &str = "DomainMapping";

/// Kind name for both certificate backends
pub const KIND_CERTIFICATE: &str = "Certificate";

/// Kind name for the DNS provider `CNAMERecord` resource
pub const KIND_DNS_RECORD: &str = "CNAMERecord";

/// Kind of the Knative object a `DomainMapping` points at
pub const DOMAIN_MAPPING_REFERENCE_KIND: &str = "Service";

/// API version of the Knative object a `DomainMapping` points at
pub const DOMAIN_MAPPING_REFERENCE_API_VERSION: &str = "serving.knative.dev/v1";

// ============================================================================
// Certificate Constants
// ============================================================================

/// Output form requested from the PKI certificate backend
pub const PKI_CERTIFICATE_FORM: &str = "pfx";

/// Name of the `CertificateConfig` used by the PKI backend
pub const PKI_CERTIFICATE_CONFIG: &str = "certificateconfig-capp";

/// Default ACME issuer name
pub const DEFAULT_ACME_ISSUER_NAME: &str = "letsencrypt";

/// Default ACME issuer kind
pub const DEFAULT_ACME_ISSUER_KIND: &str = "ClusterIssuer";

/// Default ACME issuer API group
pub const DEFAULT_ACME_ISSUER_GROUP: &str = "cert-manager.io";

// ============================================================================
// DNS Constants
// ============================================================================

/// Default DNS zone dependent records are created in
pub const DEFAULT_DNS_ZONE: &str = "capp.local";

/// Default CNAME target for dependent DNS records (the cluster ingress)
pub const DEFAULT_DNS_CNAME_TARGET: &str = "ingress.capp.local";

/// Default TTL for dependent DNS records (5 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: i32 = 300;

// ============================================================================
// Revision Constants
// ============================================================================

/// Maximum number of `CappRevision`s retained per `Capp`
pub const REVISIONS_TO_KEEP: usize = 10;

/// Revision number assigned to the first snapshot of a `Capp`
pub const FIRST_REVISION_NUMBER: i64 = 1;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue delay after an optimistic-concurrency conflict (5 seconds)
pub const CONFLICT_REQUEUE_DURATION_SECS: u64 = 5;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Upper bound for a single reconciliation (30 seconds)
pub const RECONCILE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Name of the leader election lease
pub const LEADER_ELECTION_LEASE_NAME: &str = "c1382367.dana.io";

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Grace period before a lost lease is acted upon (5 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager name used for status patches
pub const FIELD_MANAGER: &str = "capp-operator";

/// Event reporting component name for the Capp controller
pub const CAPP_CONTROLLER_NAME: &str = "container-app-controller";

/// Event reporting component name for the revision controller
pub const CAPP_REVISION_CONTROLLER_NAME: &str = "capprevision-controller";

// ============================================================================
// Metrics / Health Server Constants
// ============================================================================

/// Default bind address for the Prometheus metrics endpoint
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default bind address for the health probe endpoints
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
