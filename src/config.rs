// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Every flag has an environment fallback so the operator can be configured
//! from a Deployment manifest without rewriting its arguments.
//! [`Cli::controller_config`] turns the parsed flags into the
//! [`ControllerConfig`] shared by all reconcilers.

use crate::constants::{
    CONFLICT_REQUEUE_DURATION_SECS, DEFAULT_ACME_ISSUER_GROUP, DEFAULT_ACME_ISSUER_KIND,
    DEFAULT_ACME_ISSUER_NAME, DEFAULT_DNS_CNAME_TARGET, DEFAULT_DNS_RECORD_TTL_SECS,
    DEFAULT_DNS_ZONE, DEFAULT_HEALTH_PROBE_BIND_ADDRESS, DEFAULT_METRICS_BIND_ADDRESS,
    RECONCILE_TIMEOUT_SECS, REVISIONS_TO_KEEP,
};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Which issuer certificates are requested from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CertificateBackend {
    /// Internal PKI (`cert.dana.io` Certificates)
    #[default]
    Pki,
    /// ACME through cert-manager (`cert-manager.io` Certificates)
    Acme,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Command line of the `capp-operator` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "capp-operator", version, about = "Container app reconciliation controller")]
pub struct Cli {
    /// Address the Prometheus metrics endpoint binds to
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Address the health and readiness probes bind to
    #[arg(long, env = "HEALTH_PROBE_BIND_ADDRESS", default_value = DEFAULT_HEALTH_PROBE_BIND_ADDRESS)]
    pub health_probe_bind_address: SocketAddr,

    /// Only reconcile while holding the leader lease
    #[arg(long, env = "LEADER_ELECT")]
    pub leader_elect: bool,

    /// Namespace holding the leader lease
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    pub leader_election_namespace: String,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Certificate issuer backend
    #[arg(long, env = "CERTIFICATE_BACKEND", value_enum, default_value_t = CertificateBackend::Pki)]
    pub certificate_backend: CertificateBackend,

    /// DNS zone dependent records are created in
    #[arg(long, env = "DNS_ZONE", default_value = DEFAULT_DNS_ZONE)]
    pub dns_zone: String,

    /// Canonical name every dependent DNS record points at
    #[arg(long, env = "DNS_CNAME_TARGET", default_value = DEFAULT_DNS_CNAME_TARGET)]
    pub dns_cname_target: String,

    /// Issuer name for ACME certificates
    #[arg(long, env = "ACME_ISSUER_NAME", default_value = DEFAULT_ACME_ISSUER_NAME)]
    pub acme_issuer_name: String,

    /// Issuer kind for ACME certificates (`Issuer` or `ClusterIssuer`)
    #[arg(long, env = "ACME_ISSUER_KIND", default_value = DEFAULT_ACME_ISSUER_KIND)]
    pub acme_issuer_kind: String,

    /// Maximum number of revisions kept per Capp
    #[arg(long, env = "REVISIONS_TO_KEEP", default_value_t = REVISIONS_TO_KEEP)]
    pub revisions_to_keep: usize,

    /// Delay before retrying after an optimistic-concurrency conflict
    #[arg(long, env = "CONFLICT_REQUEUE_SECONDS", default_value_t = CONFLICT_REQUEUE_DURATION_SECS)]
    pub conflict_requeue_seconds: u64,

    /// Upper bound for a single reconciliation
    #[arg(long, env = "RECONCILE_TIMEOUT_SECONDS", default_value_t = RECONCILE_TIMEOUT_SECS)]
    pub reconcile_timeout_seconds: u64,
}

impl Cli {
    /// Reconciler configuration derived from the flags.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            certificate_backend: self.certificate_backend,
            dns: DnsSettings {
                zone: self.dns_zone.clone(),
                cname_target: self.dns_cname_target.clone(),
                ttl: DEFAULT_DNS_RECORD_TTL_SECS,
            },
            acme_issuer: AcmeIssuer {
                name: self.acme_issuer_name.clone(),
                kind: self.acme_issuer_kind.clone(),
                group: DEFAULT_ACME_ISSUER_GROUP.to_string(),
            },
            revisions_to_keep: self.revisions_to_keep.max(1),
            conflict_requeue: Duration::from_secs(self.conflict_requeue_seconds),
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_seconds),
        }
    }
}

/// Where dependent DNS records are published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsSettings {
    pub zone: String,
    pub cname_target: String,
    pub ttl: i32,
}

/// Issuer reference stamped on ACME certificates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcmeIssuer {
    pub name: String,
    pub kind: String,
    pub group: String,
}

/// Settings shared by the reconcilers and resource managers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub certificate_backend: CertificateBackend,
    pub dns: DnsSettings,
    pub acme_issuer: AcmeIssuer,
    /// Retention bound of the revision history, at least 1.
    pub revisions_to_keep: usize,
    pub conflict_requeue: Duration,
    pub reconcile_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            certificate_backend: CertificateBackend::default(),
            dns: DnsSettings {
                zone: DEFAULT_DNS_ZONE.to_string(),
                cname_target: DEFAULT_DNS_CNAME_TARGET.to_string(),
                ttl: DEFAULT_DNS_RECORD_TTL_SECS,
            },
            acme_issuer: AcmeIssuer {
                name: DEFAULT_ACME_ISSUER_NAME.to_string(),
                kind: DEFAULT_ACME_ISSUER_KIND.to_string(),
                group: DEFAULT_ACME_ISSUER_GROUP.to_string(),
            },
            revisions_to_keep: REVISIONS_TO_KEEP,
            conflict_requeue: Duration::from_secs(CONFLICT_REQUEUE_DURATION_SECS),
            reconcile_timeout: Duration::from_secs(RECONCILE_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
