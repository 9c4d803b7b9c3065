// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) owned by the Capp operator.
//!
//! # Resource Types
//!
//! - [`Capp`] - The parent object: a container workload, its route and its scaling
//! - [`CappRevision`] - An immutable snapshot of a `Capp` spec, part of its rollout history
//!
//! Dependent kinds the operator creates on behalf of a `Capp` (domain mappings,
//! certificates, DNS records) belong to other projects and live in
//! [`crate::dependents`].
//!
//! # Example: Creating a Capp
//!
//! ```rust,no_run
//! use capp_operator::crd::{Capp, CappSpec, RouteSpec};
//!
//! let capp = Capp::new(
//!     "web",
//!     CappSpec {
//!         route_spec: RouteSpec {
//!             hostname: "web.example.com".to_string(),
//!             tls_enabled: true,
//!             tls_secret: "web-tls".to_string(),
//!         },
//!         ..Default::default()
//!     },
//! );
//! ```

pub mod registry;

use k8s_openapi::api::core::v1::Container;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, Available, Progressing, Degraded, Failed.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// External exposure of a `Capp`.
///
/// An empty `hostname` means the `Capp` is only reachable through the
/// serving engine's default URL, and no domain mapping, certificate or DNS
/// record is required.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Custom hostname the application is served under (e.g. `web.example.com`).
    #[serde(default)]
    pub hostname: String,

    /// Whether the route terminates TLS.
    #[serde(default)]
    pub tls_enabled: bool,

    /// Name of the Secret holding the TLS key pair.
    #[serde(default)]
    pub tls_secret: String,
}

/// Container template and scaling bounds of a `Capp`.
///
/// Opaque to the reconciliation engine; only compared when deciding whether a
/// new revision is needed.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSpec {
    /// Containers making up the workload.
    #[serde(default)]
    pub containers: Vec<Container>,

    /// Lower bound on the number of replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Upper bound on the number of replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

/// `Capp` declares a container application: what to run, how to expose it, how to scale it.
///
/// # Example
///
/// ```yaml
/// apiVersion: rcs.dana.io/v1alpha1
/// kind: Capp
/// metadata:
///   name: web
///   namespace: apps
/// spec:
///   routeSpec:
///     hostname: web.example.com
///     tlsEnabled: true
///     tlsSecret: web-tls
///   configurationSpec:
///     containers:
///       - name: web
///         image: ghcr.io/example/web:1.2.3
///   scaleMetric: concurrency
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "rcs.dana.io",
    version = "v1alpha1",
    kind = "Capp",
    namespaced,
    shortname = "capp",
    doc = "Capp declares a container application together with its route, TLS and scaling settings. The operator derives domain mappings, certificates and DNS records from it and keeps a history of its specs as CappRevisions."
)]
#[kube(status = "CappStatus")]
#[serde(rename_all = "camelCase")]
pub struct CappSpec {
    /// Route (hostname and TLS) settings.
    #[serde(default)]
    pub route_spec: RouteSpec,

    /// Container template and scaling bounds.
    #[serde(default)]
    pub configuration_spec: ConfigurationSpec,

    /// Metric driving autoscaling: concurrency, rps, cpu or memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_metric: Option<String>,

    /// Desired state of the workload: enabled or disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Observed state of the domain mapping serving a `Capp`'s custom hostname.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainMappingObjectStatus {
    /// URL reported by the serving engine once the mapping is resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Conditions copied from the `DomainMapping`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Route section of a `Capp` status.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    #[serde(default)]
    pub domain_mapping_object_status: DomainMappingObjectStatus,
}

/// Pointer to the head of a `Capp`'s revision history.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    /// Name of the newest `CappRevision`.
    pub latest_revision: String,

    /// Number of revisions currently retained.
    pub revision_count: i32,
}

/// `Capp` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CappStatus {
    #[serde(default)]
    pub route_status: RouteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_info: Option<RevisionInfo>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Capp {
    /// Custom hostname from the route spec, `None` when empty.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        let hostname = self.spec.route_spec.hostname.as_str();
        (!hostname.is_empty()).then_some(hostname)
    }

    /// Host of the URL the serving engine last reported for the domain mapping.
    ///
    /// Accepts both absolute URLs (`https://web.example.com`) and bare hosts.
    #[must_use]
    pub fn observed_host(&self) -> Option<String> {
        let raw = self
            .status
            .as_ref()?
            .route_status
            .domain_mapping_object_status
            .url
            .as_deref()?;
        parse_host(raw)
    }

    /// Namespace of the `Capp`, empty for objects not yet persisted.
    #[must_use]
    pub fn namespace_or_default(&self) -> String {
        self.namespace().unwrap_or_default()
    }
}

/// Extract the host of a URL reported in status.
#[must_use]
pub fn parse_host(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match url::Url::parse(raw) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        // No scheme: the serving engine reported a bare host.
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(raw.trim_end_matches('/').to_string()),
        Err(_) => None,
    }
}

/// The part of a `Capp` frozen into a revision.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CappTemplate {
    /// The `Capp` spec at the time the revision was taken.
    pub spec: CappSpec,

    /// Labels of the `Capp` at the time the revision was taken.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations of the `Capp` at the time the revision was taken.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// `CappRevision` is an immutable snapshot of a `Capp` spec.
///
/// Revisions of one `Capp` are ordered by `revisionNumber`; the newest one
/// reflects the current spec. They are owned by the `Capp` and removed with it.
///
/// # Example
///
/// ```yaml
/// apiVersion: rcs.dana.io/v1alpha1
/// kind: CappRevision
/// metadata:
///   name: web-v3
///   namespace: apps
///   labels:
///     rcs.dana.io/parent-capp: web
/// spec:
///   revisionNumber: 3
///   cappTemplate:
///     spec:
///       routeSpec:
///         hostname: web.example.com
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "rcs.dana.io",
    version = "v1alpha1",
    kind = "CappRevision",
    namespaced,
    shortname = "capprev",
    doc = "CappRevision is an immutable snapshot of a Capp spec. Revisions of one Capp form its rollout history, ordered by revisionNumber."
)]
#[serde(rename_all = "camelCase")]
pub struct CappRevisionSpec {
    /// Position of this snapshot in the history, starting at 1.
    pub revision_number: i64,

    /// The snapshot itself.
    pub capp_template: CappTemplate,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
