// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Capp operator.
//!
//! Three layers, each adding context to the one below:
//!
//! - [`StoreError`] - a single object store call failed, classified by outcome
//! - [`ManagerError`] - a resource manager could not converge one dependent kind
//! - [`ReconcileError`] - a reconciliation of one `Capp` failed
//!
//! Conflicts are carried through every layer unchanged so the reconcilers can
//! turn them into a timed requeue instead of a surfaced failure.

use thiserror::Error;

/// Outcome of a failed object store call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist (HTTP 404).
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The write was based on a stale resourceVersion (HTTP 409 on update).
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },

    /// An object with this name already exists (HTTP 409 on create).
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Any other failure: transport, authorization, validation, serialization.
    #[error("store error on {kind} {namespace}/{name}: {message}")]
    Backend {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
}

impl StoreError {
    /// Classify a `kube` client error for the object `kind` `namespace`/`name`.
    ///
    /// 404 maps to [`StoreError::NotFound`]. 409 maps to
    /// [`StoreError::AlreadyExists`] when the API reports that reason, otherwise
    /// to [`StoreError::Conflict`]. Everything else is [`StoreError::Backend`].
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        let (kind, namespace, name) = (kind.to_string(), namespace.to_string(), name.to_string());
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound {
                kind,
                namespace,
                name,
            },
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Self::AlreadyExists {
                    kind,
                    namespace,
                    name,
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict {
                kind,
                namespace,
                name,
                message: ae.message,
            },
            other => Self::Backend {
                kind,
                namespace,
                name,
                message: other.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` for optimistic-concurrency failures on a stale resourceVersion.
    ///
    /// A create that collides with an existing name is not a conflict:
    /// retrying it yields the same error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// A resource manager failed to converge one dependent object.
#[derive(Error, Debug, Clone)]
#[error("failed to {action} {kind} {namespace}/{name}: {source}")]
pub struct ManagerError {
    /// Dependent kind (e.g. `DomainMapping`).
    pub kind: String,
    /// Operation that failed: `get`, `list`, `create`, `update` or `delete`.
    pub action: &'static str,
    pub namespace: String,
    pub name: String,
    #[source]
    pub source: StoreError,
}

impl ManagerError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.source.is_conflict()
    }
}

/// Reconciliation of one `Capp` failed.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The `Capp` itself could not be read.
    #[error("failed to fetch Capp {namespace}/{name}: {source}")]
    Fetch {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// One or more resource managers failed. Every manager still ran.
    #[error("failed to reconcile Capp {namespace}/{name}: {}", join_errors(.errors))]
    Managers {
        namespace: String,
        name: String,
        errors: Vec<ManagerError>,
    },

    /// Writing the `Capp` status failed.
    #[error("failed to update status of Capp {namespace}/{name}: {source}")]
    Status {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// Maintaining the revision history failed.
    #[error("failed to maintain revisions of Capp {namespace}/{name}: {source}")]
    Revision {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// The reconciliation exceeded its deadline and was cancelled.
    #[error("reconciliation of Capp {namespace}/{name} timed out after {seconds}s")]
    Timeout {
        namespace: String,
        name: String,
        seconds: u64,
    },
}

impl ReconcileError {
    /// `true` when the failure is an optimistic-concurrency conflict anywhere
    /// in the error, including any aggregated manager error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Fetch { source, .. }
            | Self::Status { source, .. }
            | Self::Revision { source, .. } => source.is_conflict(),
            Self::Managers { errors, .. } => errors.iter().any(ManagerError::is_conflict),
            Self::Timeout { .. } => false,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Managers { .. } => "manager",
            Self::Status { .. } => "status",
            Self::Revision { .. } => "revision",
            Self::Timeout { .. } => "timeout",
        }
    }
}

fn join_errors(errors: &[ManagerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
