// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # capp-operator - container application controller for Kubernetes
//!
//! A `Capp` declares a container application: its workload, its route and its
//! scaling. This library holds the reconciliation engine that turns a `Capp`
//! into the objects other projects act on, and keeps a history of its specs.
//!
//! ## Overview
//!
//! - Resource managers converge one dependent kind each: Knative
//!   `DomainMapping`, a TLS `Certificate` (internal PKI or cert-manager) and a
//!   Crossplane `CNAMERecord`
//! - Renames are handled without outages: stale objects are pruned, and an old
//!   certificate is only deleted once the DNS record of the new hostname
//!   resolves
//! - Every spec change is snapshotted as an immutable `CappRevision`, with a
//!   bounded history
//! - Optimistic-concurrency conflicts turn into a timed requeue
//!
//! ## Modules
//!
//! - [`crd`] - `Capp` and `CappRevision` resource types
//! - [`dependents`] - Foreign resource types created on behalf of a `Capp`
//! - [`reconcilers`] - Resource managers, revision state machine and reconcilers
//! - [`store`] - Object store abstraction over the Kubernetes API, plus an in-memory store
//! - [`events`] - User-visible notifications
//! - [`context`] - Shared controller context
//! - [`config`] - Command line and process configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
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
//! assert_eq!(capp.hostname(), Some("web.example.com"));
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dependents;
pub mod errors;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod store;
