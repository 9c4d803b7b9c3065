// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store abstraction.
//!
//! Reconcilers never talk to the API server directly. They go through
//! [`ObjectStore`], which has two implementations:
//!
//! - [`KubeStore`] - the Kubernetes API, used by the running operator
//! - [`MemoryStore`] - an in-process store with resourceVersion semantics,
//!   used by unit and scenario tests
//!
//! # Concurrency
//!
//! `update` and `update_status` send the resourceVersion the caller observed.
//! The store answers [`StoreError::Conflict`] when it no longer matches, and
//! callers requeue rather than retry in place.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryStore, StoreOp};

use crate::errors::StoreError;
use async_trait::async_trait;
use kube::core::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Any namespaced kind the store can hold.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Typed access to namespaced objects.
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Fetch one object. `Ok(None)` when it does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, StoreError>;

    /// List objects in `namespace` carrying every label in `labels`.
    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError>;

    /// Create `obj` in its own namespace.
    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Replace `obj`, guarded by its resourceVersion.
    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Replace the status of `obj`, guarded by its resourceVersion.
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Delete one object. [`StoreError::NotFound`] when it does not exist.
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// Render a label map as a Kubernetes label selector (`k1=v1,k2=v2`).
#[must_use]
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `true` if `labels` contains every pair in `selector`.
#[must_use]
pub fn labels_match(
    labels: Option<&BTreeMap<String, String>>,
    selector: &BTreeMap<String, String>,
) -> bool {
    selector.iter().all(|(key, value)| {
        labels
            .and_then(|l| l.get(key))
            .is_some_and(|actual| actual == value)
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
