// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Thin create/update/delete layer used by every resource manager.
//!
//! No retries happen here. Store errors, conflicts included, are returned
//! unchanged so the caller decides between surfacing and requeueing.

use crate::errors::StoreError;
use crate::metrics;
use crate::store::{ObjectStore, StoreObject};
use kube::ResourceExt;
use tracing::{debug, info};

/// Write access to dependent objects, with one log line per call.
#[derive(Clone)]
pub struct ResourceManagerClient<S> {
    store: S,
}

impl<S: ObjectStore> ResourceManagerClient<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read access for managers that need to observe before writing.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create `desired` in its namespace.
    ///
    /// # Errors
    ///
    /// Returns the store error unchanged, [`StoreError::AlreadyExists`] included.
    pub async fn create_resource<K: StoreObject>(&self, desired: &K) -> Result<K, StoreError> {
        debug!(
            kind = %K::kind(&()),
            namespace = %desired.namespace().unwrap_or_default(),
            name = %desired.name_any(),
            "Creating resource"
        );
        let created = self.store.create(desired).await?;
        info!(
            "Created {} {}/{}",
            K::kind(&()),
            created.namespace().unwrap_or_default(),
            created.name_any()
        );
        metrics::record_dependent(&K::kind(&()), "create");
        Ok(created)
    }

    /// Replace `existing`, guarded by its resourceVersion.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when `existing` is stale.
    pub async fn update_resource<K: StoreObject>(&self, existing: &K) -> Result<K, StoreError> {
        debug!(
            kind = %K::kind(&()),
            namespace = %existing.namespace().unwrap_or_default(),
            name = %existing.name_any(),
            resource_version = ?existing.resource_version(),
            "Updating resource"
        );
        let updated = self.store.update(existing).await?;
        info!(
            "Updated {} {}/{}",
            K::kind(&()),
            updated.namespace().unwrap_or_default(),
            updated.name_any()
        );
        metrics::record_dependent(&K::kind(&()), "update");
        Ok(updated)
    }

    /// Delete `namespace`/`name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when there is nothing to delete.
    pub async fn delete_resource<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        debug!(
            kind = %K::kind(&()),
            namespace = %namespace,
            name = %name,
            "Deleting resource"
        );
        self.store.delete::<K>(namespace, name).await?;
        info!("Deleted {} {}/{}", K::kind(&()), namespace, name);
        metrics::record_dependent(&K::kind(&()), "delete");
        Ok(())
    }
}
