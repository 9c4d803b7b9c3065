// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ObjectStore`] backed by the Kubernetes API server.

use super::{label_selector, ObjectStore, StoreObject};
use crate::constants::FIELD_MANAGER;
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Kubernetes API client wrapped as an [`ObjectStore`].
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), namespace, name))
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        let selector = label_selector(labels);
        debug!(
            kind = %kind_of::<K>(),
            namespace = %namespace,
            selector = %selector,
            "Listing objects"
        );
        self.api::<K>(namespace)
            .list(&ListParams::default().labels(&selector))
            .await
            .map(|list| list.items)
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), namespace, &selector))
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        self.api::<K>(&namespace)
            .create(&post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), &namespace, &obj.name_any()))
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        self.api::<K>(&namespace)
            .replace(&name, &post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), &namespace, &name))
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let status = serde_json::to_value(obj)
            .map_err(|e| StoreError::Backend {
                kind: kind_of::<K>(),
                namespace: namespace.clone(),
                name: name.clone(),
                message: e.to_string(),
            })?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        // A merge patch carrying resourceVersion is rejected with 409 when stale.
        let patch = json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": status,
        });
        self.api::<K>(&namespace)
            .patch_status(&name, &patch_params(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), &namespace, &name))
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_kube(e, &kind_of::<K>(), namespace, name))
    }
}
