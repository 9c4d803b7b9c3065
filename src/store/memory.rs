// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process [`ObjectStore`].
//!
//! Objects are kept as JSON, keyed by `apiVersion/kind`, namespace and name,
//! so two kinds sharing a name (the PKI and ACME `Certificate`s) never
//! collide. The store mimics the API server where reconcilers depend on it:
//!
//! - every write bumps a global resourceVersion
//! - `update`/`update_status` with a stale resourceVersion return a conflict
//! - `create` drops status, `update` preserves the stored status, and
//!   `update_status` touches only status
//! - deleting an object deletes everything whose ownerReferences point at it
//!
//! Each call is counted per kind and operation, failures can be queued
//! with [`MemoryStore::fail_next`] and stale reads with
//! [`MemoryStore::stale_next_gets`].

use super::{labels_match, ObjectStore, StoreObject};
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation, for counting and failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    resource_version: u64,
    calls: HashMap<(String, StoreOp), usize>,
    failures: HashMap<(String, StoreOp), VecDeque<StoreError>>,
    stale_gets: HashMap<String, usize>,
}

impl State {
    /// Count the call and pop an injected failure, if any.
    fn enter(&mut self, type_key: &str, op: StoreOp) -> Result<(), StoreError> {
        let key = (type_key.to_string(), op);
        *self.calls.entry(key.clone()).or_default() += 1;
        match self.failures.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// Shared in-memory object store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn type_key<K: StoreObject>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

fn backend<K: StoreObject>(namespace: &str, name: &str, message: impl ToString) -> StoreError {
    StoreError::Backend {
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn not_found<K: StoreObject>(namespace: &str, name: &str) -> StoreError {
    StoreError::NotFound {
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn decode<K: StoreObject>(value: &Value, namespace: &str, name: &str) -> Result<K, StoreError> {
    serde_json::from_value(value.clone()).map_err(|e| backend::<K>(namespace, name, e))
}

fn metadata_mut(value: &mut Value) -> Option<&mut serde_json::Map<String, Value>> {
    value.get_mut("metadata").and_then(Value::as_object_mut)
}

fn stored_string(value: &Value, field: &str) -> Option<String> {
    value
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `op` on kind `K` fail with `err`. Calls queue up.
    pub fn fail_next<K: StoreObject>(&self, op: StoreOp, err: StoreError) {
        self.lock()
            .failures
            .entry((type_key::<K>(), op))
            .or_default()
            .push_back(err);
    }

    /// Make the next `count` gets on kind `K` report the object absent, like
    /// a read served from a lagging cache.
    pub fn stale_next_gets<K: StoreObject>(&self, count: usize) {
        *self.lock().stale_gets.entry(type_key::<K>()).or_default() += count;
    }

    /// Number of `op` calls made on kind `K`, failed ones included.
    #[must_use]
    pub fn calls<K: StoreObject>(&self, op: StoreOp) -> usize {
        self.lock()
            .calls
            .get(&(type_key::<K>(), op))
            .copied()
            .unwrap_or_default()
    }

    /// Forget all call counts.
    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// Names of every stored `K` in `namespace`, sorted.
    #[must_use]
    pub fn names<K: StoreObject>(&self, namespace: &str) -> Vec<String> {
        let type_key = type_key::<K>();
        self.lock()
            .objects
            .keys()
            .filter(|(t, ns, _)| *t == type_key && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    fn cascade(state: &mut State, uid: &str) {
        let dependents: Vec<(ObjectKey, Option<String>)> = state
            .objects
            .iter()
            .filter(|(_, value)| {
                value
                    .get("metadata")
                    .and_then(|m| m.get("ownerReferences"))
                    .and_then(Value::as_array)
                    .is_some_and(|refs| {
                        refs.iter()
                            .any(|r| r.get("uid").and_then(Value::as_str) == Some(uid))
                    })
            })
            .map(|(key, value)| (key.clone(), stored_string(value, "uid")))
            .collect();

        for (key, child_uid) in dependents {
            state.objects.remove(&key);
            if let Some(child_uid) = child_uid {
                Self::cascade(state, &child_uid);
            }
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let type_key = type_key::<K>();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::Get)?;
        if let Some(stale) = state.stale_gets.get_mut(&type_key).filter(|n| **n > 0) {
            *stale -= 1;
            return Ok(None);
        }
        state
            .objects
            .get(&(type_key, namespace.to_string(), name.to_string()))
            .map(|value| decode::<K>(value, namespace, name))
            .transpose()
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<K>, StoreError> {
        let type_key = type_key::<K>();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::List)?;
        let mut items = Vec::new();
        for ((t, ns, name), value) in &state.objects {
            if *t != type_key || ns != namespace {
                continue;
            }
            let obj = decode::<K>(value, ns, name)?;
            if labels_match(Some(obj.labels()), labels) {
                items.push(obj);
            }
        }
        Ok(items)
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let type_key = type_key::<K>();
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.meta().name.clone().unwrap_or_default();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::Create)?;
        if name.is_empty() {
            return Err(backend::<K>(&namespace, &name, "metadata.name is required"));
        }

        let key = (type_key, namespace.clone(), name.clone());
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: K::kind(&()).to_string(),
                namespace,
                name,
            });
        }

        let mut value = serde_json::to_value(obj).map_err(|e| backend::<K>(&namespace, &name, e))?;
        if let Some(object) = value.as_object_mut() {
            object.remove("status");
        }
        let version = state.next_version();
        let meta = metadata_mut(&mut value)
            .ok_or_else(|| backend::<K>(&namespace, &name, "object has no metadata"))?;
        meta.insert("resourceVersion".into(), Value::String(version.clone()));
        meta.insert("uid".into(), Value::String(format!("uid-{version}")));
        meta.insert("namespace".into(), Value::String(namespace.clone()));

        let created = decode::<K>(&value, &namespace, &name)?;
        state.objects.insert(key, value);
        Ok(created)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let type_key = type_key::<K>();
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::Update)?;

        let key = (type_key, namespace.clone(), name.clone());
        let stored = state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found::<K>(&namespace, &name))?;
        check_version::<K>(&stored, obj, &namespace, &name)?;

        let mut value = serde_json::to_value(obj).map_err(|e| backend::<K>(&namespace, &name, e))?;
        match stored.get("status") {
            Some(status) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert("status".into(), status.clone());
                }
            }
            None => {
                if let Some(object) = value.as_object_mut() {
                    object.remove("status");
                }
            }
        }
        let version = state.next_version();
        let meta = metadata_mut(&mut value)
            .ok_or_else(|| backend::<K>(&namespace, &name, "object has no metadata"))?;
        meta.insert("resourceVersion".into(), Value::String(version));
        if let Some(uid) = stored_string(&stored, "uid") {
            meta.insert("uid".into(), Value::String(uid));
        }

        let updated = decode::<K>(&value, &namespace, &name)?;
        state.objects.insert(key, value);
        Ok(updated)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let type_key = type_key::<K>();
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::UpdateStatus)?;

        let key = (type_key, namespace.clone(), name.clone());
        let mut stored = state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found::<K>(&namespace, &name))?;
        check_version::<K>(&stored, obj, &namespace, &name)?;

        let incoming = serde_json::to_value(obj).map_err(|e| backend::<K>(&namespace, &name, e))?;
        if let Some(object) = stored.as_object_mut() {
            match incoming.get("status") {
                Some(status) => {
                    object.insert("status".into(), status.clone());
                }
                None => {
                    object.remove("status");
                }
            }
        }
        let version = state.next_version();
        if let Some(meta) = metadata_mut(&mut stored) {
            meta.insert("resourceVersion".into(), Value::String(version));
        }

        let updated = decode::<K>(&stored, &namespace, &name)?;
        state.objects.insert(key, stored);
        Ok(updated)
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let type_key = type_key::<K>();
        let mut state = self.lock();
        state.enter(&type_key, StoreOp::Delete)?;

        let removed = state
            .objects
            .remove(&(type_key, namespace.to_string(), name.to_string()))
            .ok_or_else(|| not_found::<K>(namespace, name))?;
        if let Some(uid) = stored_string(&removed, "uid") {
            Self::cascade(&mut state, &uid);
        }
        Ok(())
    }
}

/// Reject writes based on a resourceVersion other than the stored one.
///
/// Objects without a resourceVersion are written unconditionally, as the
/// API server does for `replace`.
fn check_version<K: StoreObject>(
    stored: &Value,
    obj: &K,
    namespace: &str,
    name: &str,
) -> Result<(), StoreError> {
    match (obj.resource_version(), stored_string(stored, "resourceVersion")) {
        (Some(sent), Some(current)) if sent != current => Err(StoreError::Conflict {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: format!(
                "the object has been modified; resourceVersion {sent} is stale (current {current})"
            ),
        }),
        _ => Ok(()),
    }
}
