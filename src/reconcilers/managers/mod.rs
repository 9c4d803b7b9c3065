// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource managers: one per dependent kind.
//!
//! A manager answers two questions about a `Capp`: is my kind required, and
//! what should it look like. [`converge`] and the pruning helpers below turn
//! the answer into store calls, so every manager follows the same protocol:
//!
//! 1. Not required: [`ResourceManager::clean_up`] deletes the object at the
//!    last observed location and every object carrying the ownership label.
//! 2. Required: fetch the object by its derived name. Create it when absent
//!    (publishing `<Kind>Created` or `<Kind>CreationFailed`), update it when
//!    its spec differs, leave it alone otherwise. A create that loses a race
//!    to another writer re-reads the object and updates it instead.
//! 3. Stale objects of the kind (owned by the `Capp`, other name) are deleted.
//!    Domain mappings and DNS records prune before converging. Certificates
//!    prune after converging, and only once the replacement exists and the DNS
//!    record of the current hostname is resolvable.
//!
//! Managers are built once by [`managers_for`] in a fixed order: domain
//! mapping, certificate, DNS record.

mod acme_certificate;
mod dns_record;
mod domain_mapping;
mod pki_certificate;

pub use acme_certificate::AcmeCertificateManager;
pub use dns_record::DnsRecordManager;
pub use domain_mapping::DomainMappingManager;
pub use pki_certificate::PkiCertificateManager;

use crate::config::{CertificateBackend, ControllerConfig};
use crate::crd::Capp;
use crate::dependents::dns_record::CNAMERecord;
use crate::errors::{ManagerError, StoreError};
use crate::events::{EventRecorder, Notification};
use crate::labels::{ownership_labels, ownership_selector};
use crate::metrics;
use crate::reconcilers::resource_client::ResourceManagerClient;
use crate::store::{ObjectStore, StoreObject};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// Converges one dependent kind for a `Capp`.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Kind managed, for logs and error context.
    fn kind(&self) -> &'static str;

    /// Whether `capp` needs an object of this kind. Pure.
    fn is_required(&self, capp: &Capp) -> bool;

    /// Drive the objects of this kind owned by `capp` to their desired state.
    ///
    /// # Errors
    ///
    /// Returns a [`ManagerError`] for any store failure other than a
    /// not-found during cleanup.
    async fn manage(&self, capp: &Capp) -> Result<(), ManagerError>;

    /// Delete every object of this kind owned by `capp`.
    ///
    /// # Errors
    ///
    /// Returns a [`ManagerError`] for any store failure other than not-found.
    async fn clean_up(&self, capp: &Capp) -> Result<(), ManagerError>;
}

/// The managers for `config`, in reconciliation order.
#[must_use]
pub fn managers_for<S: ObjectStore>(
    store: &S,
    recorder: &Arc<dyn EventRecorder>,
    config: &ControllerConfig,
) -> Vec<Box<dyn ResourceManager>> {
    let client = ResourceManagerClient::new(store.clone());
    let certificate: Box<dyn ResourceManager> = match config.certificate_backend {
        CertificateBackend::Pki => Box::new(PkiCertificateManager::new(
            client.clone(),
            recorder.clone(),
        )),
        CertificateBackend::Acme => Box::new(AcmeCertificateManager::new(
            client.clone(),
            recorder.clone(),
            config.acme_issuer.clone(),
        )),
    };

    vec![
        Box::new(DomainMappingManager::new(client.clone(), recorder.clone())),
        certificate,
        Box::new(DnsRecordManager::new(
            client,
            recorder.clone(),
            config.dns.clone(),
        )),
    ]
}

/// A dependent kind with a spec compared structurally.
pub trait Dependent: StoreObject {
    type Spec: PartialEq + Clone + Send + Sync;

    /// Event reason for a successful create.
    const CREATED_REASON: &'static str;

    /// Event reason for a failed create.
    const CREATION_FAILED_REASON: &'static str;

    fn spec(&self) -> &Self::Spec;

    fn spec_mut(&mut self) -> &mut Self::Spec;
}

/// Metadata of a dependent named `name`, owned by `capp`.
pub(crate) fn owned_meta(capp: &Capp, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: capp.namespace(),
        labels: Some(ownership_labels(&capp.name_any())),
        ..Default::default()
    }
}

fn manager_error<K: StoreObject>(
    action: &'static str,
    namespace: &str,
    name: &str,
    source: StoreError,
) -> ManagerError {
    ManagerError {
        kind: K::kind(&()).to_string(),
        action,
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    }
}

fn has_ownership_labels(obj: &impl ResourceExt, capp: &Capp) -> bool {
    let labels = obj.labels();
    ownership_labels(&capp.name_any())
        .iter()
        .all(|(k, v)| labels.get(k) == Some(v))
}

/// Create, update or leave alone the object `desired` describes.
///
/// Returns the object as stored afterwards.
pub(crate) async fn converge<S, K>(
    client: &ResourceManagerClient<S>,
    recorder: &dyn EventRecorder,
    capp: &Capp,
    desired: K,
) -> Result<K, ManagerError>
where
    S: ObjectStore,
    K: Dependent,
{
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();
    let kind = K::kind(&()).to_string();

    let observed = client
        .store()
        .get::<K>(&namespace, &name)
        .await
        .map_err(|e| manager_error::<K>("get", &namespace, &name, e))?;

    let mut existing = match observed {
        Some(existing) => existing,
        None => match client.create_resource(&desired).await {
            Ok(created) => {
                recorder
                    .publish(
                        capp,
                        Notification::normal(K::CREATED_REASON, format!("Created {kind} {name}")),
                    )
                    .await;
                return Ok(created);
            }
            // Another writer created it after our read: converge that object.
            Err(e) if e.is_already_exists() => {
                debug!(
                    "{} {}/{} appeared after it was read, re-reading",
                    kind, namespace, name
                );
                let raced = client
                    .store()
                    .get::<K>(&namespace, &name)
                    .await
                    .map_err(|source| manager_error::<K>("get", &namespace, &name, source))?;
                match raced {
                    Some(existing) => existing,
                    None => {
                        return Err(
                            creation_failed::<K>(recorder, capp, &namespace, &name, e).await,
                        )
                    }
                }
            }
            Err(e) => {
                return Err(creation_failed::<K>(recorder, capp, &namespace, &name, e).await)
            }
        },
    };

    if existing.spec() == desired.spec() && has_ownership_labels(&existing, capp) {
        debug!("{} {}/{} is up to date", kind, namespace, name);
        return Ok(existing);
    }
    existing.spec_mut().clone_from(desired.spec());
    existing
        .labels_mut()
        .extend(ownership_labels(&capp.name_any()));
    client
        .update_resource(&existing)
        .await
        .map_err(|e| manager_error::<K>("update", &namespace, &name, e))
}

/// Publish `<Kind>CreationFailed` and wrap `source`.
async fn creation_failed<K: Dependent>(
    recorder: &dyn EventRecorder,
    capp: &Capp,
    namespace: &str,
    name: &str,
    source: StoreError,
) -> ManagerError {
    let kind = K::kind(&());
    recorder
        .publish(
            capp,
            Notification::warning(
                K::CREATION_FAILED_REASON,
                format!("Failed to create {kind} {name}"),
            ),
        )
        .await;
    manager_error::<K>("create", namespace, name, source)
}

/// Owned objects of kind `K` whose name is not `keep`.
async fn stale_objects<S, K>(
    client: &ResourceManagerClient<S>,
    capp: &Capp,
    keep: Option<&str>,
) -> Result<Vec<String>, ManagerError>
where
    S: ObjectStore,
    K: StoreObject,
{
    let namespace = capp.namespace().unwrap_or_default();
    let owned: Vec<K> = client
        .store()
        .list(&namespace, &ownership_selector(&capp.name_any()))
        .await
        .map_err(|e| manager_error::<K>("list", &namespace, &capp.name_any(), e))?;
    Ok(owned
        .iter()
        .map(ResourceExt::name_any)
        .filter(|name| Some(name.as_str()) != keep)
        .collect())
}

/// Delete `namespace`/`name`, treating not-found as done.
async fn delete_if_present<S, K>(
    client: &ResourceManagerClient<S>,
    namespace: &str,
    name: &str,
) -> Result<(), ManagerError>
where
    S: ObjectStore,
    K: StoreObject,
{
    match client.delete_resource::<K>(namespace, name).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(manager_error::<K>("delete", namespace, name, e)),
    }
}

/// Delete every owned object of kind `K` except `keep`.
pub(crate) async fn prune_stale<S, K>(
    client: &ResourceManagerClient<S>,
    capp: &Capp,
    keep: Option<&str>,
) -> Result<(), ManagerError>
where
    S: ObjectStore,
    K: StoreObject,
{
    let namespace = capp.namespace().unwrap_or_default();
    for name in stale_objects::<S, K>(client, capp, keep).await? {
        debug!(
            "Pruning stale {} {}/{} of Capp {}",
            K::kind(&()),
            namespace,
            name,
            capp.name_any()
        );
        delete_if_present::<S, K>(client, &namespace, &name).await?;
    }
    Ok(())
}

/// Delete the object at the last observed location and every owned object of kind `K`.
pub(crate) async fn clean_up_all<S, K>(
    client: &ResourceManagerClient<S>,
    capp: &Capp,
) -> Result<(), ManagerError>
where
    S: ObjectStore,
    K: StoreObject,
{
    if let Some(host) = capp.observed_host() {
        let namespace = capp.namespace().unwrap_or_default();
        delete_if_present::<S, K>(client, &namespace, &host).await?;
    }
    prune_stale::<S, K>(client, capp, None).await
}

/// Prune stale certificates of kind `K` once replacing them is safe.
///
/// Safe means the certificate named `current` exists and, when the `Capp`
/// has a custom hostname, the DNS record for it is resolvable. Until then
/// the stale certificates keep serving and nothing is deleted.
pub(crate) async fn prune_certificates_when_safe<S, K>(
    client: &ResourceManagerClient<S>,
    capp: &Capp,
    current: &str,
) -> Result<(), ManagerError>
where
    S: ObjectStore,
    K: StoreObject,
{
    let stale = stale_objects::<S, K>(client, capp, Some(current)).await?;
    if stale.is_empty() {
        return Ok(());
    }

    let namespace = capp.namespace().unwrap_or_default();
    let current_exists = client
        .store()
        .get::<K>(&namespace, current)
        .await
        .map_err(|e| manager_error::<K>("get", &namespace, current, e))?
        .is_some();

    let dns_ready = match capp.hostname() {
        Some(hostname) => client
            .store()
            .get::<CNAMERecord>(&namespace, hostname)
            .await
            .map_err(|e| manager_error::<CNAMERecord>("get", &namespace, hostname, e))?
            .is_some_and(|record| record.is_resolvable()),
        None => true,
    };

    if !(current_exists && dns_ready) {
        debug!(
            "Deferring prune of {} stale {} of Capp {}/{}: current={} dns_ready={}",
            stale.len(),
            K::kind(&()),
            namespace,
            capp.name_any(),
            current_exists,
            dns_ready
        );
        metrics::record_deferred_prune(&K::kind(&()));
        return Ok(());
    }

    for name in stale {
        delete_if_present::<S, K>(client, &namespace, &name).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "managers_tests.rs"]
mod managers_tests;
