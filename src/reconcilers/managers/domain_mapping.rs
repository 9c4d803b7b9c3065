// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DomainMapping` manager: routes the custom hostname to the Capp's Knative Service.

use super::{clean_up_all, converge, owned_meta, prune_stale, Dependent, ResourceManager};
use crate::constants::{
    DOMAIN_MAPPING_REFERENCE_API_VERSION, DOMAIN_MAPPING_REFERENCE_KIND, KIND_DOMAIN_MAPPING,
};
use crate::crd::Capp;
use crate::dependents::domain_mapping::{DomainMapping, DomainMappingSpec, KReference, SecretTls};
use crate::errors::ManagerError;
use crate::events::EventRecorder;
use crate::labels::{EVENT_DOMAIN_MAPPING_CREATED, EVENT_DOMAIN_MAPPING_CREATION_FAILED};
use crate::reconcilers::resource_client::ResourceManagerClient;
use crate::store::ObjectStore;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;

impl Dependent for DomainMapping {
    type Spec = DomainMappingSpec;
    const CREATED_REASON: &'static str = EVENT_DOMAIN_MAPPING_CREATED;
    const CREATION_FAILED_REASON: &'static str = EVENT_DOMAIN_MAPPING_CREATION_FAILED;

    fn spec(&self) -> &DomainMappingSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut DomainMappingSpec {
        &mut self.spec
    }
}

/// Desired `DomainMapping` for `capp`, named by its hostname.
#[must_use]
pub fn desired_domain_mapping(capp: &Capp, hostname: &str) -> DomainMapping {
    let route = &capp.spec.route_spec;
    DomainMapping {
        metadata: owned_meta(capp, hostname),
        spec: DomainMappingSpec {
            reference: KReference {
                api_version: DOMAIN_MAPPING_REFERENCE_API_VERSION.to_string(),
                kind: DOMAIN_MAPPING_REFERENCE_KIND.to_string(),
                name: capp.name_any(),
            },
            tls: route.tls_enabled.then(|| SecretTls {
                secret_name: route.tls_secret.clone(),
            }),
        },
        status: None,
    }
}

pub struct DomainMappingManager<S> {
    client: ResourceManagerClient<S>,
    recorder: Arc<dyn EventRecorder>,
}

impl<S: ObjectStore> DomainMappingManager<S> {
    #[must_use]
    pub fn new(client: ResourceManagerClient<S>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { client, recorder }
    }
}

#[async_trait]
impl<S: ObjectStore> ResourceManager for DomainMappingManager<S> {
    fn kind(&self) -> &'static str {
        KIND_DOMAIN_MAPPING
    }

    fn is_required(&self, capp: &Capp) -> bool {
        capp.hostname().is_some()
    }

    async fn manage(&self, capp: &Capp) -> Result<(), ManagerError> {
        let Some(hostname) = capp.hostname() else {
            return self.clean_up(capp).await;
        };
        prune_stale::<S, DomainMapping>(&self.client, capp, Some(hostname)).await?;
        converge(
            &self.client,
            self.recorder.as_ref(),
            capp,
            desired_domain_mapping(capp, hostname),
        )
        .await?;
        Ok(())
    }

    async fn clean_up(&self, capp: &Capp) -> Result<(), ManagerError> {
        clean_up_all::<S, DomainMapping>(&self.client, capp).await
    }
}
