// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS record manager: publishes a CNAME for the custom hostname.

use super::{clean_up_all, converge, owned_meta, prune_stale, Dependent, ResourceManager};
use crate::config::DnsSettings;
use crate::constants::KIND_DNS_RECORD;
use crate::crd::Capp;
use crate::dependents::dns_record::{CNAMERecord, CnameParameters, CnameRecordSpec};
use crate::errors::ManagerError;
use crate::events::EventRecorder;
use crate::labels::{EVENT_DNS_RECORD_CREATED, EVENT_DNS_RECORD_CREATION_FAILED};
use crate::reconcilers::resource_client::ResourceManagerClient;
use crate::store::ObjectStore;
use async_trait::async_trait;
use std::sync::Arc;

impl Dependent for CNAMERecord {
    type Spec = CnameRecordSpec;
    const CREATED_REASON: &'static str = EVENT_DNS_RECORD_CREATED;
    const CREATION_FAILED_REASON: &'static str = EVENT_DNS_RECORD_CREATION_FAILED;

    fn spec(&self) -> &CnameRecordSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut CnameRecordSpec {
        &mut self.spec
    }
}

/// Desired `CNAMERecord` for `capp`, named by its hostname.
#[must_use]
pub fn desired_dns_record(capp: &Capp, hostname: &str, dns: &DnsSettings) -> CNAMERecord {
    CNAMERecord {
        metadata: owned_meta(capp, hostname),
        spec: CnameRecordSpec {
            for_provider: CnameParameters {
                name: hostname.to_string(),
                zone: dns.zone.clone(),
                target: dns.cname_target.clone(),
                ttl: dns.ttl,
            },
        },
        status: None,
    }
}

pub struct DnsRecordManager<S> {
    client: ResourceManagerClient<S>,
    recorder: Arc<dyn EventRecorder>,
    dns: DnsSettings,
}

impl<S: ObjectStore> DnsRecordManager<S> {
    #[must_use]
    pub fn new(
        client: ResourceManagerClient<S>,
        recorder: Arc<dyn EventRecorder>,
        dns: DnsSettings,
    ) -> Self {
        Self {
            client,
            recorder,
            dns,
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ResourceManager for DnsRecordManager<S> {
    fn kind(&self) -> &'static str {
        KIND_DNS_RECORD
    }

    fn is_required(&self, capp: &Capp) -> bool {
        capp.hostname().is_some()
    }

    async fn manage(&self, capp: &Capp) -> Result<(), ManagerError> {
        let Some(hostname) = capp.hostname() else {
            return self.clean_up(capp).await;
        };
        prune_stale::<S, CNAMERecord>(&self.client, capp, Some(hostname)).await?;
        converge(
            &self.client,
            self.recorder.as_ref(),
            capp,
            desired_dns_record(capp, hostname, &self.dns),
        )
        .await?;
        Ok(())
    }

    async fn clean_up(&self, capp: &Capp) -> Result<(), ManagerError> {
        clean_up_all::<S, CNAMERecord>(&self.client, capp).await
    }
}
