// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate manager for the internal PKI backend.

use super::{
    clean_up_all, converge, owned_meta, prune_certificates_when_safe, Dependent, ResourceManager,
};
use crate::constants::{KIND_CERTIFICATE, PKI_CERTIFICATE_CONFIG, PKI_CERTIFICATE_FORM};
use crate::crd::Capp;
use crate::dependents::pki::{
    Certificate, CertificateData, CertificateSpec, ConfigReference, San, Subject,
};
use crate::errors::ManagerError;
use crate::events::EventRecorder;
use crate::labels::{EVENT_CERTIFICATE_CREATED, EVENT_CERTIFICATE_CREATION_FAILED};
use crate::reconcilers::resource_client::ResourceManagerClient;
use crate::store::ObjectStore;
use async_trait::async_trait;
use std::sync::Arc;

impl Dependent for Certificate {
    type Spec = CertificateSpec;
    const CREATED_REASON: &'static str = EVENT_CERTIFICATE_CREATED;
    const CREATION_FAILED_REASON: &'static str = EVENT_CERTIFICATE_CREATION_FAILED;

    fn spec(&self) -> &CertificateSpec {
        &self.spec
    }

    fn spec_mut(&mut self) -> &mut CertificateSpec {
        &mut self.spec
    }
}

/// Desired PKI `Certificate` for `capp`, named by its hostname.
#[must_use]
pub fn desired_pki_certificate(capp: &Capp, hostname: &str) -> Certificate {
    Certificate {
        metadata: owned_meta(capp, hostname),
        spec: CertificateSpec {
            certificate_data: CertificateData {
                subject: Subject {
                    common_name: hostname.to_string(),
                },
                san: San {
                    dns: vec![hostname.to_string()],
                },
                form: PKI_CERTIFICATE_FORM.to_string(),
            },
            secret_name: capp.spec.route_spec.tls_secret.clone(),
            config_ref: ConfigReference {
                name: PKI_CERTIFICATE_CONFIG.to_string(),
            },
        },
    }
}

pub struct PkiCertificateManager<S> {
    client: ResourceManagerClient<S>,
    recorder: Arc<dyn EventRecorder>,
}

impl<S: ObjectStore> PkiCertificateManager<S> {
    #[must_use]
    pub fn new(client: ResourceManagerClient<S>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { client, recorder }
    }
}

#[async_trait]
impl<S: ObjectStore> ResourceManager for PkiCertificateManager<S> {
    fn kind(&self) -> &'static str {
        KIND_CERTIFICATE
    }

    fn is_required(&self, capp: &Capp) -> bool {
        capp.hostname().is_some() && capp.spec.route_spec.tls_enabled
    }

    async fn manage(&self, capp: &Capp) -> Result<(), ManagerError> {
        let hostname = match capp.hostname() {
            Some(hostname) if self.is_required(capp) => hostname,
            _ => return self.clean_up(capp).await,
        };
        converge(
            &self.client,
            self.recorder.as_ref(),
            capp,
            desired_pki_certificate(capp, hostname),
        )
        .await?;
        prune_certificates_when_safe::<S, Certificate>(&self.client, capp, hostname).await
    }

    async fn clean_up(&self, capp: &Capp) -> Result<(), ManagerError> {
        clean_up_all::<S, Certificate>(&self.client, capp).await
    }
}
