// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate manager for the ACME backend (cert-manager).
//!
//! Unlike the PKI backend, a certificate is also requested when the `Capp`
//! has no custom hostname but the serving engine already reported a URL: the
//! observed host is used instead.

use super::{
    clean_up_all, converge, owned_meta, prune_certificates_when_safe, Dependent, ResourceManager,
};
use crate::config::AcmeIssuer;
use crate::constants::KIND_CERTIFICATE;
use crate::crd::Capp;
use crate::dependents::acme::{Certificate, CertificateSpec, IssuerReference};
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

/// Host the certificate is issued for: the custom hostname, else the observed URL host.
#[must_use]
pub fn certificate_host(capp: &Capp) -> Option<String> {
    capp.hostname()
        .map(str::to_string)
        .or_else(|| capp.observed_host())
}

/// Desired cert-manager `Certificate` for `capp`, named by `host`.
#[must_use]
pub fn desired_acme_certificate(capp: &Capp, host: &str, issuer: &AcmeIssuer) -> Certificate {
    Certificate {
        metadata: owned_meta(capp, host),
        spec: CertificateSpec {
            secret_name: capp.spec.route_spec.tls_secret.clone(),
            dns_names: vec![host.to_string()],
            issuer_ref: IssuerReference {
                name: issuer.name.clone(),
                kind: issuer.kind.clone(),
                group: issuer.group.clone(),
            },
        },
        status: None,
    }
}

pub struct AcmeCertificateManager<S> {
    client: ResourceManagerClient<S>,
    recorder: Arc<dyn EventRecorder>,
    issuer: AcmeIssuer,
}

impl<S: ObjectStore> AcmeCertificateManager<S> {
    #[must_use]
    pub fn new(
        client: ResourceManagerClient<S>,
        recorder: Arc<dyn EventRecorder>,
        issuer: AcmeIssuer,
    ) -> Self {
        Self {
            client,
            recorder,
            issuer,
        }
    }
}

#[async_trait]
impl<S: ObjectStore> ResourceManager for AcmeCertificateManager<S> {
    fn kind(&self) -> &'static str {
        KIND_CERTIFICATE
    }

    fn is_required(&self, capp: &Capp) -> bool {
        capp.spec.route_spec.tls_enabled && certificate_host(capp).is_some()
    }

    async fn manage(&self, capp: &Capp) -> Result<(), ManagerError> {
        let host = match certificate_host(capp) {
            Some(host) if capp.spec.route_spec.tls_enabled => host,
            _ => return self.clean_up(capp).await,
        };
        converge(
            &self.client,
            self.recorder.as_ref(),
            capp,
            desired_acme_certificate(capp, &host, &self.issuer),
        )
        .await?;
        prune_certificates_when_safe::<S, Certificate>(&self.client, capp, &host).await
    }

    async fn clean_up(&self, capp: &Capp) -> Result<(), ManagerError> {
        clean_up_all::<S, Certificate>(&self.client, capp).await
    }
}
