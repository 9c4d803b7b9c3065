// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::ControllerConfig;
    use crate::crd::{
        CappSpec, CappStatus, Condition, DomainMappingObjectStatus, RouteSpec, RouteStatus,
    };
    use crate::dependents::dns_record::CnameRecordStatus;
    use crate::dependents::domain_mapping::DomainMapping;
    use crate::dependents::{acme, pki};
    use crate::events::{EventType, MemoryRecorder};
    use crate::labels::CAPP_RESOURCE_KEY;
    use crate::store::{MemoryStore, StoreOp};

    const NS: &str = "apps";

    fn capp(hostname: &str, tls: bool) -> Capp {
        let mut capp = Capp::new(
            "web",
            CappSpec {
                route_spec: RouteSpec {
                    hostname: hostname.to_string(),
                    tls_enabled: tls,
                    tls_secret: if tls { "web-tls".into() } else { String::new() },
                },
                ..Default::default()
            },
        );
        capp.metadata.namespace = Some(NS.into());
        capp
    }

    fn with_observed_url(mut capp: Capp, url: &str) -> Capp {
        capp.status = Some(CappStatus {
            route_status: RouteStatus {
                domain_mapping_object_status: DomainMappingObjectStatus {
                    url: Some(url.to_string()),
                    conditions: vec![],
                },
            },
            ..Default::default()
        });
        capp
    }

    struct Fixture {
        store: MemoryStore,
        recorder: Arc<MemoryRecorder>,
        client: ResourceManagerClient<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = MemoryStore::new();
            Self {
                client: ResourceManagerClient::new(store.clone()),
                store,
                recorder: Arc::new(MemoryRecorder::new()),
            }
        }

        fn recorder(&self) -> Arc<dyn EventRecorder> {
            self.recorder.clone()
        }

        fn domain_mappings(&self) -> DomainMappingManager<MemoryStore> {
            DomainMappingManager::new(self.client.clone(), self.recorder())
        }

        fn dns_records(&self) -> DnsRecordManager<MemoryStore> {
            DnsRecordManager::new(
                self.client.clone(),
                self.recorder(),
                ControllerConfig::default().dns,
            )
        }

        fn pki_certificates(&self) -> PkiCertificateManager<MemoryStore> {
            PkiCertificateManager::new(self.client.clone(), self.recorder())
        }

        fn acme_certificates(&self) -> AcmeCertificateManager<MemoryStore> {
            AcmeCertificateManager::new(
                self.client.clone(),
                self.recorder(),
                ControllerConfig::default().acme_issuer,
            )
        }

        async fn mark_dns_ready(&self, name: &str) {
            let mut record: CNAMERecord = self.store.get(NS, name).await.unwrap().unwrap();
            record.status = Some(CnameRecordStatus {
                conditions: vec![Condition {
                    r#type: "Ready".into(),
                    status: "True".into(),
                    ..Default::default()
                }],
            });
            self.store.update_status(&record).await.unwrap();
        }
    }

    // ------------------------------------------------------------------
    // Required predicates
    // ------------------------------------------------------------------

    #[test]
    fn test_is_required_predicates() {
        let f = Fixture::new();
        let plain = capp("web.example.com", false);
        let tls = capp("web.example.com", true);
        let none = capp("", true);

        assert!(f.domain_mappings().is_required(&plain));
        assert!(!f.domain_mappings().is_required(&none));
        assert!(f.dns_records().is_required(&plain));
        assert!(!f.dns_records().is_required(&none));

        assert!(!f.pki_certificates().is_required(&plain));
        assert!(f.pki_certificates().is_required(&tls));
        assert!(!f.pki_certificates().is_required(&none));

        assert!(!f.acme_certificates().is_required(&none));
        assert!(f
            .acme_certificates()
            .is_required(&with_observed_url(none, "https://web.apps.serving.local")));
        assert!(!f.acme_certificates().is_required(&plain));
    }

    #[test]
    fn test_managers_for_order_and_backend() {
        let f = Fixture::new();
        let recorder = f.recorder();

        let pki = managers_for(&f.store, &recorder, &ControllerConfig::default());
        let kinds: Vec<_> = pki.iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["DomainMapping", "Certificate", "CNAMERecord"]);

        let acme_config = ControllerConfig {
            certificate_backend: CertificateBackend::Acme,
            ..Default::default()
        };
        let acme = managers_for(&f.store, &recorder, &acme_config);
        // Only the ACME backend falls back to the observed host.
        let fallback = with_observed_url(capp("", true), "https://web.apps.serving.local");
        assert!(acme[1].is_required(&fallback));
        assert!(!pki[1].is_required(&fallback));
    }

    // ------------------------------------------------------------------
    // Convergence
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_manage_twice_creates_once() {
        let f = Fixture::new();
        let manager = f.domain_mappings();
        let capp = capp("web.example.com", false);

        manager.manage(&capp).await.unwrap();
        manager.manage(&capp).await.unwrap();

        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Create), 1);
        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Update), 0);
        assert_eq!(f.recorder.reasons(), vec!["DomainMappingCreated"]);

        let dm: DomainMapping = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        assert_eq!(dm.spec.reference.name, "web");
        assert_eq!(dm.spec.reference.kind, "Service");
        assert_eq!(dm.labels().get(CAPP_RESOURCE_KEY).map(String::as_str), Some("web"));
        assert!(dm.spec.tls.is_none());
    }

    #[tokio::test]
    async fn test_spec_drift_is_updated() {
        let f = Fixture::new();
        let manager = f.domain_mappings();
        manager.manage(&capp("web.example.com", false)).await.unwrap();

        manager.manage(&capp("web.example.com", true)).await.unwrap();

        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Create), 1);
        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Update), 1);
        let dm: DomainMapping = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        assert_eq!(dm.spec.tls.as_ref().unwrap().secret_name, "web-tls");
    }

    #[tokio::test]
    async fn test_missing_ownership_label_is_repaired() {
        let f = Fixture::new();
        let capp = capp("web.example.com", false);
        let mut foreign = desired_domain_mapping_for_test(&capp);
        foreign.metadata.labels = None;
        f.store.create(&foreign).await.unwrap();

        f.domain_mappings().manage(&capp).await.unwrap();

        let dm: DomainMapping = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        assert_eq!(dm.labels().get(CAPP_RESOURCE_KEY).map(String::as_str), Some("web"));
        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Update), 1);
    }

    fn desired_domain_mapping_for_test(capp: &Capp) -> DomainMapping {
        super::super::domain_mapping::desired_domain_mapping(capp, "web.example.com")
    }

    #[tokio::test]
    async fn test_not_required_cleans_up_everything_owned() {
        let f = Fixture::new();
        let manager = f.domain_mappings();
        manager.manage(&capp("web.example.com", false)).await.unwrap();

        manager.manage(&capp("", false)).await.unwrap();

        assert!(f.store.names::<DomainMapping>(NS).is_empty());
    }

    #[tokio::test]
    async fn test_clean_up_tolerates_missing_objects() {
        let f = Fixture::new();
        let capp = with_observed_url(capp("", false), "https://gone.example.com");

        f.domain_mappings().clean_up(&capp).await.unwrap();
        f.dns_records().clean_up(&capp).await.unwrap();
        f.pki_certificates().clean_up(&capp).await.unwrap();
    }

    #[tokio::test]
    async fn test_clean_up_deletes_observed_location() {
        let f = Fixture::new();
        let mut unlabelled = super::super::domain_mapping::desired_domain_mapping(
            &capp("old.example.com", false),
            "old.example.com",
        );
        unlabelled.metadata.labels = None;
        f.store.create(&unlabelled).await.unwrap();

        let capp = with_observed_url(capp("", false), "https://old.example.com");
        f.domain_mappings().clean_up(&capp).await.unwrap();

        assert!(f.store.names::<DomainMapping>(NS).is_empty());
    }

    #[tokio::test]
    async fn test_rename_leaves_single_object() {
        let f = Fixture::new();
        let dm = f.domain_mappings();
        let dns = f.dns_records();

        for hostname in ["a.example.com", "b.example.com"] {
            let capp = capp(hostname, false);
            dm.manage(&capp).await.unwrap();
            dns.manage(&capp).await.unwrap();
        }

        assert_eq!(f.store.names::<DomainMapping>(NS), vec!["b.example.com"]);
        assert_eq!(f.store.names::<CNAMERecord>(NS), vec!["b.example.com"]);
    }

    #[tokio::test]
    async fn test_dns_record_shape() {
        let f = Fixture::new();
        f.dns_records()
            .manage(&capp("web.example.com", false))
            .await
            .unwrap();

        let record: CNAMERecord = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        let defaults = ControllerConfig::default().dns;
        assert_eq!(record.spec.for_provider.name, "web.example.com");
        assert_eq!(record.spec.for_provider.zone, defaults.zone);
        assert_eq!(record.spec.for_provider.target, defaults.cname_target);
        assert_eq!(record.spec.for_provider.ttl, defaults.ttl);
        assert!(!record.is_resolvable());
        assert_eq!(f.recorder.reasons(), vec!["DNSRecordCreated"]);
    }

    #[tokio::test]
    async fn test_pki_certificate_shape() {
        let f = Fixture::new();
        f.pki_certificates()
            .manage(&capp("web.example.com", true))
            .await
            .unwrap();

        let cert: pki::Certificate = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        assert_eq!(cert.spec.certificate_data.subject.common_name, "web.example.com");
        assert_eq!(cert.spec.certificate_data.san.dns, vec!["web.example.com"]);
        assert_eq!(cert.spec.certificate_data.form, "pfx");
        assert_eq!(cert.spec.secret_name, "web-tls");
        assert_eq!(cert.spec.config_ref.name, "certificateconfig-capp");
        assert_eq!(f.recorder.reasons(), vec!["CertificateCreated"]);
    }

    #[tokio::test]
    async fn test_acme_certificate_uses_observed_host_without_hostname() {
        let f = Fixture::new();
        let capp = with_observed_url(capp("", true), "https://web-apps.serving.local");

        f.acme_certificates().manage(&capp).await.unwrap();

        let cert: acme::Certificate = f
            .store
            .get(NS, "web-apps.serving.local")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cert.spec.dns_names, vec!["web-apps.serving.local"]);
        assert_eq!(cert.spec.issuer_ref.kind, "ClusterIssuer");
        assert_eq!(cert.spec.issuer_ref.group, "cert-manager.io");
    }

    // ------------------------------------------------------------------
    // Failures
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_failure_publishes_warning_and_surfaces() {
        let f = Fixture::new();
        f.store.fail_next::<DomainMapping>(
            StoreOp::Create,
            StoreError::Backend {
                kind: "DomainMapping".into(),
                namespace: NS.into(),
                name: "web.example.com".into(),
                message: "admission webhook denied".into(),
            },
        );

        let err = f
            .domain_mappings()
            .manage(&capp("web.example.com", false))
            .await
            .unwrap_err();

        assert_eq!(err.action, "create");
        assert_eq!(err.kind, "DomainMapping");
        assert!(!err.is_conflict());

        let events = f.recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].notification.event_type, EventType::Warning);
        assert_eq!(events[0].notification.reason, "DomainMappingCreationFailed");
        assert_eq!(
            events[0].notification.message,
            "Failed to create DomainMapping web.example.com"
        );
    }

    #[tokio::test]
    async fn test_create_race_converges_the_winner() {
        let f = Fixture::new();
        let mut winner = desired_domain_mapping_for_test(&capp("web.example.com", false));
        winner.metadata.labels = None;
        f.store.create(&winner).await.unwrap();
        f.store.stale_next_gets::<DomainMapping>(1);

        f.domain_mappings()
            .manage(&capp("web.example.com", true))
            .await
            .unwrap();

        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Create), 2);
        assert_eq!(f.store.calls::<DomainMapping>(StoreOp::Update), 1);
        assert_eq!(f.store.names::<DomainMapping>(NS), vec!["web.example.com"]);
        let dm: DomainMapping = f.store.get(NS, "web.example.com").await.unwrap().unwrap();
        assert_eq!(dm.spec.tls.as_ref().unwrap().secret_name, "web-tls");
        assert_eq!(dm.labels().get(CAPP_RESOURCE_KEY).map(String::as_str), Some("web"));
        assert!(f.recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_already_exists_without_object_surfaces() {
        let f = Fixture::new();
        f.store.fail_next::<DomainMapping>(
            StoreOp::Create,
            StoreError::AlreadyExists {
                kind: "DomainMapping".into(),
                namespace: NS.into(),
                name: "web.example.com".into(),
            },
        );

        let err = f
            .domain_mappings()
            .manage(&capp("web.example.com", false))
            .await
            .unwrap_err();

        assert_eq!(err.action, "create");
        assert!(err.source.is_already_exists());
        assert!(!err.is_conflict());
        assert_eq!(f.recorder.reasons(), vec!["DomainMappingCreationFailed"]);
    }

    #[tokio::test]
    async fn test_update_conflict_propagates() {
        let f = Fixture::new();
        let manager = f.domain_mappings();
        manager.manage(&capp("web.example.com", false)).await.unwrap();

        f.store.fail_next::<DomainMapping>(
            StoreOp::Update,
            StoreError::Conflict {
                kind: "DomainMapping".into(),
                namespace: NS.into(),
                name: "web.example.com".into(),
                message: "stale".into(),
            },
        );
        let err = manager
            .manage(&capp("web.example.com", true))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    // ------------------------------------------------------------------
    // Certificate safety ordering
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_certificate_prune_waits_for_dns() {
        let f = Fixture::new();
        let certs = f.pki_certificates();
        let dns = f.dns_records();

        let old = capp("a.example.com", true);
        certs.manage(&old).await.unwrap();
        dns.manage(&old).await.unwrap();

        let new = capp("b.example.com", true);
        certs.manage(&new).await.unwrap();
        dns.manage(&new).await.unwrap();

        // New DNS record not resolvable yet: both certificates stay.
        assert_eq!(
            f.store.names::<pki::Certificate>(NS),
            vec!["a.example.com", "b.example.com"]
        );
        certs.manage(&new).await.unwrap();
        assert_eq!(f.store.names::<pki::Certificate>(NS).len(), 2);

        f.mark_dns_ready("b.example.com").await;
        certs.manage(&new).await.unwrap();
        assert_eq!(f.store.names::<pki::Certificate>(NS), vec!["b.example.com"]);
    }

    #[tokio::test]
    async fn test_acme_certificate_prune_waits_for_dns() {
        let f = Fixture::new();
        let certs = f.acme_certificates();
        let dns = f.dns_records();

        certs.manage(&capp("a.example.com", true)).await.unwrap();
        let new = capp("b.example.com", true);
        certs.manage(&new).await.unwrap();
        assert_eq!(f.store.names::<acme::Certificate>(NS).len(), 2);

        dns.manage(&new).await.unwrap();
        f.mark_dns_ready("b.example.com").await;
        certs.manage(&new).await.unwrap();
        assert_eq!(f.store.names::<acme::Certificate>(NS), vec!["b.example.com"]);
    }

    #[tokio::test]
    async fn test_tls_disabled_removes_certificates_immediately() {
        let f = Fixture::new();
        let certs = f.pki_certificates();
        certs.manage(&capp("web.example.com", true)).await.unwrap();

        certs.manage(&capp("web.example.com", false)).await.unwrap();

        assert!(f.store.names::<pki::Certificate>(NS).is_empty());
    }
}
