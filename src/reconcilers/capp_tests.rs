// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::ControllerConfig;
    use crate::crd::{CappSpec, Condition, RevisionInfo, RouteSpec};
    use crate::dependents::dns_record::CNAMERecord;
    use crate::dependents::domain_mapping::{DomainMapping, DomainMappingStatus};
    use crate::dependents::pki::Certificate;
    use crate::errors::StoreError;
    use crate::events::MemoryRecorder;
    use crate::reconcilers::status::find_condition;
    use crate::store::{MemoryStore, StoreOp};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use std::sync::Arc;
    use std::time::Duration;

    const NS: &str = "apps";

    fn context(store: &MemoryStore) -> Context<MemoryStore> {
        Context::new(
            store.clone(),
            Arc::new(MemoryRecorder::new()),
            ControllerConfig::default(),
        )
    }

    async fn seed(store: &MemoryStore, hostname: &str, tls: bool) -> Capp {
        let mut capp = Capp::new(
            "web",
            CappSpec {
                route_spec: RouteSpec {
                    hostname: hostname.to_string(),
                    tls_enabled: tls,
                    tls_secret: String::new(),
                },
                ..Default::default()
            },
        );
        capp.metadata.namespace = Some(NS.into());
        capp.metadata.generation = Some(1);
        store.create(&capp).await.unwrap()
    }

    async fn stored(store: &MemoryStore) -> Capp {
        store.get::<Capp>(NS, "web").await.unwrap().unwrap()
    }

    fn conflict(kind: &str, name: &str) -> StoreError {
        StoreError::Conflict {
            kind: kind.into(),
            namespace: NS.into(),
            name: name.into(),
            message: "the object has been modified".into(),
        }
    }

    #[tokio::test]
    async fn test_missing_capp_is_done() {
        let store = MemoryStore::new();
        let ctx = context(&store);
        let outcome = reconcile_capp(&ctx, NS, "web").await.unwrap();
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(store.calls::<DomainMapping>(StoreOp::Get), 0);
    }

    #[tokio::test]
    async fn test_deleting_capp_is_left_alone() {
        let store = MemoryStore::new();
        let mut capp = seed(&store, "web.example.com", false).await;
        capp.metadata.deletion_timestamp = Some(Time(k8s_openapi::jiff::Timestamp::now()));
        store.update(&capp).await.unwrap();
        let ctx = context(&store);

        assert_eq!(reconcile_capp(&ctx, NS, "web").await.unwrap(), Outcome::Done);
        assert!(store.names::<DomainMapping>(NS).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_creates_every_required_dependent() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", true).await;
        let ctx = context(&store);

        assert_eq!(reconcile_capp(&ctx, NS, "web").await.unwrap(), Outcome::Done);

        assert_eq!(store.names::<DomainMapping>(NS), vec!["web.example.com"]);
        assert_eq!(store.names::<Certificate>(NS), vec!["web.example.com"]);
        assert_eq!(store.names::<CNAMERecord>(NS), vec!["web.example.com"]);

        let status = stored(&store).await.status.unwrap();
        let ready = find_condition(&status.conditions, "Ready").unwrap();
        assert_eq!(ready.status, "True");
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(status.route_status.domain_mapping_object_status.url, None);
    }

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", true).await;
        let ctx = context(&store);

        reconcile_capp(&ctx, NS, "web").await.unwrap();
        store.reset_calls();
        reconcile_capp(&ctx, NS, "web").await.unwrap();

        assert_eq!(store.calls::<DomainMapping>(StoreOp::Create), 0);
        assert_eq!(store.calls::<DomainMapping>(StoreOp::Update), 0);
        assert_eq!(store.calls::<Certificate>(StoreOp::Update), 0);
        assert_eq!(store.calls::<CNAMERecord>(StoreOp::Update), 0);
        assert_eq!(store.calls::<Capp>(StoreOp::UpdateStatus), 0);
    }

    #[tokio::test]
    async fn test_route_status_copied_from_domain_mapping() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", false).await;
        let ctx = context(&store);
        reconcile_capp(&ctx, NS, "web").await.unwrap();

        let mut dm: DomainMapping = store.get(NS, "web.example.com").await.unwrap().unwrap();
        let ready = Condition {
            r#type: "Ready".into(),
            status: "True".into(),
            ..Default::default()
        };
        dm.status = Some(DomainMappingStatus {
            url: Some("https://web.example.com".into()),
            conditions: vec![ready.clone()],
        });
        store.update_status(&dm).await.unwrap();

        reconcile_capp(&ctx, NS, "web").await.unwrap();

        let capp = stored(&store).await;
        let route = capp.status.unwrap().route_status.domain_mapping_object_status;
        assert_eq!(route.url.as_deref(), Some("https://web.example.com"));
        assert_eq!(route.conditions, vec![ready]);
    }

    #[tokio::test]
    async fn test_route_status_reset_without_hostname() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", false).await;
        let ctx = context(&store);
        reconcile_capp(&ctx, NS, "web").await.unwrap();

        let mut capp = stored(&store).await;
        capp.status
            .as_mut()
            .unwrap()
            .route_status
            .domain_mapping_object_status
            .url = Some("https://web.example.com".into());
        let capp = store.update_status(&capp).await.unwrap();

        let mut cleared = capp.clone();
        cleared.spec.route_spec.hostname.clear();
        store.update(&cleared).await.unwrap();

        reconcile_capp(&ctx, NS, "web").await.unwrap();

        let capp = stored(&store).await;
        assert_eq!(capp.status.unwrap().route_status, RouteStatus::default());
        assert!(store.names::<DomainMapping>(NS).is_empty());
        assert!(store.names::<CNAMERecord>(NS).is_empty());
    }

    #[tokio::test]
    async fn test_all_managers_run_after_a_failure() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", true).await;
        store.fail_next::<DomainMapping>(
            StoreOp::Create,
            StoreError::Backend {
                kind: "DomainMapping".into(),
                namespace: NS.into(),
                name: "web.example.com".into(),
                message: "admission webhook denied the request".into(),
            },
        );
        let ctx = context(&store);

        let err = reconcile_capp(&ctx, NS, "web").await.unwrap_err();
        match &err {
            ReconcileError::Managers { errors, name, .. } => {
                assert_eq!(name, "web");
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, "DomainMapping");
            }
            other => panic!("expected manager errors, got {other:?}"),
        }

        assert_eq!(store.names::<Certificate>(NS), vec!["web.example.com"]);
        assert_eq!(store.names::<CNAMERecord>(NS), vec!["web.example.com"]);

        let status = stored(&store).await.status.unwrap();
        let ready = find_condition(&status.conditions, "Ready").unwrap();
        assert_eq!(ready.status, "False");
        assert_eq!(ready.reason.as_deref(), Some("DependentsFailed"));
    }

    #[tokio::test]
    async fn test_manager_conflict_requeues_without_status_write() {
        let store = MemoryStore::new();
        seed(&store, "web.example.com", false).await;
        let ctx = context(&store);
        reconcile_capp(&ctx, NS, "web").await.unwrap();

        let mut capp = stored(&store).await;
        capp.spec.route_spec.tls_enabled = true;
        capp.spec.route_spec.tls_secret = "web-tls".into();
        store.update(&capp).await.unwrap();
        store.fail_next::<DomainMapping>(
            StoreOp::Update,
            conflict("DomainMapping", "web.example.com"),
        );
        store.reset_calls();

        let outcome = reconcile_capp(&ctx, NS, "web").await.unwrap();
        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(5)));
        assert_eq!(store.calls::<Capp>(StoreOp::UpdateStatus), 0);
    }

    #[tokio::test]
    async fn test_status_conflict_requeues() {
        let store = MemoryStore::new();
        seed(&store, "", false).await;
        store.fail_next::<Capp>(StoreOp::UpdateStatus, conflict("Capp", "web"));
        let ctx = context(&store);

        let outcome = reconcile_capp(&ctx, NS, "web").await.unwrap();
        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_surfaced() {
        let store = MemoryStore::new();
        store.fail_next::<Capp>(
            StoreOp::Get,
            StoreError::Backend {
                kind: "Capp".into(),
                namespace: NS.into(),
                name: "web".into(),
                message: "connection refused".into(),
            },
        );
        let ctx = context(&store);

        let err = reconcile_capp(&ctx, NS, "web").await.unwrap_err();
        assert!(matches!(err, ReconcileError::Fetch { .. }));
        assert_eq!(err.metric_label(), "fetch");
    }

    #[test]
    fn test_desired_status_keeps_revision_info() {
        let mut capp = Capp::new("web", CappSpec::default());
        capp.metadata.generation = Some(4);
        capp.status = Some(CappStatus {
            revision_info: Some(RevisionInfo {
                latest_revision: "web-v2".into(),
                revision_count: 2,
            }),
            ..Default::default()
        });

        let status = desired_status(&capp, RouteStatus::default(), &[]);
        assert_eq!(status.revision_info.unwrap().latest_revision, "web-v2");
        assert_eq!(status.observed_generation, Some(4));
    }

    #[test]
    fn test_status_needs_update_ignores_timestamps() {
        let capp = Capp::new("web", CappSpec::default());
        let first = desired_status(&capp, RouteStatus::default(), &[]);
        assert!(status_needs_update(None, &first));

        let mut later = first.clone();
        later.conditions[0].last_transition_time = Some("2030-01-01T00:00:00Z".into());
        assert!(!status_needs_update(Some(&first), &later));

        later.observed_generation = Some(9);
        assert!(status_needs_update(Some(&first), &later));
    }
}
