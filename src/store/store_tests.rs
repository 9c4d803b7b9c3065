// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::{Capp, CappRevision, CappRevisionSpec, CappSpec, CappTemplate};
    use crate::dependents::{acme, pki};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kube::ResourceExt;

    fn capp(name: &str) -> Capp {
        let mut capp = Capp::new(name, CappSpec::default());
        capp.metadata.namespace = Some("apps".into());
        capp
    }

    fn labelled_capp(name: &str, owner: &str) -> Capp {
        let mut capp = capp(name);
        capp.metadata.labels = Some(crate::labels::ownership_labels(owner));
        capp
    }

    #[test]
    fn test_label_selector_rendering() {
        let labels = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        assert_eq!(label_selector(&labels), "a=1,b=2");
        assert_eq!(label_selector(&BTreeMap::new()), "");
    }

    #[test]
    fn test_labels_match_requires_every_pair() {
        let selector = BTreeMap::from([("a".to_string(), "1".to_string())]);
        let matching = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        let other = BTreeMap::from([("a".to_string(), "2".to_string())]);

        assert!(labels_match(Some(&matching), &selector));
        assert!(!labels_match(Some(&other), &selector));
        assert!(!labels_match(None, &selector));
        assert!(labels_match(None, &BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_create_assigns_version_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let created = store.create(&capp("web")).await.unwrap();
        assert!(created.resource_version().is_some());
        assert!(created.uid().is_some());

        let err = store.create(&capp("web")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        let found: Option<Capp> = store.get("apps", "web").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_stale_gets_hide_existing_object() {
        let store = MemoryStore::new();
        store.create(&capp("web")).await.unwrap();
        store.stale_next_gets::<Capp>(1);

        let stale: Option<Capp> = store.get("apps", "web").await.unwrap();
        assert!(stale.is_none());
        let fresh: Option<Capp> = store.get("apps", "web").await.unwrap();
        assert!(fresh.is_some());

        let err = store.create(&capp("web")).await.unwrap_err();
        assert!(err.is_already_exists());
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemoryStore::new();
        let created = store.create(&capp("web")).await.unwrap();

        let mut first = created.clone();
        first.spec.route_spec.hostname = "a.example.com".into();
        store.update(&first).await.unwrap();

        let mut second = created;
        second.spec.route_spec.hostname = "b.example.com".into();
        let err = store.update(&second).await.unwrap_err();
        assert!(err.is_conflict());

        let stored: Capp = store.get("apps", "web").await.unwrap().unwrap();
        assert_eq!(stored.spec.route_spec.hostname, "a.example.com");
    }

    #[tokio::test]
    async fn test_update_keeps_status_and_status_update_keeps_spec() {
        let store = MemoryStore::new();
        let mut created = store.create(&capp("web")).await.unwrap();

        created.status = Some(crate::crd::CappStatus {
            observed_generation: Some(3),
            ..Default::default()
        });
        let with_status = store.update_status(&created).await.unwrap();
        assert_eq!(with_status.status.as_ref().unwrap().observed_generation, Some(3));

        let mut spec_change = with_status.clone();
        spec_change.spec.route_spec.hostname = "web.example.com".into();
        spec_change.status = None;
        let updated = store.update(&spec_change).await.unwrap();
        assert_eq!(updated.spec.route_spec.hostname, "web.example.com");
        assert_eq!(updated.status.unwrap().observed_generation, Some(3));
    }

    #[tokio::test]
    async fn test_list_filters_by_namespace_and_labels() {
        let store = MemoryStore::new();
        store.create(&labelled_capp("a", "owner-1")).await.unwrap();
        store.create(&labelled_capp("b", "owner-1")).await.unwrap();
        store.create(&labelled_capp("c", "owner-2")).await.unwrap();

        let owned: Vec<Capp> = store
            .list("apps", &crate::labels::ownership_selector("owner-1"))
            .await
            .unwrap();
        let names: Vec<_> = owned.iter().map(ResourceExt::name_any).collect();
        assert_eq!(names, vec!["a", "b"]);

        let elsewhere: Vec<Capp> = store
            .list("other", &crate::labels::ownership_selector("owner-1"))
            .await
            .unwrap();
        assert!(elsewhere.is_empty());
    }

    #[tokio::test]
    async fn test_kinds_with_same_name_do_not_collide() {
        let store = MemoryStore::new();
        let mut a = acme::Certificate::new("web.example.com", acme::CertificateSpec::default());
        a.metadata.namespace = Some("apps".into());
        let mut p = pki::Certificate::new("web.example.com", pki::CertificateSpec::default());
        p.metadata.namespace = Some("apps".into());

        store.create(&a).await.unwrap();
        store.create(&p).await.unwrap();
        assert_eq!(store.names::<acme::Certificate>("apps"), vec!["web.example.com"]);
        assert_eq!(store.names::<pki::Certificate>("apps"), vec!["web.example.com"]);

        store
            .delete::<acme::Certificate>("apps", "web.example.com")
            .await
            .unwrap();
        assert!(store.names::<acme::Certificate>("apps").is_empty());
        assert_eq!(store.names::<pki::Certificate>("apps").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete::<Capp>("apps", "web").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_objects() {
        let store = MemoryStore::new();
        let parent = store.create(&capp("web")).await.unwrap();

        let mut revision = CappRevision::new(
            "web-v1",
            CappRevisionSpec {
                revision_number: 1,
                capp_template: CappTemplate::default(),
            },
        );
        revision.metadata.namespace = Some("apps".into());
        revision.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "rcs.dana.io/v1alpha1".into(),
            kind: "Capp".into(),
            name: "web".into(),
            uid: parent.uid().unwrap(),
            controller: Some(true),
            ..Default::default()
        }]);
        store.create(&revision).await.unwrap();

        store.delete::<Capp>("apps", "web").await.unwrap();
        assert!(store.names::<CappRevision>("apps").is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_is_returned_once_and_counted() {
        let store = MemoryStore::new();
        store.fail_next::<Capp>(
            StoreOp::Create,
            StoreError::Backend {
                kind: "Capp".into(),
                namespace: "apps".into(),
                name: "web".into(),
                message: "boom".into(),
            },
        );

        assert!(store.create(&capp("web")).await.is_err());
        assert!(store.create(&capp("web")).await.is_ok());
        assert_eq!(store.calls::<Capp>(StoreOp::Create), 2);

        store.reset_calls();
        assert_eq!(store.calls::<Capp>(StoreOp::Create), 0);
    }
}
