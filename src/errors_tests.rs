// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use super::super::*;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(Box::new(kube::core::Status {
            status: Some(kube::core::response::StatusSummary::Failure),
            message: format!("{reason} from api server"),
            reason: reason.to_string(),
            code,
            metadata: None,
            details: None,
        }))
    }

    fn conflict() -> StoreError {
        StoreError::Conflict {
            kind: "DomainMapping".into(),
            namespace: "apps".into(),
            name: "web.example.com".into(),
            message: "the object has been modified".into(),
        }
    }

    fn backend() -> StoreError {
        StoreError::Backend {
            kind: "Certificate".into(),
            namespace: "apps".into(),
            name: "web.example.com".into(),
            message: "connection refused".into(),
        }
    }

    fn manager_error(source: StoreError) -> ManagerError {
        ManagerError {
            kind: "DomainMapping".into(),
            action: "update",
            namespace: "apps".into(),
            name: "web.example.com".into(),
            source,
        }
    }

    #[test]
    fn test_from_kube_classifies_by_code() {
        let not_found = StoreError::from_kube(api_error(404, "NotFound"), "Capp", "apps", "web");
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = StoreError::from_kube(api_error(409, "Conflict"), "Capp", "apps", "web");
        assert!(matches!(conflict, StoreError::Conflict { .. }));
        assert!(conflict.is_conflict());

        let exists =
            StoreError::from_kube(api_error(409, "AlreadyExists"), "Capp", "apps", "web");
        assert!(matches!(exists, StoreError::AlreadyExists { .. }));
        assert!(exists.is_already_exists());
        assert!(!exists.is_conflict());

        let forbidden = StoreError::from_kube(api_error(403, "Forbidden"), "Capp", "apps", "web");
        assert!(matches!(forbidden, StoreError::Backend { .. }));
        assert!(!forbidden.is_conflict());
    }

    #[test]
    fn test_manager_error_carries_context() {
        let err = manager_error(backend());
        let text = err.to_string();
        assert!(text.contains("update"));
        assert!(text.contains("DomainMapping"));
        assert!(text.contains("apps/web.example.com"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_reconcile_error_conflict_found_in_aggregate() {
        let err = ReconcileError::Managers {
            namespace: "apps".into(),
            name: "web".into(),
            errors: vec![manager_error(backend()), manager_error(conflict())],
        };
        assert!(err.is_conflict());
        assert_eq!(err.metric_label(), "manager");
    }

    #[test]
    fn test_reconcile_error_without_conflict() {
        let err = ReconcileError::Managers {
            namespace: "apps".into(),
            name: "web".into(),
            errors: vec![manager_error(backend())],
        };
        assert!(!err.is_conflict());

        let timeout = ReconcileError::Timeout {
            namespace: "apps".into(),
            name: "web".into(),
            seconds: 30,
        };
        assert!(!timeout.is_conflict());
        assert!(timeout.to_string().contains("30s"));
    }

    #[test]
    fn test_aggregate_message_lists_every_failure() {
        let err = ReconcileError::Managers {
            namespace: "apps".into(),
            name: "web".into(),
            errors: vec![manager_error(backend()), manager_error(conflict())],
        };
        let text = err.to_string();
        assert!(text.contains("connection refused"));
        assert!(text.contains("the object has been modified"));
    }
}
