// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route status of a `Capp`, derived from its observed `DomainMapping`.
//!
//! Without a custom hostname the route status is the zero value. With one,
//! the URL and conditions reported by the serving engine on the
//! `DomainMapping` named by the hostname are copied verbatim.

use crate::crd::{Capp, DomainMappingObjectStatus, RouteStatus};
use crate::dependents::domain_mapping::DomainMapping;
use crate::errors::StoreError;
use crate::store::ObjectStore;
use kube::ResourceExt;

/// Route status implied by `capp` and the `DomainMapping` observed for it.
#[must_use]
pub fn desired_route_status(capp: &Capp, observed: Option<&DomainMapping>) -> RouteStatus {
    if capp.hostname().is_none() {
        return RouteStatus::default();
    }
    let status = observed.and_then(|dm| dm.status.as_ref());
    RouteStatus {
        domain_mapping_object_status: DomainMappingObjectStatus {
            url: status.and_then(|s| s.url.clone()),
            conditions: status.map(|s| s.conditions.clone()).unwrap_or_default(),
        },
    }
}

/// Read the current `DomainMapping` and derive the route status from it.
///
/// # Errors
///
/// Returns the store error if the `DomainMapping` cannot be read.
pub async fn observe_route_status<S: ObjectStore>(
    store: &S,
    capp: &Capp,
) -> Result<RouteStatus, StoreError> {
    let observed = match capp.hostname() {
        Some(hostname) => {
            store
                .get::<DomainMapping>(&capp.namespace().unwrap_or_default(), hostname)
                .await?
        }
        None => None,
    };
    Ok(desired_route_status(capp, observed.as_ref()))
}

#[cfg(test)]
#[path = "route_status_tests.rs"]
mod route_status_tests;
