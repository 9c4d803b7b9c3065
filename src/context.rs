// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both controllers.
//!
//! The Capp controller and the revision controller each receive an
//! `Arc<Context<S>>` holding:
//! - the object store every read and write goes through
//! - the event recorder for user-visible notifications
//! - the process configuration
//! - the resource managers, built once at startup
//! - the change tracker filtering revision work
//!
//! `S` is [`KubeStore`](crate::store::KubeStore) in the binary and
//! [`MemoryStore`](crate::store::MemoryStore) in tests.

use crate::config::ControllerConfig;
use crate::events::EventRecorder;
use crate::reconcilers::changes::ChangeTracker;
use crate::reconcilers::managers::{managers_for, ResourceManager};
use crate::store::ObjectStore;
use std::sync::Arc;

/// Shared context passed to all controllers.
pub struct Context<S: ObjectStore> {
    /// Object store for reads and writes
    pub store: S,

    /// Sink for `Normal` / `Warning` events about a `Capp`
    pub recorder: Arc<dyn EventRecorder>,

    /// Process configuration
    pub config: Arc<ControllerConfig>,

    /// Resource managers in reconciliation order
    pub managers: Vec<Box<dyn ResourceManager>>,

    /// Last handled version of each `Capp`, for the revision controller
    pub revision_tracker: ChangeTracker,
}

impl<S: ObjectStore> Context<S> {
    /// Build the context and its resource managers.
    #[must_use]
    pub fn new(store: S, recorder: Arc<dyn EventRecorder>, config: ControllerConfig) -> Self {
        let managers = managers_for(&store, &recorder, &config);
        Self {
            store,
            recorder,
            config: Arc::new(config),
            managers,
            revision_tracker: ChangeTracker::new(),
        }
    }

    /// Kinds of the registered managers, in order.
    #[must_use]
    pub fn manager_kinds(&self) -> Vec<&'static str> {
        self.managers.iter().map(|m| m.kind()).collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
