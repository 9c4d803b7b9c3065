// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! User-visible notifications attached to a `Capp`.
//!
//! Every create attempt by a resource manager or the revision reconciler
//! publishes one event: `Normal` on success, `Warning` on failure. Publishing
//! never fails a reconciliation; errors are logged and dropped.

use crate::crd::Capp;
use async_trait::async_trait;
use kube::runtime::events::{
    Event as KubeEvent, EventType as KubeEventType, Recorder, Reporter,
};
use kube::{Client, Resource, ResourceExt};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Action reported on every published event.
const EVENT_ACTION: &str = "Reconcile";

/// Kubernetes event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// One event to publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

impl Notification {
    pub fn normal(reason: &str, message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Normal,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(reason: &str, message: impl Into<String>) -> Self {
        Self {
            event_type: EventType::Warning,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

/// Sink for notifications about a `Capp`.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn publish(&self, capp: &Capp, notification: Notification);
}

/// Publishes events through the kube runtime [`Recorder`].
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl KubeEventRecorder {
    /// `component` is reported as the controller emitting the events.
    #[must_use]
    pub fn new(client: Client, component: &str) -> Self {
        let reporter = Reporter {
            controller: component.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

impl From<EventType> for KubeEventType {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Normal => KubeEventType::Normal,
            EventType::Warning => KubeEventType::Warning,
        }
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn publish(&self, capp: &Capp, notification: Notification) {
        let event = KubeEvent {
            type_: notification.event_type.into(),
            reason: notification.reason,
            note: Some(notification.message),
            action: EVENT_ACTION.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &capp.object_ref(&())).await {
            warn!(
                "Failed to publish {} event for Capp {}: {}",
                event.reason,
                capp.name_any(),
                e
            );
        }
    }
}

/// An event captured by [`MemoryRecorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub capp: String,
    pub notification: Notification,
}

/// Collects notifications in memory.
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reasons of everything published so far, oldest first.
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|e| e.notification.reason)
            .collect()
    }
}

#[async_trait]
impl EventRecorder for MemoryRecorder {
    async fn publish(&self, capp: &Capp, notification: Notification) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                capp: capp.name_any(),
                notification,
            });
    }
}
