// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers.
//!
//! Conditions follow the Kubernetes conventions:
//! - `type`: The aspect being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last status flip
//!
//! Everything here is in-memory. Persisting is the caller's job, and callers
//! only write when [`conditions_changed`] or [`status_changed`] says so, to
//! avoid reconcile loops driven by their own status writes.

use crate::crd::Condition;
use chrono::Utc;

/// Condition type reporting whether every dependent converged.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Reason set when every resource manager succeeded.
pub const REASON_DEPENDENTS_READY: &str = "DependentsReconciled";

/// Reason set when at least one resource manager failed.
pub const REASON_DEPENDENTS_FAILED: &str = "DependentsFailed";

/// Create a new condition stamped with the current time.
///
/// # Example
///
/// ```rust,no_run
/// # use capp_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "DependentsReconciled", "3 dependents converged");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place.
///
/// `lastTransitionTime` is preserved when the status does not flip.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        if existing.status != status || existing.last_transition_time.is_none() {
            existing.last_transition_time = Some(Utc::now().to_rfc3339());
        }
        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// `true` if the two lists differ in anything but transition timestamps.
#[must_use]
pub fn conditions_changed(current: &[Condition], new: &[Condition]) -> bool {
    current.len() != new.len()
        || current.iter().zip(new).any(|(a, b)| {
            a.r#type != b.r#type
                || a.status != b.status
                || a.reason != b.reason
                || a.message != b.message
        })
}

/// `true` when a status field must be written.
#[must_use]
pub fn status_changed<T: PartialEq>(current_value: &Option<T>, new_value: &Option<T>) -> bool {
    current_value != new_value
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
