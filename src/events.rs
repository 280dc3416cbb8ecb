//! Analytics events and sinks
//!
//! The engine emits exactly two named events and never dictates the
//! transport. Sinks are fire-and-forget: a sink that fails must swallow
//! its own error.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AssignmentResult;

/// Event emitted to the analytics sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A subject was assigned into an experiment for the first time.
    AssignmentCreated {
        /// Experiment id
        test_id: String,
        /// Persisted variant id
        variant_id: String,
        /// Persisted variant display name
        variant_name: String,
    },
    /// A subject in an experiment converted.
    AssignmentConversion {
        /// Experiment id
        test_id: String,
        /// Resolved variant id
        variant_id: String,
        /// Resolved variant display name
        variant_name: String,
        /// Caller-defined conversion kind (e.g. `"purchase"`)
        conversion_type: String,
        /// Optional numeric value (e.g. order total)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
        /// When the conversion was recorded
        timestamp: DateTime<Utc>,
    },
}

impl AnalyticsEvent {
    /// `assignment_created` for a freshly persisted assignment.
    #[must_use]
    pub fn created(result: &AssignmentResult) -> Self {
        Self::AssignmentCreated {
            test_id: result.experiment_id.clone(),
            variant_id: result.variant_id.clone(),
            variant_name: result.variant_name.clone(),
        }
    }

    /// `assignment_conversion` attributed to a resolved assignment.
    #[must_use]
    pub fn conversion(
        result: &AssignmentResult,
        conversion_type: impl Into<String>,
        value: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::AssignmentConversion {
            test_id: result.experiment_id.clone(),
            variant_id: result.variant_id.clone(),
            variant_name: result.variant_name.clone(),
            conversion_type: conversion_type.into(),
            value,
            timestamp,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AssignmentCreated { .. } => "assignment_created",
            Self::AssignmentConversion { .. } => "assignment_conversion",
        }
    }

    /// Experiment the event belongs to.
    #[must_use]
    pub fn test_id(&self) -> &str {
        match self {
            Self::AssignmentCreated { test_id, .. } | Self::AssignmentConversion { test_id, .. } => {
                test_id
            }
        }
    }

    /// Variant the event is attributed to.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        match self {
            Self::AssignmentCreated { variant_id, .. }
            | Self::AssignmentConversion { variant_id, .. } => variant_id,
        }
    }
}

/// External analytics collaborator.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: AnalyticsEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: AnalyticsEvent) {
        (**self).emit(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AnalyticsEvent) {}
}

/// Logs every event at `info` through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AnalyticsEvent) {
        info!(
            event = event.name(),
            test_id = event.test_id(),
            variant_id = event.variant_id(),
            payload = %serde_json::to_string(&event).unwrap_or_default(),
            "analytics event"
        );
    }
}

/// Collects events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Check if no events were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all collected events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
