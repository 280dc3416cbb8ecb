//! Request context and assignment results

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::experiment::{Experiment, Variant};

/// Variant id reported for subjects outside an experiment.
pub const CONTROL_VARIANT_ID: &str = "control";

/// Who is asking, from where, and when.
///
/// The subject id must be stable across visits for assignments to stick;
/// the engine never invents or rotates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    subject_id: String,
    path: Option<String>,
    now: Option<DateTime<Utc>>,
}

impl RequestContext {
    /// Context for a subject with no path, evaluated at the current time.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            path: None,
            now: None,
        }
    }

    /// Set the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Pin the evaluation time.
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Get the subject ID.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Get the request path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The pinned time, or the wall clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// Answer to "what does this subject see for this experiment".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    /// Experiment asked about.
    pub experiment_id: String,
    /// Resolved variant, or `"control"` when not in the test.
    pub variant_id: String,
    /// Display name of the resolved variant.
    pub variant_name: String,
    /// Whether the subject is part of the experiment.
    pub is_in_test: bool,
    /// Opaque variant payload, empty for control.
    pub config: Map<String, Value>,
}

impl AssignmentResult {
    /// The not-in-test default.
    #[must_use]
    pub fn control(experiment_id: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            variant_id: CONTROL_VARIANT_ID.to_string(),
            variant_name: CONTROL_VARIANT_ID.to_string(),
            is_in_test: false,
            config: Map::new(),
        }
    }

    /// An in-test result for a declared variant.
    #[must_use]
    pub fn in_test(experiment: &Experiment, variant: &Variant) -> Self {
        Self {
            experiment_id: experiment.id().to_string(),
            variant_id: variant.id().to_string(),
            variant_name: variant.name().to_string(),
            is_in_test: true,
            config: variant.config().clone(),
        }
    }
}
