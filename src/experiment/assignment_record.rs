//! Assignment Record - durable fact about one subject/experiment pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subject's sticky variant for one experiment.
///
/// Immutable once created. The persisted layout is
/// `{experimentId, variantId, assignedAtEpochMillis, subjectSessionId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    experiment_id: String,
    variant_id: String,
    assigned_at_epoch_millis: i64,
    subject_session_id: String,
}

impl Assignment {
    /// Create an assignment made at `assigned_at`.
    #[must_use]
    pub fn new(
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
        subject_session_id: impl Into<String>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            variant_id: variant_id.into(),
            assigned_at_epoch_millis: assigned_at.timestamp_millis(),
            subject_session_id: subject_session_id.into(),
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the assigned variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the subject this assignment belongs to.
    #[must_use]
    pub fn subject_session_id(&self) -> &str {
        &self.subject_session_id
    }

    /// Assignment time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn assigned_at_epoch_millis(&self) -> i64 {
        self.assigned_at_epoch_millis
    }

    /// Assignment time, if representable.
    #[must_use]
    pub fn assigned_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.assigned_at_epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_layout_is_camel_case() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let a = Assignment::new("exp", "b", "u1", at);
        let json = serde_json::to_value(&a).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "experimentId": "exp",
                "variantId": "b",
                "assignedAtEpochMillis": 1_700_000_000_123_i64,
                "subjectSessionId": "u1",
            })
        );
        assert_eq!(a.assigned_at(), Some(at));
    }
}
