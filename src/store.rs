//! Assignment Store - persisted sticky assignments
//!
//! A thin typed layer over [`KvStore`]. Each subject owns one key,
//! `"{namespace}:{subject_id}"`, holding a JSON array of [`Assignment`]
//! records. Updates are compare-and-swap loops, so two concurrent first
//! visits for the same subject cannot both create an assignment.

use tracing::warn;

use crate::experiment::Assignment;
use crate::kv::KvStore;
use crate::{Error, Result};

/// Default key namespace for persisted assignments.
pub const DEFAULT_NAMESPACE: &str = "ab_test_assignments";

const MAX_CAS_RETRIES: usize = 16;

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written by this call.
    Inserted(Assignment),
    /// A record already existed; it is returned unchanged.
    Existing(Assignment),
}

impl InsertOutcome {
    /// The assignment now in effect.
    #[must_use]
    pub const fn assignment(&self) -> &Assignment {
        match self {
            Self::Inserted(a) | Self::Existing(a) => a,
        }
    }

    /// Whether this call created the record.
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Persistence for assignments, keyed by `(subject_id, experiment_id)`.
pub trait AssignmentStore: Send + Sync {
    /// Look up a subject's assignment for an experiment.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unavailable or the record is
    /// undecodable.
    fn get(&self, subject_id: &str, experiment_id: &str) -> Result<Option<Assignment>>;

    /// Upsert an assignment, replacing any record for the same experiment.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    fn put(&self, assignment: &Assignment) -> Result<()>;

    /// Persist `assignment` unless the subject already has one for the
    /// experiment, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    fn insert_if_absent(&self, assignment: Assignment) -> Result<InsertOutcome>;

    /// All assignments recorded for a subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is unavailable or the record is
    /// undecodable.
    fn list_for_subject(&self, subject_id: &str) -> Result<Vec<Assignment>>;
}

/// [`AssignmentStore`] backed by any [`KvStore`].
#[derive(Debug)]
pub struct KvAssignmentStore<K> {
    kv: K,
    namespace: String,
}

impl<K: KvStore> KvAssignmentStore<K> {
    /// Wrap a KV store using the default namespace.
    #[must_use]
    pub fn new(kv: K) -> Self {
        Self::with_namespace(kv, DEFAULT_NAMESPACE)
    }

    /// Wrap a KV store using a custom namespace.
    #[must_use]
    pub fn with_namespace(kv: K, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    /// The underlying KV store.
    #[must_use]
    pub const fn kv(&self) -> &K {
        &self.kv
    }

    fn key(&self, subject_id: &str) -> String {
        format!("{}:{subject_id}", self.namespace)
    }

    fn decode(bytes: &[u8]) -> Result<Vec<Assignment>> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read-modify-write the subject's record list.
    ///
    /// `update` reports whether it changed the list; an unchanged list is
    /// not written back. An undecodable list is treated as empty and
    /// overwritten.
    fn modify<T>(
        &self,
        subject_id: &str,
        mut update: impl FnMut(&mut Vec<Assignment>) -> (bool, T),
    ) -> Result<T> {
        let key = self.key(subject_id);
        for _ in 0..MAX_CAS_RETRIES {
            let current = self.kv.get(&key)?;
            let mut records = match current.as_deref().map(Self::decode) {
                None => Vec::new(),
                Some(Ok(records)) => records,
                Some(Err(error)) => {
                    warn!(subject_id, %error, "discarding corrupt assignment list");
                    Vec::new()
                }
            };

            let (changed, out) = update(&mut records);
            if !changed {
                return Ok(out);
            }

            let encoded = serde_json::to_vec(&records)?;
            if self.kv.compare_and_swap(&key, current.as_deref(), encoded)? {
                return Ok(out);
            }
        }
        Err(Error::StorageError(format!(
            "assignment update for subject '{subject_id}' lost {MAX_CAS_RETRIES} compare-and-swap races"
        )))
    }
}

impl<K: KvStore> AssignmentStore for KvAssignmentStore<K> {
    fn get(&self, subject_id: &str, experiment_id: &str) -> Result<Option<Assignment>> {
        Ok(self
            .list_for_subject(subject_id)?
            .into_iter()
            .find(|a| a.experiment_id() == experiment_id))
    }

    fn put(&self, assignment: &Assignment) -> Result<()> {
        self.modify(assignment.subject_session_id(), |records| {
            records.retain(|a| a.experiment_id() != assignment.experiment_id());
            records.push(assignment.clone());
            (true, ())
        })
    }

    fn insert_if_absent(&self, assignment: Assignment) -> Result<InsertOutcome> {
        let subject_id = assignment.subject_session_id().to_string();
        self.modify(&subject_id, |records| {
            match records
                .iter()
                .find(|a| a.experiment_id() == assignment.experiment_id())
            {
                Some(existing) => (false, InsertOutcome::Existing(existing.clone())),
                None => {
                    records.push(assignment.clone());
                    (true, InsertOutcome::Inserted(assignment.clone()))
                }
            }
        })
    }

    fn list_for_subject(&self, subject_id: &str) -> Result<Vec<Assignment>> {
        match self.kv.get(&self.key(subject_id))? {
            Some(bytes) => Self::decode(&bytes),
            None => Ok(Vec::new()),
        }
    }
}
