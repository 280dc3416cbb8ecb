//! Experiment Registry - the effective set of configured experiments
//!
//! Built-in defaults are registered first, then runtime overrides merged
//! by id (last write wins). Every registration is validated; a bad
//! definition is a fatal error for the caller, never a silent "control".

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use super::Experiment;
use crate::{Error, Result};

/// Concurrent registry of experiments keyed by id.
///
/// ## Design
///
/// Experiments are stored behind `Arc` so lookups on the assignment path
/// are a clone of a pointer, and re-registration swaps the whole
/// definition atomically per id.
#[derive(Debug, Default)]
pub struct ExperimentRegistry {
    experiments: DashMap<String, Arc<Experiment>>,
}

impl ExperimentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error among `defaults`.
    pub fn with_defaults(defaults: impl IntoIterator<Item = Experiment>) -> Result<Self> {
        let registry = Self::new();
        registry.extend(defaults)?;
        Ok(registry)
    }

    /// Register (or re-register) an experiment.
    ///
    /// Re-registration may change weights, names, configs and activation
    /// rules, and may add variants. It may not drop a variant id that
    /// subjects could already be holding.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the definition is invalid or
    /// removes a previously declared variant.
    ///
    /// The stored copy carries a compiled `target_url_pattern`.
    pub fn register(&self, mut experiment: Experiment) -> Result<()> {
        experiment.validate()?;
        experiment.compile_url_pattern()?;

        match self.experiments.entry(experiment.id().to_string()) {
            Entry::Occupied(mut entry) => {
                if let Some(removed) = entry
                    .get()
                    .variants()
                    .iter()
                    .find(|old| experiment.variant(old.id()).is_none())
                {
                    return Err(Error::VariantRemoved {
                        experiment_id: experiment.id().to_string(),
                        variant_id: removed.id().to_string(),
                    });
                }
                info!(experiment_id = experiment.id(), "experiment re-registered");
                entry.insert(Arc::new(experiment));
            }
            Entry::Vacant(entry) => {
                info!(
                    experiment_id = experiment.id(),
                    variants = experiment.variants().len(),
                    "experiment registered"
                );
                entry.insert(Arc::new(experiment));
            }
        }
        Ok(())
    }

    /// Merge a list of experiments, in order (last write wins by id).
    ///
    /// # Errors
    ///
    /// Stops at and returns the first configuration error.
    pub fn extend(&self, experiments: impl IntoIterator<Item = Experiment>) -> Result<()> {
        for experiment in experiments {
            self.register(experiment)?;
        }
        Ok(())
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<Arc<Experiment>> {
        self.experiments
            .get(experiment_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Remove an experiment. Its stored assignments become stale.
    pub fn remove(&self, experiment_id: &str) -> Option<Arc<Experiment>> {
        let removed = self.experiments.remove(experiment_id).map(|(_, exp)| exp);
        if removed.is_some() {
            info!(experiment_id, "experiment removed");
        }
        removed
    }

    /// Experiments that are enabled and inside their window at `now`,
    /// ordered by id.
    #[must_use]
    pub fn list_active(&self, now: DateTime<Utc>) -> Vec<Arc<Experiment>> {
        let mut active: Vec<Arc<Experiment>> = self
            .experiments
            .iter()
            .filter(|entry| entry.enabled() && entry.in_window(now))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        active.sort_by(|a, b| a.id().cmp(b.id()));
        active
    }

    /// All registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.experiments.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get the number of registered experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

/// Parse a JSON array of experiment definitions.
///
/// # Errors
///
/// Returns `Error::Serialization` on malformed JSON. Definitions are not
/// validated here; validation happens when they are registered.
pub fn load_experiments_json(json: &str) -> Result<Vec<Experiment>> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a JSON file of experiment definitions.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, or
/// `Error::Serialization` on malformed JSON.
pub fn load_experiments_file(path: impl AsRef<Path>) -> Result<Vec<Experiment>> {
    let json = std::fs::read_to_string(path)?;
    load_experiments_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Variant;
    use chrono::Duration;

    fn exp(id: &str, variants: &[(&str, f64)]) -> Experiment {
        variants
            .iter()
            .fold(Experiment::builder(id), |b, (v, w)| b.variant(Variant::new(*v, *w)))
            .build()
    }

    #[test]
    fn test_registry_default() {
        let registry = ExperimentRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_and_get() {
        let registry = ExperimentRegistry::new();
        registry.register(exp("exp-1", &[("a", 1.0)])).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("exp-1").unwrap().id(), "exp-1");
    }

    #[test]
    fn test_register_rejects_invalid() {
        let registry = ExperimentRegistry::new();
        let err = registry.register(exp("exp-1", &[])).unwrap_err();
        assert!(err.is_configuration());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_overflowing_weights() {
        let registry = ExperimentRegistry::new();
        let err = registry
            .register(exp("exp-1", &[("a", 1e308), ("b", 1e308)]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTotalWeight { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_compiles_url_pattern() {
        let registry = ExperimentRegistry::new();
        registry
            .register(
                Experiment::builder("exp-1")
                    .variant(Variant::new("a", 1.0))
                    .target_url_pattern("/checkout*")
                    .build(),
            )
            .unwrap();

        let stored = registry.get("exp-1").unwrap();
        let matcher = stored.url_matcher().unwrap();
        assert!(matcher.is_match("/checkout/pay"));
        assert!(!matcher.is_match("/cart"));
    }

    #[test]
    fn test_overrides_last_write_wins() {
        let registry = ExperimentRegistry::with_defaults([exp("exp-1", &[("a", 1.0), ("b", 1.0)])])
            .unwrap();
        registry
            .extend([
                exp("exp-1", &[("a", 3.0), ("b", 1.0)]),
                exp("exp-2", &[("x", 1.0)]),
                exp("exp-1", &[("a", 9.0), ("b", 1.0), ("c", 1.0)]),
            ])
            .unwrap();

        let merged = registry.get("exp-1").unwrap();
        assert_eq!(merged.variants().len(), 3);
        assert!((merged.variants()[0].weight() - 9.0).abs() < f64::EPSILON);
        assert_eq!(registry.ids(), vec!["exp-1".to_string(), "exp-2".to_string()]);
    }

    #[test]
    fn test_reregistration_cannot_drop_variant() {
        let registry = ExperimentRegistry::new();
        registry.register(exp("exp-1", &[("a", 1.0), ("b", 1.0)])).unwrap();

        let err = registry.register(exp("exp-1", &[("a", 1.0)])).unwrap_err();
        assert!(matches!(err, Error::VariantRemoved { variant_id, .. } if variant_id == "b"));

        // Original definition is untouched
        assert_eq!(registry.get("exp-1").unwrap().variants().len(), 2);
    }

    #[test]
    fn test_remove_then_register_fresh_variant_set() {
        let registry = ExperimentRegistry::new();
        registry.register(exp("exp-1", &[("a", 1.0), ("b", 1.0)])).unwrap();
        assert!(registry.remove("exp-1").is_some());
        assert!(registry.remove("exp-1").is_none());

        registry.register(exp("exp-1", &[("z", 1.0)])).unwrap();
        assert!(registry.get("exp-1").unwrap().variant("z").is_some());
    }

    #[test]
    fn test_list_active_filters_and_sorts() {
        let now = Utc::now();
        let registry = ExperimentRegistry::new();
        registry.register(exp("b-live", &[("a", 1.0)])).unwrap();
        registry.register(exp("a-live", &[("a", 1.0)])).unwrap();
        registry
            .register(
                Experiment::builder("off")
                    .variant(Variant::new("a", 1.0))
                    .enabled(false)
                    .build(),
            )
            .unwrap();
        registry
            .register(
                Experiment::builder("future")
                    .variant(Variant::new("a", 1.0))
                    .start_time(now + Duration::days(1))
                    .build(),
            )
            .unwrap();

        let ids: Vec<String> = registry
            .list_active(now)
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a-live", "b-live"]);
    }

    #[test]
    fn test_load_experiments_json() {
        let experiments = load_experiments_json(
            r#"[
                {"id": "hero", "variants": [{"id": "a", "weight": 1}]},
                {"id": "cta", "enabled": false, "variants": [{"id": "x", "weight": 2}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(experiments.len(), 2);
        assert!(!experiments[1].enabled());
    }

    #[test]
    fn test_load_experiments_json_malformed() {
        assert!(matches!(
            load_experiments_json("{not json"),
            Err(Error::Serialization(_))
        ));
    }
}
