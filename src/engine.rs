//! Assignment Engine
//!
//! Orchestrates registry lookup, activation, bucketing, variant selection
//! and the assignment store. Per `(subject, experiment)`:
//!
//! ```text
//! Unregistered ──────────────────────────────▶ control (not persisted)
//! Registered ─▶ disabled ────────────────────▶ control (not persisted)
//!             ─▶ stored assignment ──────────▶ stored variant (sticky)
//!             ─▶ not eligible ───────────────▶ control (not persisted)
//!             ─▶ eligible ─▶ bucket ─▶ select ─▶ persist ─▶ assignment_created
//! ```
//!
//! Persistence failures never reach callers: a failed read is treated as
//! "no assignment yet", a failed write is logged and the derived variant
//! is still returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::activation::{self, Eligibility};
use crate::attribution::AttributionReporter;
use crate::bucket::bucket;
use crate::context::{AssignmentResult, RequestContext};
use crate::events::{AnalyticsEvent, EventSink, NullSink};
use crate::experiment::{Assignment, Experiment, ExperimentRegistry};
use crate::kv::MemoryKvStore;
use crate::selector::select;
use crate::store::{AssignmentStore, InsertOutcome, KvAssignmentStore};
use crate::Result;

/// Experiment assignment engine.
///
/// Constructed once per process (or per client session) and shared by
/// reference; owns its registry, store and analytics sink.
///
/// # Example
///
/// ```rust
/// use variant_db::{Engine, RequestContext};
/// use variant_db::experiment::{Experiment, Variant};
///
/// let engine = Engine::in_memory();
/// engine.register_experiment(
///     Experiment::builder("checkout_button")
///         .variant(Variant::new("a", 50.0))
///         .variant(Variant::new("b", 50.0))
///         .build(),
/// )?;
///
/// let ctx = RequestContext::new("u1");
/// let first = engine.get_variant("checkout_button", &ctx);
/// let again = engine.get_variant("checkout_button", &ctx);
/// assert!(first.is_in_test);
/// assert_eq!(first, again);
/// # Ok::<(), variant_db::Error>(())
/// ```
pub struct Engine<S = KvAssignmentStore<MemoryKvStore>> {
    registry: ExperimentRegistry,
    store: S,
    sink: Arc<dyn EventSink>,
}

impl Engine {
    /// Engine with an in-memory store, no experiments and a null sink.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            registry: ExperimentRegistry::new(),
            store: KvAssignmentStore::new(MemoryKvStore::new()),
            sink: Arc::new(NullSink),
        }
    }
}

impl<S: AssignmentStore> Engine<S> {
    /// Create a builder around an assignment store.
    #[must_use]
    pub fn builder(store: S) -> EngineBuilder<S> {
        EngineBuilder::new(store)
    }

    /// The experiment registry.
    #[must_use]
    pub const fn registry(&self) -> &ExperimentRegistry {
        &self.registry
    }

    /// The assignment store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Register (or re-register) an experiment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid definition.
    pub fn register_experiment(&self, experiment: Experiment) -> Result<()> {
        self.registry.register(experiment)
    }

    /// Remove an experiment; its stored assignments become stale.
    pub fn remove_experiment(&self, experiment_id: &str) -> Option<Arc<Experiment>> {
        self.registry.remove(experiment_id)
    }

    /// Resolve the variant a subject sees for an experiment.
    ///
    /// Never fails: every problem degrades to the control result.
    pub fn get_variant(&self, experiment_id: &str, ctx: &RequestContext) -> AssignmentResult {
        let subject_id = ctx.subject_id();
        let Some(experiment) = self.registry.get(experiment_id) else {
            debug!(experiment_id, subject_id, "experiment not registered");
            return AssignmentResult::control(experiment_id);
        };
        if !experiment.enabled() {
            debug!(experiment_id, subject_id, "experiment disabled");
            return AssignmentResult::control(experiment_id);
        }

        let mut stale = false;
        match self.store.get(subject_id, experiment_id) {
            Ok(Some(existing)) => {
                if let Some(variant) = experiment.variant(existing.variant_id()) {
                    debug!(experiment_id, subject_id, variant_id = variant.id(), "sticky assignment");
                    return AssignmentResult::in_test(&experiment, variant);
                }
                warn!(
                    experiment_id,
                    subject_id,
                    variant_id = existing.variant_id(),
                    "stored assignment references an unknown variant, re-deriving"
                );
                stale = true;
            }
            Ok(None) => {}
            Err(error) => {
                warn!(experiment_id, subject_id, %error, "assignment read failed, re-deriving");
            }
        }

        let now = ctx.now();
        let eligibility = activation::evaluate(&experiment, ctx, now);
        if eligibility != Eligibility::Eligible {
            debug!(experiment_id, subject_id, reason = eligibility.as_str(), "not eligible");
            return AssignmentResult::control(experiment_id);
        }

        self.assign(&experiment, subject_id, now, stale)
    }

    fn assign(
        &self,
        experiment: &Experiment,
        subject_id: &str,
        now: DateTime<Utc>,
        replace_stale: bool,
    ) -> AssignmentResult {
        let experiment_id = experiment.id();
        let bucket_value = bucket(subject_id, experiment_id);
        let Some(variant) = select(experiment.variants(), bucket_value) else {
            error!(experiment_id, "registered experiment has no variants");
            return AssignmentResult::control(experiment_id);
        };
        let derived = AssignmentResult::in_test(experiment, variant);
        let assignment = Assignment::new(experiment_id, variant.id(), subject_id, now);

        let persisted = if replace_stale {
            self.store
                .put(&assignment)
                .map(|()| InsertOutcome::Inserted(assignment))
        } else {
            self.store.insert_if_absent(assignment)
        };

        match persisted {
            Ok(InsertOutcome::Inserted(_)) => {
                info!(
                    experiment_id,
                    subject_id,
                    variant_id = variant.id(),
                    bucket = bucket_value,
                    "assignment created"
                );
                self.emit(AnalyticsEvent::created(&derived));
                derived
            }
            Ok(InsertOutcome::Existing(existing)) => {
                debug!(experiment_id, subject_id, "lost first-visit race, using stored assignment");
                experiment
                    .variant(existing.variant_id())
                    .map_or(derived, |stored| AssignmentResult::in_test(experiment, stored))
            }
            Err(error) => {
                warn!(experiment_id, subject_id, %error, "assignment write dropped");
                derived
            }
        }
    }

    /// Attribution reporter bound to this engine.
    #[must_use]
    pub const fn reporter(&self) -> AttributionReporter<'_, S> {
        AttributionReporter::new(self)
    }

    /// Record a conversion for the subject's current assignment.
    ///
    /// Returns `true` if an `assignment_conversion` event was emitted.
    pub fn record_conversion(
        &self,
        experiment_id: &str,
        ctx: &RequestContext,
        conversion_type: &str,
        value: Option<f64>,
    ) -> bool {
        self.reporter()
            .record_conversion(experiment_id, ctx, conversion_type, value)
    }

    /// Experiments enabled and inside their window at `now`.
    #[must_use]
    pub fn list_active_experiments(&self, now: DateTime<Utc>) -> Vec<Arc<Experiment>> {
        self.registry.list_active(now)
    }

    /// Every assignment stored for a subject.
    ///
    /// # Errors
    ///
    /// Returns the store's error; this is an introspection path and does
    /// not degrade.
    pub fn list_assignments_for_subject(&self, subject_id: &str) -> Result<Vec<Assignment>> {
        self.store.list_for_subject(subject_id)
    }

    pub(crate) fn emit(&self, event: AnalyticsEvent) {
        self.sink.emit(event);
    }
}

/// Builder for `Engine`.
///
/// Defaults are registered before overrides; within each list the last
/// definition of an id wins.
pub struct EngineBuilder<S> {
    store: S,
    sink: Arc<dyn EventSink>,
    defaults: Vec<Experiment>,
    overrides: Vec<Experiment>,
}

impl<S: AssignmentStore> EngineBuilder<S> {
    /// Create a builder around an assignment store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            sink: Arc::new(NullSink),
            defaults: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Set the analytics sink.
    #[must_use]
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Add built-in default experiments.
    #[must_use]
    pub fn default_experiments(mut self, experiments: impl IntoIterator<Item = Experiment>) -> Self {
        self.defaults.extend(experiments);
        self
    }

    /// Add runtime overrides, merged over the defaults by id.
    #[must_use]
    pub fn overrides(mut self, experiments: impl IntoIterator<Item = Experiment>) -> Self {
        self.overrides.extend(experiments);
        self
    }

    /// Build the engine, registering defaults then overrides.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error; nothing is built on failure.
    pub fn build(self) -> Result<Engine<S>> {
        let registry = ExperimentRegistry::with_defaults(self.defaults)?;
        registry.extend(self.overrides)?;
        Ok(Engine {
            registry,
            store: self.store,
            sink: self.sink,
        })
    }
}
