//! Experiment Record - configuration for one test

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::Variant;
use crate::activation::compile_path_pattern;
use crate::{Error, Result};

/// Predicate over subject ids deciding audience membership.
pub type AudiencePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

const fn default_traffic_allocation() -> f64 {
    100.0
}

const fn default_enabled() -> bool {
    true
}

/// Experiment configuration.
///
/// `name` and `description` are display-only. Variants are kept in
/// declaration order, which the variant selector depends on.
///
/// Deserializes from the camelCase JSON layout used by override files:
///
/// ```rust
/// use variant_db::experiment::Experiment;
///
/// let exp: Experiment = serde_json::from_str(r#"{
///     "id": "checkout_button",
///     "variants": [{"id": "a", "weight": 50}, {"id": "b", "weight": 50}],
///     "trafficAllocation": 100,
///     "targetUrlPattern": "/checkout*"
/// }"#)?;
/// assert!(exp.enabled());
/// assert_eq!(exp.variants().len(), 2);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    variants: Vec<Variant>,
    #[serde(default = "default_traffic_allocation")]
    traffic_allocation: f64,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_url_pattern: Option<String>,
    #[serde(skip)]
    url_matcher: Option<Regex>,
    #[serde(skip)]
    audience: Option<AudiencePredicate>,
}

impl Experiment {
    /// Create a builder for an experiment with the given ID.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(id)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the display description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Variants in declaration order.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Look up a variant by id.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id() == variant_id)
    }

    /// Percentage of eligible subjects included in the test.
    #[must_use]
    pub const fn traffic_allocation(&self) -> f64 {
        self.traffic_allocation
    }

    /// Master switch.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Inclusive window start, if bounded.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Inclusive window end, if bounded.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Path glob the request must match, if any.
    #[must_use]
    pub fn target_url_pattern(&self) -> Option<&str> {
        self.target_url_pattern.as_deref()
    }

    /// Compiled form of `target_url_pattern`, present once registered.
    #[must_use]
    pub const fn url_matcher(&self) -> Option<&Regex> {
        self.url_matcher.as_ref()
    }

    /// Audience predicate, if any.
    #[must_use]
    pub const fn audience(&self) -> Option<&AudiencePredicate> {
        self.audience.as_ref()
    }

    /// Whether the activation window contains `now`.
    #[must_use]
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.start_time.map_or(true, |start| now >= start)
            && self.end_time.map_or(true, |end| now <= end)
    }

    /// Sum of all variant weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.variants.iter().map(Variant::weight).sum()
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty id, no variants, empty or
    /// duplicate variant ids, negative/non-finite weights, an all-zero or
    /// overflowing weight sum, an allocation outside `[0, 100]`, or an
    /// inverted window.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::EmptyExperimentId);
        }
        if self.variants.is_empty() {
            return Err(Error::NoVariants(self.id.clone()));
        }

        let mut seen = FxHashSet::default();
        for variant in &self.variants {
            if variant.id().is_empty() {
                return Err(Error::EmptyVariantId(self.id.clone()));
            }
            if !seen.insert(variant.id()) {
                return Err(Error::DuplicateVariant {
                    experiment_id: self.id.clone(),
                    variant_id: variant.id().to_string(),
                });
            }
            if !variant.weight().is_finite() || variant.weight() < 0.0 {
                return Err(Error::InvalidWeight {
                    experiment_id: self.id.clone(),
                    variant_id: variant.id().to_string(),
                    weight: variant.weight(),
                });
            }
        }
        let total = self.total_weight();
        if !total.is_finite() {
            return Err(Error::InvalidTotalWeight {
                experiment_id: self.id.clone(),
                total,
            });
        }
        if total <= 0.0 {
            return Err(Error::ZeroTotalWeight(self.id.clone()));
        }

        if !(0.0..=100.0).contains(&self.traffic_allocation) {
            return Err(Error::InvalidTrafficAllocation {
                experiment_id: self.id.clone(),
                allocation: self.traffic_allocation,
            });
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(Error::InvalidWindow(self.id.clone()));
            }
        }
        Ok(())
    }

    /// Compile `target_url_pattern` so the activation path does not
    /// re-parse it per request. Called on registration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrlPattern` if the glob exceeds the regex
    /// size limit.
    pub(crate) fn compile_url_pattern(&mut self) -> Result<()> {
        self.url_matcher = match &self.target_url_pattern {
            Some(pattern) => Some(compile_path_pattern(pattern).map_err(|e| {
                Error::InvalidUrlPattern {
                    experiment_id: self.id.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        Ok(())
    }
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("variants", &self.variants)
            .field("traffic_allocation", &self.traffic_allocation)
            .field("enabled", &self.enabled)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("target_url_pattern", &self.target_url_pattern)
            .field("audience", &self.audience.as_ref().map(|_| "<predicate>"))
            .finish_non_exhaustive()
    }
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    experiment: Experiment,
}

impl ExperimentBuilder {
    /// Create a new builder with the required id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            experiment: Experiment {
                id: id.into(),
                name: String::new(),
                description: String::new(),
                variants: Vec::new(),
                traffic_allocation: default_traffic_allocation(),
                enabled: default_enabled(),
                start_time: None,
                end_time: None,
                target_url_pattern: None,
                url_matcher: None,
                audience: None,
            },
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.experiment.name = name.into();
        self
    }

    /// Set the display description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.experiment.description = description.into();
        self
    }

    /// Append a variant (declaration order is preserved).
    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.experiment.variants.push(variant);
        self
    }

    /// Set the traffic allocation percentage.
    #[must_use]
    pub const fn traffic_allocation(mut self, percent: f64) -> Self {
        self.experiment.traffic_allocation = percent;
        self
    }

    /// Set the master switch.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.experiment.enabled = enabled;
        self
    }

    /// Set the inclusive window start.
    #[must_use]
    pub const fn start_time(mut self, start: DateTime<Utc>) -> Self {
        self.experiment.start_time = Some(start);
        self
    }

    /// Set the inclusive window end.
    #[must_use]
    pub const fn end_time(mut self, end: DateTime<Utc>) -> Self {
        self.experiment.end_time = Some(end);
        self
    }

    /// Restrict the experiment to request paths matching `pattern`.
    #[must_use]
    pub fn target_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.experiment.target_url_pattern = Some(pattern.into());
        self.experiment.url_matcher = None;
        self
    }

    /// Restrict the experiment to subjects accepted by `predicate`.
    #[must_use]
    pub fn audience<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.experiment.audience = Some(Arc::new(predicate));
        self
    }

    /// Build the `Experiment`. Validation happens at registration.
    #[must_use]
    pub fn build(self) -> Experiment {
        self.experiment
    }
}
