//! Variant Record - one arm of an experiment

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A weighted arm of an experiment.
///
/// Weights are relative shares; they are normalized over the sum of all
/// weights in the experiment. `config` is opaque to the engine and is
/// handed back to the caller untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    weight: f64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    config: Map<String, Value>,
}

impl Variant {
    /// Create a variant with the given id and relative weight.
    #[must_use]
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            weight,
            config: Map::new(),
        }
    }

    /// Set a display name (defaults to the id).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach one opaque config entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Get the variant ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name, falling back to the id.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Get the relative weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Get the opaque config payload.
    #[must_use]
    pub const fn config(&self) -> &Map<String, Value> {
        &self.config
    }
}
