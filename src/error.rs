//! Error types for variant-db
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Configuration errors are fatal and surface at registration time.
//! Persistence errors are recovered inside the engine and never reach
//! `get_variant` callers.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// variant-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment registered with an empty id
    #[error("Invalid experiment: id must not be empty")]
    EmptyExperimentId,

    /// Experiment registered without variants
    #[error("Invalid experiment '{0}': at least one variant is required")]
    NoVariants(String),

    /// Variant declared with an empty id
    #[error("Invalid experiment '{0}': variant id must not be empty")]
    EmptyVariantId(String),

    /// Two variants share the same id
    #[error("Invalid experiment '{experiment_id}': duplicate variant id '{variant_id}'")]
    DuplicateVariant {
        /// Experiment being registered
        experiment_id: String,
        /// Repeated variant id
        variant_id: String,
    },

    /// Negative or non-finite variant weight
    #[error("Invalid experiment '{experiment_id}': variant '{variant_id}' has weight {weight}\nWeights must be finite and >= 0")]
    InvalidWeight {
        /// Experiment being registered
        experiment_id: String,
        /// Offending variant
        variant_id: String,
        /// Declared weight
        weight: f64,
    },

    /// All variant weights are zero
    #[error("Invalid experiment '{0}': total variant weight must be > 0")]
    ZeroTotalWeight(String),

    /// Variant weights sum to a non-finite total
    #[error("Invalid experiment '{experiment_id}': total variant weight {total} is not finite\nUse relative weights such as 50/50 or 1/3")]
    InvalidTotalWeight {
        /// Experiment being registered
        experiment_id: String,
        /// Computed weight sum
        total: f64,
    },

    /// Traffic allocation outside [0, 100]
    #[error("Invalid experiment '{experiment_id}': traffic allocation {allocation} is outside [0, 100]")]
    InvalidTrafficAllocation {
        /// Experiment being registered
        experiment_id: String,
        /// Declared allocation percentage
        allocation: f64,
    },

    /// Activation window ends before it starts
    #[error("Invalid experiment '{0}': start time is after end time")]
    InvalidWindow(String),

    /// Target URL pattern could not be compiled
    #[error("Invalid experiment '{experiment_id}': target URL pattern '{pattern}' rejected: {reason}")]
    InvalidUrlPattern {
        /// Experiment being registered
        experiment_id: String,
        /// Declared glob
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Re-registration dropped a variant that subjects may already hold
    #[error("Invalid re-registration of '{experiment_id}': variant '{variant_id}' was removed\nRemove the experiment first or keep the variant with weight 0")]
    VariantRemoved {
        /// Experiment being re-registered
        experiment_id: String,
        /// Variant id missing from the new definition
        variant_id: String,
    },

    /// Storage error (backing key-value medium)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// SQLite error from the durable KV backend
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encode/decode error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a registration-time configuration mistake.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Self::StorageError(_) | Self::Database(_) | Self::Serialization(_) | Self::Io(_)
        )
    }
}
