//! Experiment Schema and Registry
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Variant (N)      [declaration order matters]
//!      │
//!      └──< Assignment (N)            [one per subject, immutable]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use variant_db::experiment::{Experiment, ExperimentRegistry, Variant};
//!
//! let registry = ExperimentRegistry::new();
//! registry.register(
//!     Experiment::builder("checkout_button")
//!         .variant(Variant::new("a", 50.0))
//!         .variant(Variant::new("b", 50.0))
//!         .build(),
//! )?;
//! assert!(registry.get("checkout_button").is_some());
//! # Ok::<(), variant_db::Error>(())
//! ```

mod assignment_record;
mod experiment_record;
mod registry;
mod variant_record;

pub use assignment_record::Assignment;
pub use experiment_record::{AudiencePredicate, Experiment, ExperimentBuilder};
pub use registry::{load_experiments_file, load_experiments_json, ExperimentRegistry};
pub use variant_record::Variant;
