//! # variant-db: Experiment Assignment and Attribution Engine
//!
//! **Version**: 0.1.0
//!
//! variant-db answers "which variant does this subject see for this
//! experiment" deterministically, remembers the answer forever, and ties
//! later conversions back to it.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Invalid experiments are rejected at registration, never at assignment
//! - **Jidoka**: Persistence faults degrade to control, they never break the caller's page
//! - **Genchi Genbutsu**: Same `(subject, experiment)` always hashes to the same bucket
//! - **Heijunka**: Assignments are sticky, so users see one consistent experience
//!
//! ## Pipeline
//!
//! ```text
//! RequestContext ─▶ Registry ─▶ Activation ─▶ Store lookup ─▶ Bucket ─▶ Selector ─▶ Store insert
//!                                                                                    │
//!                                                   assignment_created ◀─────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use variant_db::events::MemorySink;
//! use variant_db::experiment::{Experiment, Variant};
//! use variant_db::kv::MemoryKvStore;
//! use variant_db::store::KvAssignmentStore;
//! use variant_db::{Engine, RequestContext};
//!
//! let sink = Arc::new(MemorySink::new());
//! let engine = Engine::builder(KvAssignmentStore::new(MemoryKvStore::new()))
//!     .sink(Arc::clone(&sink))
//!     .default_experiments([Experiment::builder("checkout_button")
//!         .variant(Variant::new("a", 50.0))
//!         .variant(Variant::new("b", 50.0))
//!         .build()])
//!     .build()?;
//!
//! let ctx = RequestContext::new("visitor-42").with_path("/checkout");
//! let result = engine.get_variant("checkout_button", &ctx);
//! assert!(result.is_in_test);
//!
//! engine.record_conversion("checkout_button", &ctx, "purchase", Some(120.0));
//! assert_eq!(sink.len(), 2);
//! # Ok::<(), variant_db::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod activation;
pub mod attribution;
pub mod bucket;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod experiment;
pub mod kv;
pub mod selector;
pub mod store;

pub use context::{AssignmentResult, RequestContext, CONTROL_VARIANT_ID};
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
