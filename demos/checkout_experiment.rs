//! Checkout Experiment Example
//!
//! Wires an engine the way a server composition root would: built-in
//! defaults, a JSON override list, a tracing analytics sink.
//!
//! Run with: RUST_LOG=variant_db=debug cargo run --example checkout_experiment

use tracing_subscriber::EnvFilter;
use variant_db::events::TracingSink;
use variant_db::experiment::{load_experiments_json, Experiment, Variant};
use variant_db::kv::MemoryKvStore;
use variant_db::store::KvAssignmentStore;
use variant_db::{Engine, RequestContext};

const OVERRIDES: &str = r#"[
    {
        "id": "course_card_layout",
        "variants": [
            {"id": "grid", "weight": 1, "config": {"columns": 3}},
            {"id": "list", "weight": 1}
        ],
        "trafficAllocation": 50,
        "targetUrlPattern": "/courses*"
    }
]"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== variant-db Checkout Experiment ===\n");

    let defaults = [Experiment::builder("checkout_button")
        .name("Checkout button colour")
        .variant(Variant::new("a", 50.0).with_name("Blue"))
        .variant(Variant::new("b", 50.0).with_name("Green"))
        .target_url_pattern("/checkout*")
        .build()];

    let engine = Engine::builder(KvAssignmentStore::new(MemoryKvStore::new()))
        .sink(TracingSink)
        .default_experiments(defaults)
        .overrides(load_experiments_json(OVERRIDES)?)
        .build()?;

    // -------------------------------------------------------------------------
    // 1. Assign a handful of visitors
    // -------------------------------------------------------------------------
    println!("1. Assigning visitors...");
    for i in 0..5 {
        let ctx = RequestContext::new(format!("visitor-{i}")).with_path("/checkout");
        let result = engine.get_variant("checkout_button", &ctx);
        println!(
            "   visitor-{i}: {} ({}), in test: {}",
            result.variant_id, result.variant_name, result.is_in_test
        );
    }

    // -------------------------------------------------------------------------
    // 2. Path targeting
    // -------------------------------------------------------------------------
    println!("\n2. Course layout on two pages...");
    for path in ["/courses/rust-101", "/about"] {
        let ctx = RequestContext::new("visitor-0").with_path(path);
        let result = engine.get_variant("course_card_layout", &ctx);
        println!("   {path}: {} (in test: {})", result.variant_id, result.is_in_test);
    }

    // -------------------------------------------------------------------------
    // 3. Conversions
    // -------------------------------------------------------------------------
    println!("\n3. Recording a purchase for visitor-0...");
    let ctx = RequestContext::new("visitor-0").with_path("/checkout");
    let recorded = engine.record_conversion("checkout_button", &ctx, "purchase", Some(120.0));
    println!("   recorded: {recorded}");

    // -------------------------------------------------------------------------
    // 4. Introspection
    // -------------------------------------------------------------------------
    println!("\n4. Assignments for visitor-0:");
    for assignment in engine.list_assignments_for_subject("visitor-0")? {
        println!(
            "   {} -> {} at {}",
            assignment.experiment_id(),
            assignment.variant_id(),
            assignment.assigned_at_epoch_millis()
        );
    }

    Ok(())
}
