//! Attribution reporter
//!
//! Ties conversion events to the variant the subject is assigned, so the
//! analytics sink can group conversions by variant without knowing
//! anything about bucketing.

use tracing::debug;

use crate::context::RequestContext;
use crate::engine::Engine;
use crate::events::AnalyticsEvent;
use crate::store::AssignmentStore;

/// Records conversions against an engine's assignments.
pub struct AttributionReporter<'a, S> {
    engine: &'a Engine<S>,
}

impl<'a, S: AssignmentStore> AttributionReporter<'a, S> {
    /// Bind a reporter to an engine.
    #[must_use]
    pub const fn new(engine: &'a Engine<S>) -> Self {
        Self { engine }
    }

    /// Emit one `assignment_conversion` for the subject's resolved variant.
    ///
    /// Resolution goes through [`Engine::get_variant`], so an eligible
    /// subject without an assignment is assigned first. Subjects outside
    /// the experiment (unknown id, ineligible, not allocated) are a silent
    /// no-op. Returns `true` if an event was emitted.
    pub fn record_conversion(
        &self,
        experiment_id: &str,
        ctx: &RequestContext,
        conversion_type: &str,
        value: Option<f64>,
    ) -> bool {
        let resolved = self.engine.get_variant(experiment_id, ctx);
        if !resolved.is_in_test {
            debug!(
                experiment_id,
                subject_id = ctx.subject_id(),
                conversion_type,
                "conversion outside experiment ignored"
            );
            return false;
        }

        self.engine.emit(AnalyticsEvent::conversion(
            &resolved,
            conversion_type,
            value,
            ctx.now(),
        ));
        true
    }
}
