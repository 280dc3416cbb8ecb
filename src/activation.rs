//! Activation evaluator
//!
//! Decides whether an experiment may assign a subject right now. Five
//! independent checks are ANDed: master switch, time window, path
//! pattern, audience predicate, traffic allocation. All of them are pure
//! and evaluated fresh on every call.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::bucket::allocation_bucket;
use crate::context::RequestContext;
use crate::experiment::Experiment;

/// Outcome of the activation checks, naming the first failing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// All checks passed.
    Eligible,
    /// `enabled` is false.
    Disabled,
    /// `now` is outside `[start_time, end_time]`.
    OutsideWindow,
    /// The request path does not match `target_url_pattern`.
    PathMismatch,
    /// The audience predicate rejected the subject.
    AudienceExcluded,
    /// The subject's allocation bucket is beyond `traffic_allocation`.
    OutsideAllocation,
}

impl Eligibility {
    /// Whether every check passed.
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Short label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Disabled => "disabled",
            Self::OutsideWindow => "outside_window",
            Self::PathMismatch => "path_mismatch",
            Self::AudienceExcluded => "audience_excluded",
            Self::OutsideAllocation => "outside_allocation",
        }
    }
}

/// Run every activation check for `ctx` at `now`.
#[must_use]
pub fn evaluate(experiment: &Experiment, ctx: &RequestContext, now: DateTime<Utc>) -> Eligibility {
    if !experiment.enabled() {
        return Eligibility::Disabled;
    }
    if !experiment.in_window(now) {
        return Eligibility::OutsideWindow;
    }
    if let Some(pattern) = experiment.target_url_pattern() {
        let matched = ctx.path().is_some_and(|path| match experiment.url_matcher() {
            Some(matcher) => matcher.is_match(path),
            // Not registered yet, so nothing was compiled
            None => path_matches(pattern, path),
        });
        if !matched {
            return Eligibility::PathMismatch;
        }
    }
    if let Some(audience) = experiment.audience() {
        if !audience(ctx.subject_id()) {
            return Eligibility::AudienceExcluded;
        }
    }
    if !in_allocation(experiment, ctx.subject_id()) {
        return Eligibility::OutsideAllocation;
    }
    Eligibility::Eligible
}

/// Boolean form of [`evaluate`].
#[must_use]
pub fn is_eligible(experiment: &Experiment, ctx: &RequestContext, now: DateTime<Utc>) -> bool {
    evaluate(experiment, ctx, now).is_eligible()
}

/// Traffic allocation gate: deterministic per `(subject, experiment)`.
///
/// Compares [`allocation_bucket`], not [`crate::bucket::bucket`], against
/// the allocation: the salted hash keeps inclusion independent of the
/// variant choice.
#[must_use]
pub fn in_allocation(experiment: &Experiment, subject_id: &str) -> bool {
    f64::from(allocation_bucket(subject_id, experiment.id())) < experiment.traffic_allocation()
}

/// Compile a `target_url_pattern` glob into an anchored regex.
///
/// `*` matches any run of characters (including none); every other
/// character is a literal.
///
/// # Errors
///
/// Returns the regex compiler's error, which for an escaped glob can only
/// be the compiled size limit.
pub fn compile_path_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?s)^{body}$"))
}

/// One-off glob match. The engine uses the matcher compiled at
/// registration instead.
///
/// ```rust
/// use variant_db::activation::path_matches;
///
/// assert!(path_matches("/courses/*", "/courses/rust-101"));
/// assert!(path_matches("*/checkout", "/fa/checkout"));
/// assert!(!path_matches("/courses", "/courses/rust-101"));
/// ```
#[must_use]
pub fn path_matches(pattern: &str, path: &str) -> bool {
    compile_path_pattern(pattern).is_ok_and(|matcher| matcher.is_match(path))
}
