//! Variant selector
//!
//! Maps a bucket percentile onto cumulative weight ranges built in
//! declaration order. Weights are normalized by their sum, so `1:3` and
//! `25:75` select identically.

use crate::bucket::BUCKET_COUNT;
use crate::experiment::Variant;

/// Pick the variant whose cumulative weight range contains `bucket_value`.
///
/// The bucket is read as a percentile in `[0, BUCKET_COUNT)` and scaled
/// into weight space; the first variant whose cumulative boundary is
/// strictly greater than the scaled value wins. Falls back to the first
/// declared variant when the boundaries do not cover the range (all-zero
/// weights, non-finite sums). Returns `None` only for an empty slice.
///
/// ```rust
/// use variant_db::experiment::Variant;
/// use variant_db::selector::select;
///
/// let variants = [Variant::new("a", 25.0), Variant::new("b", 75.0)];
/// assert_eq!(select(&variants, 24).unwrap().id(), "a");
/// assert_eq!(select(&variants, 25).unwrap().id(), "b");
/// ```
#[must_use]
pub fn select(variants: &[Variant], bucket_value: u32) -> Option<&Variant> {
    let first = variants.first()?;
    let total: f64 = variants.iter().map(Variant::weight).sum();
    if !total.is_finite() || total <= 0.0 {
        return Some(first);
    }

    let target = f64::from(bucket_value) / f64::from(BUCKET_COUNT) * total;
    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += variant.weight();
        if cumulative > target {
            return Some(variant);
        }
    }
    Some(first)
}
