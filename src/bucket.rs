//! Hash/bucket function
//!
//! Maps a `(subject, experiment)` pair onto a stable percentile in
//! `[0, BUCKET_COUNT)`. The hash is 32-bit FNV-1a over
//! `subject ":" experiment` followed by the murmur3 `fmix32` finalizer,
//! so sequential subject ids spread across the whole range.

/// Number of buckets (percentiles).
pub const BUCKET_COUNT: u32 = 100;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const SEPARATOR: u8 = b':';

/// Stable 32-bit hash of `subject_id:experiment_id`.
#[must_use]
pub fn hash_pair(subject_id: &str, experiment_id: &str) -> u32 {
    let bytes = subject_id
        .bytes()
        .chain(std::iter::once(SEPARATOR))
        .chain(experiment_id.bytes());

    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    fmix32(hash)
}

/// Bucket value in `[0, 100)` for a subject within an experiment.
///
/// Deterministic across processes and restarts.
///
/// ```rust
/// use variant_db::bucket::{bucket, BUCKET_COUNT};
///
/// let b = bucket("u1", "checkout_button");
/// assert!(b < BUCKET_COUNT);
/// assert_eq!(b, bucket("u1", "checkout_button"));
/// ```
#[must_use]
pub fn bucket(subject_id: &str, experiment_id: &str) -> u32 {
    hash_pair(subject_id, experiment_id) % BUCKET_COUNT
}

/// Bucket used by the traffic allocation gate.
///
/// Same function, salted key: inclusion must not correlate with the
/// variant bucket or partial allocations would skew the variant split.
#[must_use]
pub fn allocation_bucket(subject_id: &str, experiment_id: &str) -> u32 {
    let salted = format!("{experiment_id}:traffic");
    bucket(subject_id, &salted)
}

const fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_deterministic() {
        for i in 0..1000 {
            let subject = format!("user-{i}");
            assert_eq!(bucket(&subject, "exp"), bucket(&subject, "exp"));
        }
    }

    #[test]
    fn test_bucket_in_range() {
        for i in 0..10_000 {
            assert!(bucket(&format!("s{i}"), "exp") < BUCKET_COUNT);
        }
        assert!(bucket("", "") < BUCKET_COUNT);
    }

    #[test]
    fn test_separator_disambiguates_concatenation() {
        // "ab" + "c" and "a" + "bc" must hash different inputs
        assert_ne!(hash_pair("ab", "c"), hash_pair("a", "bc"));
    }

    #[test]
    fn test_sequential_ids_are_not_sequential_buckets() {
        let buckets: Vec<u32> = (0..20).map(|i| bucket(&format!("user-{i}"), "exp")).collect();
        let ascending_steps = buckets
            .windows(2)
            .filter(|w| w[1] == (w[0] + 1) % BUCKET_COUNT)
            .count();
        assert!(ascending_steps < 5, "buckets look sequential: {buckets:?}");
    }

    #[test]
    fn test_buckets_cover_full_range() {
        let mut seen = [false; BUCKET_COUNT as usize];
        for i in 0..20_000 {
            seen[bucket(&format!("user-{i}"), "exp") as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_allocation_bucket_differs_from_variant_bucket() {
        let differing = (0..1000)
            .filter(|i| {
                let s = format!("user-{i}");
                bucket(&s, "exp") != allocation_bucket(&s, "exp")
            })
            .count();
        assert!(differing > 900);
    }

    #[test]
    fn test_experiment_id_changes_bucket() {
        let differing = (0..1000)
            .filter(|i| {
                let s = format!("user-{i}");
                bucket(&s, "exp-a") != bucket(&s, "exp-b")
            })
            .count();
        assert!(differing > 900);
    }
}
