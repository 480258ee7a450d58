//! Deterministic percentage bucketing.
//!
//! The hash is djb2 with XOR mixing over UTF-16 code units, computed in
//! wrapping 32-bit signed arithmetic. Other SDKs compute the same buckets, so
//! the algorithm must not change without a compatibility break.

const HASH_SEED: i32 = 5381;

/// Assigns identities to stable rollout slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolloutBucketer;

impl RolloutBucketer {
    /// Create a bucketer.
    pub fn new() -> Self {
        Self
    }

    /// Maps `key` to a bucket in `0..100`.
    pub fn hash_to_percentage(&self, key: &str) -> u32 {
        let hash = key.encode_utf16().fold(HASH_SEED, |h, unit| {
            h.wrapping_mul(33) ^ i32::from(unit)
        });
        // i32::MIN has no i32 absolute value
        (i64::from(hash).unsigned_abs() % 100) as u32
    }

    /// Whether `identity` falls inside a `percentage` rollout of `flag_key`.
    ///
    /// Raising the percentage only ever adds identities.
    pub fn is_in_rollout(&self, flag_key: &str, identity: Option<&str>, percentage: f64) -> bool {
        let Some(identity) = identity.filter(|id| !id.is_empty()) else {
            return false;
        };
        if percentage.is_nan() || percentage <= 0.0 {
            return false;
        }
        if percentage >= 100.0 {
            return true;
        }

        let bucket = self.hash_to_percentage(&format!("{}:{}", flag_key, identity));
        f64::from(bucket) < percentage
    }
}
