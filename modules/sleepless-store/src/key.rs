//! Author keying.
//!
//! Handles are hashed with a polynomial accumulator over their ASCII
//! characters, reduced modulo the table size on every step. Non-ASCII
//! characters are skipped, so handles that differ only outside ASCII share a
//! bucket. Equality is always decided by exact string comparison inside the
//! bucket; the hash only picks where to look.

use serde::Serialize;

use crate::error::{Result, StoreError};

/// Polynomial multiplier.
pub const HASH_MULTIPLIER: u128 = 31;

/// Precomputed bucket for an author handle within one [`KeySpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AuthorKey(usize);

impl AuthorKey {
    pub fn bucket(self) -> usize {
        self.0
    }
}

/// The fixed table size `m` a store hashes into.
///
/// Immutable after construction: a store never rehashes, so changing `m`
/// under existing placements is not expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpace {
    size: usize,
}

impl KeySpace {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(StoreError::EmptyTable);
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hash a handle into `[0, size)`.
    pub fn key(&self, handle: &str) -> AuthorKey {
        let m = self.size as u128;
        let hash = handle
            .chars()
            .filter(char::is_ascii)
            .fold(0u128, |hash, c| (hash * HASH_MULTIPLIER + c as u128) % m);
        AuthorKey(hash as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(KeySpace::new(0), Err(StoreError::EmptyTable)));
    }

    #[test]
    fn matches_hand_computed_polynomial() {
        let space = KeySpace::new(1000).unwrap();
        // 'a' = 97, 'b' = 98: (97 * 31 + 98) % 1000 = 105
        assert_eq!(space.key("ab").bucket(), 105);
        assert_eq!(space.key("").bucket(), 0);
    }

    #[test]
    fn deterministic_and_bounded() {
        let space = KeySpace::new(97).unwrap();
        for handle in ["nightjar", "owl_bot", "X", "a_very_long_handle_name_indeed"] {
            let key = space.key(handle);
            assert_eq!(key, space.key(handle));
            assert!(key.bucket() < 97);
        }
    }

    #[test]
    fn non_ascii_characters_are_skipped() {
        let space = KeySpace::new(1000).unwrap();
        assert_eq!(space.key("café"), space.key("caf"));
        assert_eq!(space.key("ñandu"), space.key("andu"));
        assert_eq!(space.key("日本"), space.key(""));
    }

    #[test]
    fn stepwise_reduction_equals_full_polynomial() {
        let full = "nightjar"
            .chars()
            .fold(0u128, |hash, c| hash * HASH_MULTIPLIER + c as u128);
        for m in [7usize, 1000, 1_000_003] {
            let space = KeySpace::new(m).unwrap();
            assert_eq!(space.key("nightjar").bucket() as u128, full % m as u128);
        }
    }
}
