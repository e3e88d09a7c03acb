//! Order-invariant variant identity hashing.
//!
//! A variant is identified by its attribute set, not by the order the client
//! happened to submit the attributes in. The hash below is the dedup key for
//! variants within a product: re-submitting the same attribute set must
//! resolve to the existing variant, never create a duplicate.
//!
//! The hash is always recomputed server-side from the request payload; a
//! client-supplied hash is never trusted.

use sha2::{Digest, Sha256};

use crate::types::AttributeId;

/// Separator between `id:value` entries in the canonical form.
const PAIR_SEPARATOR: &str = "|";

/// Compute the identity hash for a variant's attribute set.
///
/// Pairs are sorted by attribute id ascending (ids are unique per input, so
/// the sort is total), rendered as `id:value` joined by `|`, and digested
/// with SHA-256. The result is lowercase hex, so any ordering of the same set
/// yields the same hash.
///
/// An empty attribute set deterministically hashes the empty string.
#[must_use]
pub fn variant_identity_hash(pairs: &[(AttributeId, String)]) -> String {
    let mut sorted: Vec<&(AttributeId, String)> = pairs.iter().collect();
    sorted.sort_by_key(|(id, _)| *id);

    let canonical = sorted
        .iter()
        .map(|(id, value)| format!("{id}:{value}"))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR);

    let digest = Sha256::digest(canonical.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(id: i64, value: &str) -> (AttributeId, String) {
        (AttributeId::new(id), value.to_owned())
    }

    #[test]
    fn hash_is_order_invariant() {
        let a = variant_identity_hash(&[pair(1, "red"), pair(2, "L")]);
        let b = variant_identity_hash(&[pair(2, "L"), pair(1, "red")]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let hash = variant_identity_hash(&[pair(1, "red")]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_set_hashes_empty_string() {
        let hash = variant_identity_hash(&[]);
        // SHA-256 of the empty string.
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn differing_values_differ() {
        let a = variant_identity_hash(&[pair(1, "red"), pair(2, "L")]);
        let b = variant_identity_hash(&[pair(1, "red"), pair(2, "XL")]);
        assert_ne!(a, b);
    }

    #[test]
    fn no_collisions_over_large_corpus() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        for i in 0..100_i64 {
            for j in 0..100_i64 {
                let hash = variant_identity_hash(&[
                    pair(1, &format!("size-{i}")),
                    pair(2, &format!("color-{j}")),
                ]);
                assert!(seen.insert(hash), "collision at ({i}, {j})");
            }
        }
        assert_eq!(seen.len(), 10_000);
    }
}
