//! # Repository Digest
//!
//! A reproducible SHA-256 summary of every record in the repository.
//!
//! ## Construction
//!
//! ```text
//!   ids (sorted)      alice        bob        carol
//!                       │            │           │
//!   raw bytes      SHA-256(a)   SHA-256(b)  SHA-256(c)
//!                       └──────┬─────┴─────┬─────┘
//!                        a ‖ b ‖ c  (96 bytes)
//!                              │
//!                          SHA-256  ──▶ repository digest
//! ```
//!
//! Only record bytes feed the digest. Timestamps, permissions, tags and the
//! order in which the filesystem returns directory entries do not, so two
//! checkouts of the same registry produce the same value.

use crate::models::{Hash, HASH_SIZE};
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of one record's raw bytes.
pub fn hash_record(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Folds per-record digests, already in ID order, into the repository digest.
///
/// # Example
///
/// ```rust
/// use oniontree_repo::digest::{combine, hash_record};
///
/// let a = hash_record(b"name: a\n");
/// let b = hash_record(b"name: b\n");
///
/// assert_eq!(combine([a, b]), combine([a, b]));
/// assert_ne!(combine([a, b]), combine([b, a]));
/// ```
pub fn combine<I>(record_hashes: I) -> Hash
where
    I: IntoIterator<Item = Hash>,
{
    let iter = record_hashes.into_iter();
    let mut payload = Vec::with_capacity(iter.size_hint().0 * HASH_SIZE);
    for hash in iter {
        payload.extend_from_slice(&hash);
    }
    Sha256::digest(&payload).into()
}

/// Renders a digest as lowercase hex.
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_repository_digest() {
        // SHA-256 of the empty string
        assert_eq!(
            to_hex(&combine(std::iter::empty())),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_combine_matches_manual_concatenation() {
        let a = hash_record(b"a");
        let b = hash_record(b"b");

        let mut buf = Vec::new();
        buf.extend_from_slice(&a);
        buf.extend_from_slice(&b);
        let expected: Hash = Sha256::digest(&buf).into();

        assert_eq!(combine([a, b]), expected);
    }

    #[test]
    fn test_record_hash_sensitive_to_content() {
        assert_ne!(hash_record(b"name: a\n"), hash_record(b"name: a \n"));
    }
}
