//! # Core Data Models
//!
//! This module defines the records stored in an oniontree repository and the
//! small value types the engine hands back to callers.
//!
//! ## Record Shape
//!
//! | Field | Type | Notes |
//! |-------|------|-------|
//! | `name` | string | free text, may be empty |
//! | `description` | string | free text, may be empty |
//! | `urls` | list of strings | ordered, may be empty |
//! | `public_keys` | list of [`PublicKey`] | omitted from the encoding when empty |
//! | anything else | kept in [`Service::extra`] | preserved across read-modify-write |
//!
//! The record ID is not part of the encoded document. It is the filename stem
//! of the record file and is filled in by the engine on read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SHA-256 digest size in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; HASH_SIZE];

/// A registry record describing one onion service.
///
/// # Example
///
/// ```rust
/// use oniontree_repo::Service;
///
/// let mut service = Service::new("Example");
/// service.add_urls(["http://example.onion"]);
/// service.add_urls(["http://example.onion", "https://example.onion"]);
///
/// assert_eq!(service.urls.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Record ID; the filename stem, never encoded.
    #[serde(skip)]
    pub id: String,

    /// Human-readable service name.
    #[serde(default)]
    pub name: String,

    /// Free-text description.
    #[serde(default)]
    pub description: String,

    /// Network addresses, in the order the maintainer listed them.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Public keys of the service operators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_keys: Vec<PublicKey>,

    /// Fields this version does not know about.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Service {
    /// Creates a record with the given name and no other data.
    pub fn new(name: impl Into<String>) -> Self {
        Service {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends URLs that are not already listed, keeping their order.
    pub fn add_urls<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            let url = url.into();
            if !self.urls.contains(&url) {
                self.urls.push(url);
            }
        }
    }

    /// Replaces the URL list. Duplicates in `urls` are dropped.
    pub fn set_urls<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.clear();
        self.add_urls(urls);
    }

    /// Attaches public keys.
    ///
    /// A key whose identity (fingerprint, or the armored value when the
    /// fingerprint is empty) is already present replaces the stored entry;
    /// anything else is appended.
    pub fn add_public_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = PublicKey>,
    {
        for key in keys {
            match self
                .public_keys
                .iter_mut()
                .find(|existing| existing.same_key(&key))
            {
                Some(existing) => *existing = key,
                None => self.public_keys.push(key),
            }
        }
    }
}

/// A public key attached to a service.
///
/// `value` holds the verbatim armored key block and is the only field that
/// must be set. The other fields are derived by the key parser and are left
/// empty when parsing was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key ID of the primary key (uppercase hex).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// First user identity declared by the key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,

    /// Fingerprint of the primary key (uppercase hex).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,

    /// Maintainer-supplied note about the key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// The armored key block.
    pub value: String,
}

impl PublicKey {
    /// Creates a descriptor carrying only the armored value.
    pub fn new(value: impl Into<String>) -> Self {
        PublicKey {
            value: value.into(),
            ..Default::default()
        }
    }

    fn same_key(&self, other: &PublicKey) -> bool {
        if !self.fingerprint.is_empty() || !other.fingerprint.is_empty() {
            self.fingerprint.eq_ignore_ascii_case(&other.fingerprint)
        } else {
            self.value.trim() == other.value.trim()
        }
    }
}

/// A tag and the IDs of the records carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub id: String,

    /// Member record IDs, sorted.
    pub services: Vec<String>,
}

/// Checks that `name` can be used as a single path component.
///
/// Rejects empty names, names with leading `.` (reserved for the repository
/// marker and temporary files), path separators and NUL.
pub(crate) fn is_valid_component(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && name.trim() == name
}
