//! Read-only view of a whole repository for export and listing tools.
//!
//! Built only from the public read operations (`list`, `get`, `list_tags`,
//! `get_tag`), so it sees exactly what any other caller would.

use crate::error::Result;
use crate::models::Service;
use crate::repository::Repository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Controls which record fields end up in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// Keep service descriptions.
    pub include_description: bool,

    /// Keep public keys.
    pub include_public_keys: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            include_description: true,
            include_public_keys: true,
        }
    }
}

/// Every record, every tag, and a URL lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Records keyed by ID.
    pub unsorted: BTreeMap<String, Service>,

    /// Tag name to member IDs.
    pub tagged: BTreeMap<String, Vec<String>>,

    /// URL to the ID of the record listing it.
    pub addresses: BTreeMap<String, String>,
}

impl Repository {
    /// Reads the whole repository into a [`Snapshot`].
    ///
    /// # Errors
    ///
    /// Fails on the first record that cannot be read or decoded.
    pub fn snapshot(&self, options: &SnapshotOptions) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();

        for id in self.list()? {
            let mut service = self.get(&id)?;
            if !options.include_description {
                service.description.clear();
            }
            if !options.include_public_keys {
                service.public_keys.clear();
            }
            for url in &service.urls {
                snapshot.addresses.insert(url.clone(), id.clone());
            }
            snapshot.unsorted.insert(id, service);
        }

        for name in self.list_tags()? {
            let tag = self.get_tag(&name)?;
            snapshot.tagged.insert(tag.id, tag.services);
        }

        Ok(snapshot)
    }
}
