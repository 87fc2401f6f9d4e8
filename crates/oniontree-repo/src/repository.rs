//! # Repository Engine
//!
//! The primary interface to an oniontree repository. It ties together root
//! discovery, the record codec and the two storage directories, and
//! enforces the invariants that span them.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────┐
//!                 │     Repository     │
//!                 │      (engine)      │
//!                 └─────────┬──────────┘
//!                           │
//!       ┌───────────┬───────┴───────┬────────────┐
//!       ▼           ▼               ▼            ▼
//!  ┌─────────┐ ┌─────────┐   ┌────────────┐ ┌─────────┐
//!  │Resolver │ │  Codec  │   │RecordStore │ │TagIndex │
//!  └─────────┘ └─────────┘   └────────────┘ └─────────┘
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Where it is kept |
//! |-----------|------------------|
//! | one record per ID | `add` publishes with a no-clobber link |
//! | no dangling tag links | `tag` requires the record; `remove` untags first |
//! | no empty tag directories | `untag` prunes the directory it emptied |
//! | sorted listings | every listing sorts before returning |
//!
//! ## Partial Failure
//!
//! There are no transactions. Each record write is atomic on its own, but a
//! multi-tag `tag`/`untag` call that fails halfway keeps the tags it already
//! applied, and a `remove` that fails after untagging leaves the record in
//! place without its tags.

use crate::codec::Codec;
use crate::config::OpenOptions;
use crate::digest;
use crate::error::{RepoError, Result};
use crate::models::{is_valid_component, Hash, Service, Tag};
use crate::resolver::{self, MARKER_NAME};
use crate::storage::{self, RecordStore, TagIndex, TAGGED_DIR, UNSORTED_DIR};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A handle bound to a directory that has not been checked for a
/// repository marker.
///
/// The only thing it can do is [`init`](UncheckedRepository::init), which
/// turns the directory into a repository and returns a checked
/// [`Repository`].
#[derive(Debug)]
pub struct UncheckedRepository {
    root: PathBuf,
    codec: Box<dyn Codec>,
}

impl UncheckedRepository {
    /// Binds to `dir` with default options.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self::with_options(dir, OpenOptions::new())
    }

    /// Binds to `dir` with the given options.
    pub fn with_options<P: AsRef<Path>>(dir: P, options: OpenOptions) -> Self {
        UncheckedRepository {
            root: dir.as_ref().to_path_buf(),
            codec: options.codec,
        }
    }

    /// Creates the repository layout under the bound directory.
    ///
    /// Missing directories are created and the marker file is written.
    /// Running it on an existing, possibly partial, repository is fine:
    /// existing directories, records and tags are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Io` for any filesystem failure other than
    /// "already exists".
    pub fn init(self) -> Result<Repository> {
        let repository = Repository::bind(self.root, self.codec);

        storage::ensure_dir(&repository.root)?;
        storage::ensure_dir(repository.records.dir())?;
        storage::ensure_dir(repository.tags.dir())?;
        storage::touch(&repository.root.join(MARKER_NAME))?;

        info!("Initialized repository in {}", repository.root.display());
        Ok(repository)
    }
}

/// An opened oniontree repository.
///
/// # Example
///
/// ```rust,no_run
/// use oniontree_repo::{Repository, Service};
///
/// let repo = Repository::init("./oniontree").unwrap();
///
/// let mut service = Service::new("Example");
/// service.add_urls(["http://example.onion"]);
/// repo.add("example", &service).unwrap();
/// repo.tag("example", ["forums"]).unwrap();
///
/// assert_eq!(repo.get("example").unwrap().name, "Example");
/// assert_eq!(repo.get_tag("forums").unwrap().services, vec!["example"]);
/// ```
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    codec: Box<dyn Codec>,
    records: RecordStore,
    tags: TagIndex,
}

impl Repository {
    /// Opens the repository containing `dir`.
    ///
    /// Walks upward from `dir` looking for the marker file; the handle is
    /// bound to the directory where it is found.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotARepository` when no marker is found.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, OpenOptions::new())
    }

    /// Opens the repository containing `dir` with the given options.
    pub fn open_with<P: AsRef<Path>>(dir: P, options: OpenOptions) -> Result<Self> {
        let root = resolver::find_root(dir.as_ref(), options.max_depth)?;
        debug!("Opened repository at {}", root.display());
        Ok(Self::bind(root, options.codec))
    }

    /// Initializes a repository in `dir` and returns a handle to it.
    ///
    /// Shorthand for `UncheckedRepository::new(dir).init()`.
    pub fn init<P: AsRef<Path>>(dir: P) -> Result<Self> {
        UncheckedRepository::new(dir).init()
    }

    fn bind(root: PathBuf, codec: Box<dyn Codec>) -> Self {
        let records = RecordStore::new(root.join(UNSORTED_DIR), codec.extension());
        let tags = TagIndex::new(root.join(TAGGED_DIR));
        Repository {
            root,
            codec,
            records,
            tags,
        }
    }

    /// Root directory of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `id`.
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.records.path(id)
    }

    /// Adds a new record.
    ///
    /// # Errors
    ///
    /// - `RepoError::InvalidId` if `id` is not usable as a filename stem.
    /// - `RepoError::IdExists` if a record for `id` is already present.
    pub fn add(&self, id: &str, service: &Service) -> Result<()> {
        check_id(id)?;
        if self.records.contains(id)? {
            return Err(RepoError::IdExists(id.to_string()));
        }

        let bytes = self.codec.encode(service)?;
        self.records.create(id, &bytes).map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                RepoError::IdExists(id.to_string())
            } else {
                RepoError::Io(err)
            }
        })?;

        info!("Added service '{}'", id);
        Ok(())
    }

    /// Replaces the content of an existing record.
    ///
    /// This is a full replace. To change a single field, read the record
    /// with [`get`](Self::get), modify it and pass it back.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::IdNotExists` if there is no record for `id`.
    pub fn update(&self, id: &str, service: &Service) -> Result<()> {
        self.require(id)?;

        let bytes = self.codec.encode(service)?;
        self.records.replace(id, &bytes)?;

        info!("Updated service '{}'", id);
        Ok(())
    }

    /// Removes a record and every tag link pointing at it.
    ///
    /// Links are removed before the record file so a tag can never point at
    /// a deleted record.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::IdNotExists` if there is no record for `id`.
    pub fn remove(&self, id: &str) -> Result<()> {
        self.require(id)?;

        let tags = self.get_service_tags(id)?;
        self.untag(id, &tags)?;
        self.records
            .remove(id)
            .map_err(|err| not_found_as(err, || RepoError::IdNotExists(id.to_string())))?;

        info!("Removed service '{}' ({} tags)", id, tags.len());
        Ok(())
    }

    /// Reads and decodes a record.
    ///
    /// # Errors
    ///
    /// - `RepoError::IdNotExists` if there is no record for `id`.
    /// - `RepoError::Decode` if the stored bytes cannot be decoded.
    pub fn get(&self, id: &str) -> Result<Service> {
        let bytes = self.get_raw(id)?;
        let mut service = self
            .codec
            .decode(&bytes)
            .map_err(|source| RepoError::Decode {
                id: id.to_string(),
                source,
            })?;
        service.id = id.to_string();
        Ok(service)
    }

    /// Reads a record's bytes without decoding them.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::IdNotExists` if there is no record for `id`.
    pub fn get_raw(&self, id: &str) -> Result<Vec<u8>> {
        self.require(id)?;
        debug!("Reading service '{}'", id);
        self.records
            .read(id)
            .map_err(|err| not_found_as(err, || RepoError::IdNotExists(id.to_string())))
    }

    /// Lists record IDs, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.records.list()?)
    }

    /// Adds `id` to each tag in `tags`.
    ///
    /// Tag names are trimmed. Each tag is an independent step: tagging the
    /// same record twice is a no-op, and a failure leaves earlier tags in
    /// place.
    ///
    /// # Errors
    ///
    /// - `RepoError::InvalidTag` for a tag name that is not a single path
    ///   component.
    /// - `RepoError::IdNotExists` if there is no record for `id`.
    pub fn tag<I, S>(&self, id: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_id(id)?;
        let filename = self.records.filename(id);

        for tag in tags {
            let tag = check_tag(tag.as_ref())?;
            if !self.records.contains(id)? {
                return Err(RepoError::IdNotExists(id.to_string()));
            }
            self.tags.link(tag, &filename)?;
            info!("Tagged '{}' with '{}'", id, tag);
        }
        Ok(())
    }

    /// Removes `id` from each tag in `tags`.
    ///
    /// Tags the record does not carry are skipped. A tag directory left
    /// empty is removed. The record itself does not have to exist, so links
    /// left behind by hand edits can be cleaned up.
    pub fn untag<I, S>(&self, id: &str, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_id(id)?;
        let filename = self.records.filename(id);

        for tag in tags {
            let tag = check_tag(tag.as_ref())?;
            if self.tags.unlink(tag, &filename)? {
                info!("Untagged '{}' from '{}'", id, tag);
            }
        }
        Ok(())
    }

    /// Returns a tag and its member IDs, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::TagNotExists` if there is no such tag.
    pub fn get_tag(&self, tag: &str) -> Result<Tag> {
        let tag = check_tag(tag)?;
        if !self.tags.contains(tag)? {
            return Err(RepoError::TagNotExists(tag.to_string()));
        }

        let entries = self
            .tags
            .entries(tag)
            .map_err(|err| not_found_as(err, || RepoError::TagNotExists(tag.to_string())))?;
        let mut services: Vec<String> = entries
            .iter()
            .filter_map(|name| self.records.id_from_filename(name))
            .collect();
        services.sort();

        Ok(Tag {
            id: tag.to_string(),
            services,
        })
    }

    /// Lists tag names, sorted.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.list()?)
    }

    /// Returns every tag that links to `id`, sorted.
    ///
    /// This scans all tags and their members, O(tags × members). A registry
    /// large enough for that to matter needs a reverse index.
    pub fn get_service_tags(&self, id: &str) -> Result<Vec<String>> {
        let mut matching = Vec::new();
        for name in self.list_tags()? {
            match self.get_tag(&name) {
                Ok(tag) => {
                    if tag.services.binary_search_by(|s| s.as_str().cmp(id)).is_ok() {
                        matching.push(tag.id);
                    }
                }
                Err(RepoError::TagNotExists(_)) => {
                    warn!("Tag '{}' disappeared while scanning", name);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(matching)
    }

    /// Computes the repository digest.
    ///
    /// Records are visited in ID order; the SHA-256 of each record's raw
    /// bytes is appended to a buffer and the SHA-256 of that buffer is
    /// returned. See [`digest`](crate::digest).
    pub fn hash(&self) -> Result<Hash> {
        let ids = self.list()?;
        let mut hashes = Vec::with_capacity(ids.len());
        for id in &ids {
            let bytes = self.get_raw(id)?;
            let hash = digest::hash_record(&bytes);
            debug!("Record '{}' hashes to {}", id, digest::to_hex(&hash));
            hashes.push(hash);
        }
        Ok(digest::combine(hashes))
    }

    fn require(&self, id: &str) -> Result<()> {
        check_id(id)?;
        if self.records.contains(id)? {
            Ok(())
        } else {
            Err(RepoError::IdNotExists(id.to_string()))
        }
    }
}

fn check_id(id: &str) -> Result<()> {
    if is_valid_component(id) {
        Ok(())
    } else {
        Err(RepoError::InvalidId(id.to_string()))
    }
}

fn check_tag(tag: &str) -> Result<&str> {
    let trimmed = tag.trim();
    if is_valid_component(trimmed) {
        Ok(trimmed)
    } else {
        Err(RepoError::InvalidTag(tag.to_string()))
    }
}

fn not_found_as(err: io::Error, expected: impl FnOnce() -> RepoError) -> RepoError {
    if err.kind() == io::ErrorKind::NotFound {
        expected()
    } else {
        RepoError::Io(err)
    }
}
