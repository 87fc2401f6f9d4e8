//! # OnionTree Repository
//!
//! Storage engine for a registry of onion services kept as plain files in a
//! directory tree. Each service is one YAML document; tags are directories
//! of symbolic links; a digest over all records makes two copies of the
//! registry comparable.
//!
//! ## On-Disk Layout
//!
//! ```text
//! <root>/
//! ├── .oniontree                    repository marker (empty file)
//! ├── unsorted/
//! │   ├── alice.yaml                one record per service
//! │   └── bob.yaml
//! └── tagged/
//!     ├── people/
//!     │   ├── alice.yaml -> ../../unsorted/alice.yaml
//!     │   └── bob.yaml   -> ../../unsorted/bob.yaml
//!     └── shops/
//!         └── alice.yaml -> ../../unsorted/alice.yaml
//! ```
//!
//! Links are relative, so the whole tree can be moved or cloned.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`resolver`] | Finds the repository root above a directory |
//! | [`codec`] | Encodes records (YAML by default) |
//! | [`storage`] | Record files and tag links, atomic writes |
//! | [`repository`] | The engine: CRUD, tagging, digest |
//! | [`digest`] | Reproducible SHA-256 over all records |
//! | [`snapshot`] | Whole-repository read-only view for exports |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use oniontree_repo::{digest, Repository, RepoError, Service};
//!
//! // Create the layout once, then open from anywhere inside the tree.
//! Repository::init("./oniontree")?;
//! let repo = Repository::open("./oniontree/unsorted")?;
//!
//! let mut service = Service::new("Example Forum");
//! service.add_urls(["http://exampleforumxxxxx.onion"]);
//!
//! match repo.add("example", &service) {
//!     Ok(()) => {}
//!     Err(RepoError::IdExists(id)) => println!("{} is already listed", id),
//!     Err(err) => return Err(err),
//! }
//! repo.tag("example", ["forums"])?;
//!
//! println!("digest: {}", digest::to_hex(&repo.hash()?));
//! # Ok::<(), RepoError>(())
//! ```
//!
//! ## Concurrency
//!
//! The engine is synchronous and holds no locks. Each record write is
//! atomic (temporary file, then link or rename), and creating a record can
//! never clobber one written concurrently, but sequences such as "add then
//! tag" or "untag then delete" are not transactional. Concurrent writers on
//! the same repository need external coordination.

pub mod codec;
pub mod config;
pub mod digest;
pub mod error;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod snapshot;
pub mod storage;

pub use codec::{Codec, CodecError, Format, YamlCodec};
pub use config::{OpenOptions, RepositoryConfig};
pub use error::{RepoError, Result};
pub use models::{Hash, PublicKey, Service, Tag, HASH_SIZE};
pub use repository::{Repository, UncheckedRepository};
pub use snapshot::{Snapshot, SnapshotOptions};
