//! Error types for repository operations.
//!
//! Expected conditions (`IdExists`, `IdNotExists`, `TagNotExists`,
//! `NotARepository`) are distinct variants so callers can print a clean
//! message. Anything the filesystem reports that the engine did not expect
//! is carried verbatim in [`RepoError::Io`].

use crate::codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;

/// Errors that can occur while discovering, reading or mutating a repository.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Root discovery exhausted its search bound without finding the marker.
    #[error("not an oniontree repository: {}", start.display())]
    NotARepository {
        /// Directory the upward search started from.
        start: PathBuf,
    },

    /// A record with this ID already exists.
    #[error("id exists: {0}")]
    IdExists(String),

    /// No record with this ID exists.
    #[error("id not exists: {0}")]
    IdNotExists(String),

    /// No tag with this name exists.
    #[error("tag not exists: {0}")]
    TagNotExists(String),

    /// The ID cannot be used as a record filename stem.
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    /// The tag name cannot be used as a tag directory name.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    /// Stored bytes do not parse under the repository's encoding.
    #[error("failed to decode {id}: {source}")]
    Decode {
        /// ID of the record that failed to decode.
        id: String,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// A record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[source] CodecError),

    /// The requested record encoding is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unexpected filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RepoError {
    /// Returns true for `IdNotExists` and `TagNotExists`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::IdNotExists(_) | RepoError::TagNotExists(_))
    }
}
