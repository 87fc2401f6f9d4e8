//! # Repository Root Discovery
//!
//! Finds the repository that contains a given directory by walking upward
//! until a directory holding the marker file is found.
//!
//! ## Algorithm
//!
//! ```text
//!   start ──▶ has .oniontree? ──yes──▶ return path relative to cwd
//!     ▲             │
//!     │             no
//!     │             ▼
//!     └──── parent (at most `max_depth` checks) ──▶ NotARepository
//! ```
//!
//! The walk is lexical: `..` components are folded away before the search
//! starts and parents are taken by dropping the last component, the same way
//! a shell would resolve `cd ..` on the path as typed. The hop bound keeps
//! the search finite on filesystems without a reachable `/`.
//!
//! Nothing is created or modified here.

use crate::error::{RepoError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Name of the sentinel file marking a repository root.
pub const MARKER_NAME: &str = ".oniontree";

/// Default bound on the number of directories inspected.
pub const DEFAULT_MAX_DEPTH: usize = 255;

/// Locates the repository root for `start`.
///
/// Checks `start` and then each ancestor, inspecting at most `max_depth`
/// directories. The returned path is relative to the process's current
/// working directory (or absolute when no relative form exists, e.g. a
/// different drive on Windows).
///
/// # Errors
///
/// - `RepoError::NotARepository` when no marker is found within the bound.
/// - `RepoError::Io` when the working directory cannot be determined or a
///   marker check fails for a reason other than absence.
///
/// # Example
///
/// ```rust,no_run
/// use oniontree_repo::resolver::{find_root, DEFAULT_MAX_DEPTH};
/// use std::path::Path;
///
/// let root = find_root(Path::new("unsorted"), DEFAULT_MAX_DEPTH).unwrap();
/// println!("repository at {}", root.display());
/// ```
pub fn find_root(start: &Path, max_depth: usize) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let mut dir = normalize(&cwd.join(start));

    for hop in 0..max_depth {
        debug!(hop, dir = %dir.display(), "looking for repository marker");
        if has_marker(&dir)? {
            return Ok(relative_to(&dir, &cwd));
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }

    Err(RepoError::NotARepository {
        start: start.to_path_buf(),
    })
}

fn has_marker(dir: &Path) -> io::Result<bool> {
    match fs::metadata(dir.join(MARKER_NAME)) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Folds `.` and `..` components without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expresses absolute `path` relative to absolute `base`.
pub(crate) fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return path.to_path_buf();
    }

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
