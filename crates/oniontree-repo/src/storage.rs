//! # Filesystem Storage Layer
//!
//! Low-level access to the two directories that make up a repository. This
//! layer knows about files, links and directories; it does not know about
//! codecs or error semantics beyond `std::io`.
//!
//! ## Storage Structure
//!
//! | Directory | Entry | Content |
//! |-----------|-------|---------|
//! | `unsorted/` | `<id>.<ext>` | encoded record |
//! | `tagged/<tag>/` | `<id>.<ext>` | symlink to `../../unsorted/<id>.<ext>` |
//!
//! ## Write Safety
//!
//! Record bytes are written to a hidden temporary sibling, synced, and only
//! then published:
//!
//! - new records are published with a hard link, which fails if the target
//!   already exists, so two writers racing on one ID cannot both win;
//! - replacements are published with a rename over the old file.
//!
//! A reader therefore sees either the old content or the new content, never
//! a partially written file. Nothing here spans more than one record: a
//! failure between two calls leaves whatever the earlier calls did.
//!
//! Some mounts (FAT, several network filesystems) refuse hard links. There a
//! new record is written in place through an exclusive create instead: the
//! no-clobber guarantee holds, but a crash mid-write can leave a truncated
//! record behind.
//!
//! ## Names
//!
//! Listings only return names that pass the same validation lookups apply,
//! so every listed record or tag can be read back. Anything else is skipped
//! with a warning.

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::is_valid_component;

/// Subdirectory holding one file per record.
pub const UNSORTED_DIR: &str = "unsorted";

/// Subdirectory holding one directory per tag.
pub const TAGGED_DIR: &str = "tagged";

const MAX_TEMP_ATTEMPTS: u32 = 100;

/// The record store: `unsorted/<id>.<ext>`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
    extension: &'static str,
}

impl RecordStore {
    /// Binds a record store to `dir` using records named `<id>.<extension>`.
    pub fn new(dir: PathBuf, extension: &'static str) -> Self {
        RecordStore { dir, extension }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filename of the record for `id`.
    pub fn filename(&self, id: &str) -> String {
        format!("{}.{}", id, self.extension)
    }

    /// Full path of the record for `id`.
    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(self.filename(id))
    }

    /// Maps a directory entry name back to a record ID.
    ///
    /// Returns `None` for entries without the record extension and for
    /// stems that are not valid IDs (hidden, padded, empty).
    pub fn id_from_filename(&self, name: &OsStr) -> Option<String> {
        let name = name.to_str()?;
        let stem = name.strip_suffix(self.extension)?.strip_suffix('.')?;
        is_valid_component(stem).then(|| stem.to_string())
    }

    /// Returns true if a regular file exists for `id`.
    pub fn contains(&self, id: &str) -> io::Result<bool> {
        is_file(&self.path(id))
    }

    /// Writes a new record. Fails with `AlreadyExists` if one is present.
    ///
    /// Once the record is published the call succeeds; a temporary file that
    /// cannot be removed afterwards is only logged.
    pub fn create(&self, id: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.path(id);
        let temp = write_temp(&self.dir, &self.filename(id), bytes)?;
        let published = fs::hard_link(&temp, &target);
        let cleanup = fs::remove_file(&temp);
        match settle_publish(published, cleanup, &temp) {
            Err(err) if links_unsupported(&err) => {
                debug!(error = %err, "hard links unavailable, creating record in place");
                create_in_place(&target, bytes)
            }
            other => other,
        }
    }

    /// Replaces the content of a record.
    pub fn replace(&self, id: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.path(id);
        let temp = write_temp(&self.dir, &self.filename(id), bytes)?;
        if let Ok(meta) = fs::metadata(&target) {
            // keep whatever mode the maintainer gave the file
            if let Err(err) = fs::set_permissions(&temp, meta.permissions()) {
                let _ = fs::remove_file(&temp);
                return Err(err);
            }
        }
        if let Err(err) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(err);
        }
        Ok(())
    }

    /// Reads the raw bytes of a record.
    pub fn read(&self, id: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(id))
    }

    /// Deletes a record file.
    pub fn remove(&self, id: &str) -> io::Result<()> {
        fs::remove_file(self.path(id))
    }

    /// Lists record IDs in lexicographic order.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            match self.id_from_filename(&entry.file_name()) {
                Some(id) => ids.push(id),
                None => warn!(
                    entry = %entry.path().display(),
                    "skipping non-record entry in record store"
                ),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// The tag index: `tagged/<tag>/<id>.<ext>` links.
#[derive(Debug, Clone)]
pub struct TagIndex {
    dir: PathBuf,
}

impl TagIndex {
    /// Binds a tag index to `dir`.
    pub fn new(dir: PathBuf) -> Self {
        TagIndex { dir }
    }

    /// Directory holding the tag directories.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the directory for `tag`.
    pub fn tag_dir(&self, tag: &str) -> PathBuf {
        self.dir.join(tag)
    }

    /// Returns true if a directory exists for `tag`.
    pub fn contains(&self, tag: &str) -> io::Result<bool> {
        match fs::metadata(self.tag_dir(tag)) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates a link named `filename` in the tag directory pointing at the
    /// record with the same filename.
    ///
    /// The tag directory is created when missing. An existing link is left
    /// alone.
    pub fn link(&self, tag: &str, filename: &str) -> io::Result<()> {
        let tag_dir = self.tag_dir(tag);
        match fs::create_dir(&tag_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }

        // tagged/<tag>/ -> ../../unsorted/<file>
        let target = Path::new("..").join("..").join(UNSORTED_DIR).join(filename);
        match symlink_file(&target, &tag_dir.join(filename)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Removes the link `filename` from the tag directory, then removes the
    /// directory if it is left empty.
    ///
    /// Returns true if a link was removed.
    pub fn unlink(&self, tag: &str, filename: &str) -> io::Result<bool> {
        let tag_dir = self.tag_dir(tag);
        let link = tag_dir.join(filename);

        let removed = match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::remove_file(&link)?;
                true
            }
            Ok(_) => false,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(err),
        };

        if is_empty_dir(&tag_dir)? {
            fs::remove_dir(&tag_dir)?;
        }
        Ok(removed)
    }

    /// Lists the entry names inside the directory for `tag`.
    pub fn entries(&self, tag: &str) -> io::Result<Vec<std::ffi::OsString>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.tag_dir(tag))? {
            names.push(entry?.file_name());
        }
        Ok(names)
    }

    /// Lists tag names in lexicographic order.
    pub fn list(&self) -> io::Result<Vec<String>> {
        let mut tags = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                warn!(entry = %entry.path().display(), "skipping non-directory in tag index");
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if is_valid_component(&name) => tags.push(name),
                Ok(name) => warn!(%name, "skipping tag directory with reserved name"),
                Err(name) => warn!(?name, "skipping tag with non UTF-8 name"),
            }
        }
        tags.sort();
        Ok(tags)
    }
}

/// Creates `dir` if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Creates an empty file at `path` unless a file is already there.
pub fn touch(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map(drop)
}

fn is_file(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn is_empty_dir(path: &Path) -> io::Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// The publish result decides the outcome; a leftover temporary file is
/// only logged.
fn settle_publish(
    published: io::Result<()>,
    cleanup: io::Result<()>,
    temp: &Path,
) -> io::Result<()> {
    if let Err(err) = cleanup {
        warn!(temp = %temp.display(), error = %err, "failed to remove temporary file");
    }
    published
}

fn links_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
    )
}

fn create_in_place(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(target)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    if let Err(err) = written {
        let _ = fs::remove_file(target);
        return Err(err);
    }
    Ok(())
}

fn write_temp(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let (mut file, temp) = create_temp(dir, filename)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    if let Err(err) = written {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    Ok(temp)
}

fn create_temp(dir: &Path, filename: &str) -> io::Result<(File, PathBuf)> {
    for attempt in 0..MAX_TEMP_ATTEMPTS {
        let temp = dir.join(format!(".{}.tmp.{}.{}", filename, std::process::id(), attempt));
        match OpenOptions::new().write(true).create_new(true).open(&temp) {
            Ok(file) => return Ok((file, temp)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free temporary name for {}", filename),
    ))
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStore, TagIndex) {
        let temp = TempDir::new().unwrap();
        let records = RecordStore::new(temp.path().join(UNSORTED_DIR), "yaml");
        let tags = TagIndex::new(temp.path().join(TAGGED_DIR));
        ensure_dir(records.dir()).unwrap();
        ensure_dir(tags.dir()).unwrap();
        (temp, records, tags)
    }

    fn hidden_entries(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
            .count()
    }

    #[test]
    fn test_id_from_filename() {
        let store = RecordStore::new(PathBuf::from("unsorted"), "yaml");
        assert_eq!(store.id_from_filename(OsStr::new("alice.yaml")), Some("alice".into()));
        assert_eq!(store.id_from_filename(OsStr::new("a.b.yaml")), Some("a.b".into()));
        assert_eq!(store.id_from_filename(OsStr::new("alice.json")), None);
        assert_eq!(store.id_from_filename(OsStr::new("alice")), None);
        assert_eq!(store.id_from_filename(OsStr::new(".yaml")), None);
        assert_eq!(store.id_from_filename(OsStr::new("alice .yaml")), None);
        assert_eq!(
            store.id_from_filename(OsStr::new(".alice.yaml.tmp.12.0")),
            None
        );
    }

    #[test]
    fn test_create_and_read() {
        let (_temp, records, _) = setup();
        records.create("alice", b"name: Alice\n").unwrap();

        assert!(records.contains("alice").unwrap());
        assert_eq!(records.read("alice").unwrap(), b"name: Alice\n");
        assert_eq!(hidden_entries(records.dir()), 0);
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let (_temp, records, _) = setup();
        records.create("alice", b"first").unwrap();

        let err = records.create("alice", b"second").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(records.read("alice").unwrap(), b"first");
        assert_eq!(hidden_entries(records.dir()), 0);
    }

    #[test]
    fn test_replace() {
        let (_temp, records, _) = setup();
        records.create("alice", b"first").unwrap();
        records.replace("alice", b"second").unwrap();

        assert_eq!(records.read("alice").unwrap(), b"second");
        assert_eq!(hidden_entries(records.dir()), 0);
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let (_temp, records, _) = setup();
        for id in ["gamma", "alpha", "beta"] {
            records.create(id, b"x").unwrap();
        }
        fs::write(records.dir().join("notes.txt"), b"").unwrap();
        fs::write(records.dir().join(".alpha.yaml.tmp.1.0"), b"").unwrap();

        assert_eq!(records.list().unwrap(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_list_skips_invalid_ids() {
        let (_temp, records, _) = setup();
        records.create("alice", b"x").unwrap();
        fs::write(records.dir().join(" bob.yaml"), b"x").unwrap();
        fs::write(records.dir().join(".hidden.yaml"), b"x").unwrap();

        assert_eq!(records.list().unwrap(), vec!["alice"]);
        assert_eq!(records.id_from_filename(OsStr::new(" bob.yaml")), None);
    }

    #[test]
    fn test_published_record_survives_cleanup_failure() {
        let temp = Path::new(".alice.yaml.tmp.1.0");
        let denied = || Err(io::Error::from(io::ErrorKind::PermissionDenied));

        assert!(settle_publish(Ok(()), denied(), temp).is_ok());
        assert!(settle_publish(Ok(()), Ok(()), temp).is_ok());

        let err = settle_publish(
            Err(io::Error::from(io::ErrorKind::AlreadyExists)),
            denied(),
            temp,
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_create_in_place_refuses_overwrite() {
        let (_temp, records, _) = setup();
        let target = records.path("alice");

        create_in_place(&target, b"first").unwrap();
        let err = create_in_place(&target, b"second").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(records.read("alice").unwrap(), b"first");
    }

    #[test]
    fn test_links_unsupported_classification() {
        assert!(links_unsupported(&io::Error::from(io::ErrorKind::Unsupported)));
        assert!(links_unsupported(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!links_unsupported(&io::Error::from(io::ErrorKind::AlreadyExists)));
        assert!(!links_unsupported(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[test]
    fn test_link_is_relative_and_idempotent() {
        let (_temp, records, tags) = setup();
        records.create("alice", b"x").unwrap();

        tags.link("people", "alice.yaml").unwrap();
        tags.link("people", "alice.yaml").unwrap();

        let link = tags.tag_dir("people").join("alice.yaml");
        let target = fs::read_link(&link).unwrap();
        assert!(target.is_relative());
        assert_eq!(fs::read(&link).unwrap(), b"x");
        assert_eq!(tags.entries("people").unwrap().len(), 1);
    }

    #[test]
    fn test_unlink_prunes_empty_tag() {
        let (_temp, records, tags) = setup();
        records.create("alice", b"x").unwrap();
        records.create("bob", b"x").unwrap();
        tags.link("people", "alice.yaml").unwrap();
        tags.link("people", "bob.yaml").unwrap();

        assert!(tags.unlink("people", "alice.yaml").unwrap());
        assert!(tags.contains("people").unwrap());

        assert!(tags.unlink("people", "bob.yaml").unwrap());
        assert!(!tags.contains("people").unwrap());
    }

    #[test]
    fn test_unlink_missing_is_noop() {
        let (_temp, _, tags) = setup();
        assert!(!tags.unlink("nothing", "alice.yaml").unwrap());
    }

    #[test]
    fn test_list_tags_skips_files() {
        let (_temp, records, tags) = setup();
        records.create("alice", b"x").unwrap();
        tags.link("zeta", "alice.yaml").unwrap();
        tags.link("alpha", "alice.yaml").unwrap();
        fs::write(tags.dir().join("README"), b"").unwrap();
        fs::create_dir(tags.dir().join(".trash")).unwrap();
        fs::create_dir(tags.dir().join(" padded")).unwrap();

        assert_eq!(tags.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_touch_keeps_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("marker");
        touch(&path).unwrap();
        fs::write(&path, b"keep").unwrap();
        touch(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"keep");
    }
}
