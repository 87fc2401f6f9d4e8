//! # OnionTree Repository Integration Tests
//!
//! Tests against the public API and the on-disk format, treating the
//! repository the way other tools (git, editors, shell scripts) see it.
//!
//! ## Coverage
//!
//! | Property | Test |
//! |----------|------|
//! | Layout is plain files and relative links | `test_layout_on_disk` |
//! | Hand-written records are first-class | `test_hand_written_record_visible` |
//! | Stray entries are ignored | `test_stray_entries_ignored` |
//! | Racing writers cannot clobber a record | `test_concurrent_add_single_winner` |
//! | Config drives discovery | `test_config_controls_search_bound` |
//! | Tree survives a move | `test_repository_relocatable` |

use oniontree_repo::{digest, RepoError, Repository, RepositoryConfig, Service, SnapshotOptions};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn sample(name: &str) -> Service {
    let mut service = Service::new(name);
    service.add_urls([format!("http://{}.onion", name.to_lowercase())]);
    service
}

// =============================================================================
// ON-DISK FORMAT
// =============================================================================

#[cfg(unix)]
#[test]
fn test_layout_on_disk() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    repo.add("alice", &sample("Alice")).unwrap();
    repo.tag("alice", ["people"]).unwrap();

    let root = temp.path();
    assert!(root.join(".oniontree").is_file());
    assert!(root.join("unsorted/alice.yaml").is_file());

    let link = root.join("tagged/people/alice.yaml");
    let meta = fs::symlink_metadata(&link).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(
        fs::read_link(&link).unwrap(),
        Path::new("../../unsorted/alice.yaml")
    );

    let text = fs::read_to_string(root.join("unsorted/alice.yaml")).unwrap();
    assert!(text.contains("name: Alice"));
    assert!(text.contains("http://alice.onion"));
    assert!(!text.contains("public_keys"));
}

#[test]
fn test_hand_written_record_visible() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    let empty = repo.hash().unwrap();

    fs::write(
        temp.path().join("unsorted/manual.yaml"),
        "name: Manual\nurls:\n- http://manual.onion\n",
    )
    .unwrap();

    assert_eq!(repo.list().unwrap(), vec!["manual"]);
    assert_eq!(repo.get("manual").unwrap().urls, vec!["http://manual.onion"]);
    assert_ne!(repo.hash().unwrap(), empty);

    repo.tag("manual", ["handmade"]).unwrap();
    assert_eq!(repo.get_service_tags("manual").unwrap(), vec!["handmade"]);
}

#[test]
fn test_stray_entries_ignored() {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    repo.add("alice", &sample("Alice")).unwrap();
    let hash = repo.hash().unwrap();

    let unsorted = temp.path().join("unsorted");
    fs::write(unsorted.join("README.md"), "notes").unwrap();
    fs::write(unsorted.join(".alice.yaml.swp"), "editor junk").unwrap();
    fs::write(temp.path().join("tagged/stray-file"), "not a tag").unwrap();

    assert_eq!(repo.list().unwrap(), vec!["alice"]);
    assert!(repo.list_tags().unwrap().is_empty());
    assert_eq!(repo.hash().unwrap(), hash);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_concurrent_add_single_winner() {
    let temp = TempDir::new().unwrap();
    let repo = Arc::new(Repository::init(temp.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || repo.add("contested", &sample(&format!("Writer{}", n))))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(result, Err(RepoError::IdExists(_))));
    }

    // no temporary files left behind
    let entries: Vec<_> = fs::read_dir(temp.path().join("unsorted"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(repo.get("contested").unwrap().name.starts_with("Writer"));
}

// =============================================================================
// DISCOVERY AND CONFIGURATION
// =============================================================================

#[test]
fn test_config_controls_search_bound() {
    let temp = TempDir::new().unwrap();
    Repository::init(temp.path()).unwrap();
    let deep = temp.path().join("tagged/a/b");
    fs::create_dir_all(&deep).unwrap();

    let shallow = RepositoryConfig {
        max_depth: 2,
        ..Default::default()
    };
    let err = Repository::open_with(&deep, shallow.open_options()).unwrap_err();
    assert!(matches!(err, RepoError::NotARepository { .. }));

    let enough = RepositoryConfig {
        max_depth: 4,
        ..Default::default()
    };
    Repository::open_with(&deep, enough.open_options()).unwrap();
}

#[test]
fn test_repository_relocatable() {
    let temp = TempDir::new().unwrap();
    let original = temp.path().join("original");
    let repo = Repository::init(&original).unwrap();
    repo.add("alice", &sample("Alice")).unwrap();
    repo.tag("alice", ["people"]).unwrap();
    let before = repo.snapshot(&SnapshotOptions::default()).unwrap();
    let hash = digest::to_hex(&repo.hash().unwrap());
    drop(repo);

    let moved = temp.path().join("moved");
    fs::rename(&original, &moved).unwrap();

    let repo = Repository::open(&moved).unwrap();
    assert_eq!(repo.snapshot(&SnapshotOptions::default()).unwrap(), before);
    assert_eq!(digest::to_hex(&repo.hash().unwrap()), hash);
}
