//! Shared test fixtures for ftsearch integration tests
//!
//! Provides attachments, containers and on-disk files so each test crate
//! does not rebuild the host-side model by hand.
//!
//! ## Usage
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! ftsearch-test-utils = { path = "../ftsearch-test-utils" }
//! ```
//!
//! In your tests:
//! ```no_run
//! use ftsearch_test_utils::{TestFiles, attachment_in, issue};
//!
//! let files = TestFiles::new();
//! let path = files.write("notes.txt", b"hello");
//! let attachment = attachment_in(issue(7, 3, true), path);
//! ```

#![allow(clippy::expect_used)] // Test infrastructure - panic on setup failure is acceptable

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use ftsearch_meta_data::{
    Attachment, Board, Container, Issue, Message, ProjectRef, Wiki, WikiPage,
};

/// Global counter for unique entity ids across ALL test crates
static ID_COUNTER: AtomicI64 = AtomicI64::new(1000);

/// Get next unique entity id
///
/// ```
/// use ftsearch_test_utils::next_id;
///
/// let first = next_id();
/// assert!(next_id() > first);
/// ```
pub fn next_id() -> i64 {
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Fixed upload timestamp so records compare deterministically
pub fn created_on() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub fn project_ref(id: i64) -> ProjectRef {
    ProjectRef::new(id, format!("project-{id}"))
}

pub fn project(id: i64) -> Container {
    Container::Project(project_ref(id))
}

pub fn issue(project_id: i64, status_id: i64, is_private: bool) -> Container {
    Container::Issue(Issue {
        id: next_id(),
        project: project_ref(project_id),
        status_id,
        is_private,
    })
}

/// Forum message posted on a board of `project_id`
pub fn message(project_id: i64) -> Container {
    Container::Message(Message {
        id: next_id(),
        board: Board {
            id: next_id(),
            project: project_ref(project_id),
        },
    })
}

pub fn wiki_page(project_id: i64) -> Container {
    Container::WikiPage(WikiPage {
        id: next_id(),
        wiki: Wiki {
            id: next_id(),
            project: project_ref(project_id),
        },
    })
}

/// Attachment stored at `path` and attached to `container`
pub fn attachment_in(container: Container, path: impl Into<PathBuf>) -> Attachment {
    let path = path.into();
    Attachment {
        id: next_id(),
        filename: file_name(&path),
        description: Some("uploaded in tests".to_string()),
        created_on: created_on(),
        content_type: None,
        disk_path: path,
        container: Some(container),
    }
}

/// Attachment still being uploaded
pub fn unattached(path: impl Into<PathBuf>) -> Attachment {
    Attachment {
        container: None,
        ..attachment_in(project(0), path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Temporary directory of attachment files, removed on drop
pub struct TestFiles {
    dir: tempfile::TempDir,
}

impl TestFiles {
    /// # Panics
    /// Panics if the temporary directory cannot be created
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `name` and return the full path
    ///
    /// # Panics
    /// Panics if the file cannot be written
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("Failed to write test file");
        path
    }

    /// Path inside the directory that does not exist
    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}
