//! Git operations abstraction layer
//!
//! This module provides trait-based abstractions over the version-control
//! remote, allowing for a real `git2` implementation and an in-memory mock
//! for testing.
//!
//! # Overview
//!
//! - [TagStore]: the tag capability the alias manager and release publisher
//!   depend on (list, create, delete, push, remote delete)
//! - [SourceControl]: a working copy the push orchestrator drives (fetch,
//!   checkout, stage, commit, push) on top of [TagStore]
//!
//! Implementations:
//!
//! - [repository::Git2Repository]: a real working copy using the `git2` crate
//! - [mock::MockRepository]: a recording mock with separate local and remote tag sets
//!
//! ```rust
//! # use data_version::git::TagStore;
//! # fn example<S: TagStore>(store: &S) -> data_version::Result<()> {
//! for tag in store.list_tags()? {
//!     println!("{} -> {}", tag.name, tag.commit.short_id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::{MockCall, MockOp, MockRepository};
pub use repository::{GitCredentials, Git2Repository};

use std::path::{Path, PathBuf};

use crate::domain::{CommitRef, Tag};
use crate::error::Result;

/// Tag operations on a working copy and its remote
///
/// Local operations (`create_tag`, `delete_tag`) touch only the working copy;
/// `push_tag` and `delete_remote_tag` are network calls against `remote`.
pub trait TagStore {
    /// List all local tags that point at commits
    ///
    /// After a fetch this mirrors the remote's tag set.
    fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Find a local tag by name
    fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.list_tags()?.into_iter().find(|t| t.name == name))
    }

    /// Create a lightweight tag at `target`
    ///
    /// With `force` an existing tag of the same name is overwritten; without it
    /// an existing tag is an error.
    fn create_tag(&self, name: &str, target: &CommitRef, force: bool) -> Result<Tag>;

    /// Delete a local tag
    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Push one tag to the remote
    fn push_tag(&self, remote: &str, name: &str) -> Result<()>;

    /// Delete a tag from the remote
    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()>;
}

/// A checked-out working copy of the versioned repository
pub trait SourceControl: TagStore {
    /// Root directory of the working copy
    fn workdir(&self) -> Result<PathBuf>;

    /// Fetch all branches and tags from the remote
    ///
    /// Local tags that no longer exist on the remote are deleted, so the tag
    /// listing afterwards mirrors the remote.
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Check out `branch`, tracking and fast-forwarding `remote/branch` when it exists
    ///
    /// # Returns
    /// * `Ok(true)` - The branch existed on the remote
    /// * `Ok(false)` - The branch was created locally
    fn checkout_branch(&self, remote: &str, branch: &str) -> Result<bool>;

    /// Add paths (relative to the working copy root) to the index
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commit the index on the current branch
    fn commit(&self, message: &str) -> Result<CommitRef>;

    /// Push a local branch to the remote
    fn push_branch(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Path of `path` inside a working copy rooted at `workdir`
///
/// Relative paths keep their layout; absolute paths are flattened to their file name.
pub fn path_in_workdir(workdir: &Path, path: &Path) -> PathBuf {
    workdir.join(relative_artifact_path(path))
}

/// Working-copy-relative path an artifact is tracked under
pub fn relative_artifact_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.file_name().map(PathBuf::from).unwrap_or_default()
    } else {
        path.components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    }
}
