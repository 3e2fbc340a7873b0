use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::domain::{CommitRef, Tag};
use crate::error::{DataVersionError, Result};
use crate::git::{SourceControl, TagStore};

/// Operations a [MockRepository] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Fetch,
    Checkout,
    Stage,
    Commit,
    PushBranch,
    CreateTag,
    DeleteTag,
    PushTag,
    DeleteRemoteTag,
}

/// A call recorded by [MockRepository], in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Fetch { remote: String },
    Checkout { remote: String, branch: String },
    Stage { paths: Vec<PathBuf> },
    Commit { message: String },
    PushBranch { remote: String, branch: String },
    CreateTag { name: String, target: String, force: bool },
    DeleteTag { name: String },
    PushTag { remote: String, name: String },
    DeleteRemoteTag { remote: String, name: String },
}

#[derive(Debug)]
struct MockState {
    local_tags: Vec<Tag>,
    remote_tags: Vec<Tag>,
    remote_branches: Vec<String>,
    head: Option<CommitRef>,
    commit_count: u64,
    clock: DateTime<Utc>,
    calls: Vec<MockCall>,
    failures: Vec<MockOp>,
}

/// Mock working copy for testing without actual git operations
///
/// Keeps separate local and remote tag sets so tests can observe exactly what
/// reached the remote. Commits get sequential ids and timestamps one hour apart.
pub struct MockRepository {
    workdir: PathBuf,
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a new empty mock repository rooted at the current directory
    pub fn new() -> Self {
        Self::with_workdir(".")
    }

    /// Create a new empty mock repository rooted at `workdir`
    pub fn with_workdir(workdir: impl AsRef<Path>) -> Self {
        MockRepository {
            workdir: workdir.as_ref().to_path_buf(),
            state: RefCell::new(MockState {
                local_tags: Vec::new(),
                remote_tags: Vec::new(),
                remote_branches: Vec::new(),
                head: None,
                commit_count: 0,
                // 2024-01-01T00:00:00Z
                clock: DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default(),
                calls: Vec::new(),
                failures: Vec::new(),
            }),
        }
    }

    /// Commit currently checked out
    pub fn head_commit(&self) -> Result<CommitRef> {
        self.state
            .borrow()
            .head
            .clone()
            .ok_or_else(|| DataVersionError::Git(git2::Error::from_str("reference 'HEAD' not found")))
    }

    /// Add a tag present both locally and on the remote, as after a fetch
    pub fn add_tag(&self, name: impl Into<String>, commit: CommitRef) {
        let tag = Tag::new(name, commit);
        let mut state = self.state.borrow_mut();
        upsert(&mut state.local_tags, tag.clone());
        upsert(&mut state.remote_tags, tag);
    }

    /// Add a tag that only exists in the working copy
    pub fn add_local_tag(&self, name: impl Into<String>, commit: CommitRef) {
        upsert(&mut self.state.borrow_mut().local_tags, Tag::new(name, commit));
    }

    /// Add a tag that only exists on the remote
    pub fn add_remote_tag(&self, name: impl Into<String>, commit: CommitRef) {
        upsert(&mut self.state.borrow_mut().remote_tags, Tag::new(name, commit));
    }

    /// Declare a branch that exists on the remote
    pub fn add_remote_branch(&self, branch: impl Into<String>) {
        self.state.borrow_mut().remote_branches.push(branch.into());
    }

    /// Set the commit currently checked out
    pub fn set_head(&self, commit: CommitRef) {
        self.state.borrow_mut().head = Some(commit);
    }

    /// Make every later call of `op` fail after being recorded
    pub fn fail_on(&self, op: MockOp) {
        self.state.borrow_mut().failures.push(op);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.borrow().calls.clone()
    }

    pub fn local_tags(&self) -> Vec<Tag> {
        self.state.borrow().local_tags.clone()
    }

    pub fn remote_tags(&self) -> Vec<Tag> {
        self.state.borrow().remote_tags.clone()
    }

    pub fn remote_tag(&self, name: &str) -> Option<Tag> {
        self.state
            .borrow()
            .remote_tags
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    pub fn local_tag(&self, name: &str) -> Option<Tag> {
        self.state
            .borrow()
            .local_tags
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    fn record(&self, call: MockCall, op: MockOp) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        if state.failures.contains(&op) {
            return Err(DataVersionError::remote(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert(tags: &mut Vec<Tag>, tag: Tag) {
    match tags.iter_mut().find(|t| t.name == tag.name) {
        Some(existing) => *existing = tag,
        None => tags.push(tag),
    }
}

impl TagStore for MockRepository {
    fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.local_tags())
    }

    fn create_tag(&self, name: &str, target: &CommitRef, force: bool) -> Result<Tag> {
        self.record(
            MockCall::CreateTag {
                name: name.to_string(),
                target: target.id.clone(),
                force,
            },
            MockOp::CreateTag,
        )?;

        let mut state = self.state.borrow_mut();
        if !force && state.local_tags.iter().any(|t| t.name == name) {
            return Err(DataVersionError::tag(format!("Tag '{}' already exists", name)));
        }
        let tag = Tag::new(name, target.clone());
        upsert(&mut state.local_tags, tag.clone());
        Ok(tag)
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.record(
            MockCall::DeleteTag {
                name: name.to_string(),
            },
            MockOp::DeleteTag,
        )?;

        let mut state = self.state.borrow_mut();
        let before = state.local_tags.len();
        state.local_tags.retain(|t| t.name != name);
        if state.local_tags.len() == before {
            return Err(DataVersionError::tag(format!("Tag '{}' not found", name)));
        }
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.record(
            MockCall::PushTag {
                remote: remote.to_string(),
                name: name.to_string(),
            },
            MockOp::PushTag,
        )?;

        let mut state = self.state.borrow_mut();
        let local = state
            .local_tags
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| {
                DataVersionError::remote(format!("src refspec refs/tags/{} does not match any", name))
            })?;

        if let Some(existing) = state.remote_tags.iter().find(|t| t.name == name) {
            if existing.commit != local.commit {
                return Err(DataVersionError::remote(format!(
                    "remote rejected refs/tags/{}: already exists",
                    name
                )));
            }
        }
        upsert(&mut state.remote_tags, local);
        Ok(())
    }

    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.record(
            MockCall::DeleteRemoteTag {
                remote: remote.to_string(),
                name: name.to_string(),
            },
            MockOp::DeleteRemoteTag,
        )?;

        self.state.borrow_mut().remote_tags.retain(|t| t.name != name);
        Ok(())
    }
}

impl SourceControl for MockRepository {
    fn workdir(&self) -> Result<PathBuf> {
        Ok(self.workdir.clone())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.record(
            MockCall::Fetch {
                remote: remote.to_string(),
            },
            MockOp::Fetch,
        )?;

        // Tags deleted on the remote are pruned locally
        let mut state = self.state.borrow_mut();
        state.local_tags = state.remote_tags.clone();
        Ok(())
    }

    fn checkout_branch(&self, remote: &str, branch: &str) -> Result<bool> {
        self.record(
            MockCall::Checkout {
                remote: remote.to_string(),
                branch: branch.to_string(),
            },
            MockOp::Checkout,
        )?;

        Ok(self
            .state
            .borrow()
            .remote_branches
            .iter()
            .any(|b| b == branch))
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.record(
            MockCall::Stage {
                paths: paths.to_vec(),
            },
            MockOp::Stage,
        )
    }

    fn commit(&self, message: &str) -> Result<CommitRef> {
        self.record(
            MockCall::Commit {
                message: message.to_string(),
            },
            MockOp::Commit,
        )?;

        let mut state = self.state.borrow_mut();
        state.commit_count += 1;
        let commit = CommitRef::new(
            format!("{:040x}", state.commit_count),
            state.clock + Duration::hours(state.commit_count as i64),
        );
        state.head = Some(commit.clone());
        Ok(commit)
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(
            MockCall::PushBranch {
                remote: remote.to_string(),
                branch: branch.to_string(),
            },
            MockOp::PushBranch,
        )?;

        let mut state = self.state.borrow_mut();
        if !state.remote_branches.iter().any(|b| b == branch) {
            state.remote_branches.push(branch.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(id: &str) -> CommitRef {
        CommitRef::new(id, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_mock_repository_tags() {
        let repo = MockRepository::new();
        repo.add_tag("data-v1.0.0", commit("a"));

        assert_eq!(repo.find_tag("data-v1.0.0").unwrap().unwrap().commit.id, "a");
        assert_eq!(repo.find_tag("data-v2.0.0").unwrap(), None);
        assert!(repo.remote_tag("data-v1.0.0").is_some());
    }

    #[test]
    fn test_create_tag_without_force_rejects_existing() {
        let repo = MockRepository::new();
        repo.add_local_tag("data-v1.0.0", commit("a"));

        assert!(repo.create_tag("data-v1.0.0", &commit("b"), false).is_err());
        assert!(repo.create_tag("data-v1.0.0", &commit("b"), true).is_ok());
        assert_eq!(repo.local_tag("data-v1.0.0").unwrap().commit.id, "b");
    }

    #[test]
    fn test_push_tag_rejects_moved_remote_tag() {
        let repo = MockRepository::new();
        repo.add_tag("data-latest", commit("a"));
        repo.create_tag("data-latest", &commit("b"), true).unwrap();

        assert!(repo.push_tag("origin", "data-latest").is_err());

        repo.delete_remote_tag("origin", "data-latest").unwrap();
        repo.push_tag("origin", "data-latest").unwrap();
        assert_eq!(repo.remote_tag("data-latest").unwrap().commit.id, "b");
    }

    #[test]
    fn test_delete_missing_tag_fails() {
        let repo = MockRepository::new();
        assert!(repo.delete_tag("data-latest").is_err());
    }

    #[test]
    fn test_fetch_mirrors_remote_tags() {
        let repo = MockRepository::new();
        repo.add_remote_tag("data-v1.0.0", commit("a"));
        assert!(repo.local_tag("data-v1.0.0").is_none());

        repo.fetch("origin").unwrap();
        assert!(repo.local_tag("data-v1.0.0").is_some());
    }

    #[test]
    fn test_fetch_prunes_tags_deleted_on_remote() {
        let repo = MockRepository::new();
        repo.add_tag("data-v1.0.0", commit("a"));
        repo.add_local_tag("data-latest", commit("a"));

        repo.fetch("origin").unwrap();

        assert!(repo.local_tag("data-v1.0.0").is_some());
        assert!(repo.local_tag("data-latest").is_none());
    }

    #[test]
    fn test_commits_advance_head_and_clock() {
        let repo = MockRepository::new();
        let first = repo.commit("one").unwrap();
        let second = repo.commit("two").unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.time > first.time);
        assert_eq!(repo.head_commit().unwrap(), second);
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let repo = MockRepository::new();
        repo.fail_on(MockOp::PushBranch);

        assert!(repo.push_branch("origin", "main").is_err());
        assert_eq!(
            repo.calls(),
            vec![MockCall::PushBranch {
                remote: "origin".to_string(),
                branch: "main".to_string()
            }]
        );
    }
}
