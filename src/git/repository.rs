use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Commit, Cred, CredentialType, Direction, ErrorCode, FetchOptions, Oid,
    PushOptions, Remote, RemoteCallbacks, Repository as Git2Repo, Signature,
};
use tracing::{debug, info};

use crate::domain::{CommitRef, Tag};
use crate::error::{DataVersionError, Result};
use crate::git::{SourceControl, TagStore};

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// HTTP(S) credentials for the git remote
#[derive(Clone)]
pub struct GitCredentials {
    pub username: String,
    pub password: String,
}

impl GitCredentials {
    /// Read `GITHUB_USERNAME` / `GITHUB_PASSWORD`; `None` when either is unset or empty
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("GITHUB_USERNAME").ok().filter(|v| !v.is_empty())?;
        let password = std::env::var("GITHUB_PASSWORD").ok().filter(|v| !v.is_empty())?;
        Some(GitCredentials { username, password })
    }

    /// Credentials needed to reach `url`
    ///
    /// HTTP(S) remotes require them; SSH and local remotes authenticate otherwise.
    pub fn require_for(url: &str, credentials: Option<Self>) -> Result<Option<Self>> {
        let is_http = url.starts_with("http://") || url.starts_with("https://");
        match credentials {
            None if is_http => Err(DataVersionError::credentials(
                "GITHUB_USERNAME or GITHUB_PASSWORD environment variables not set",
            )),
            other => Ok(other),
        }
    }
}

impl std::fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Working copy backed by `git2`
pub struct Git2Repository {
    repo: Git2Repo,
    credentials: Option<GitCredentials>,
}

impl Git2Repository {
    /// Open an existing working copy
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::open(path)?;

        Ok(Git2Repository {
            repo,
            credentials: None,
        })
    }

    /// Clone `url` into `path`
    pub fn clone_from<P: AsRef<Path>>(
        url: &str,
        path: P,
        credentials: Option<GitCredentials>,
    ) -> Result<Self> {
        info!(url = %redact_url(url), path = %path.as_ref().display(), "cloning repository");

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(credentials.as_ref()));

        let repo = RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, path.as_ref())
            .map_err(|e| DataVersionError::remote(format!("Clone of '{}' failed: {}", redact_url(url), e)))?;

        Ok(Git2Repository { repo, credentials })
    }

    /// Open `path` when it already holds a working copy, otherwise clone `url` into it
    pub fn clone_or_open<P: AsRef<Path>>(
        url: &str,
        path: P,
        credentials: Option<GitCredentials>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.join(".git").exists() {
            debug!(path = %path.display(), "reusing existing working copy");
            Ok(Self::open(path)?.with_credentials(credentials))
        } else {
            Self::clone_from(url, path, credentials)
        }
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo,
            credentials: None,
        }
    }

    /// Use `credentials` for later network operations
    pub fn with_credentials(mut self, credentials: Option<GitCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("data-version", "data-version@localhost")?),
        }
    }

    /// Delete local tags that are no longer advertised by `remote`
    fn prune_tags(&self, remote: &mut Remote<'_>) -> Result<()> {
        let remote_name = remote.name().unwrap_or("remote").to_string();
        let connection = remote
            .connect_auth(
                Direction::Fetch,
                Some(remote_callbacks(self.credentials.as_ref())),
                None,
            )
            .map_err(|e| DataVersionError::remote(format!("Cannot list '{}': {}", remote_name, e)))?;

        let advertised: HashSet<String> = connection
            .list()?
            .iter()
            .filter_map(|head| head.name().strip_prefix("refs/tags/"))
            .map(|name| name.trim_end_matches("^{}").to_string())
            .collect();
        drop(connection);

        for name in self.repo.tag_names(None)?.iter().flatten() {
            if !advertised.contains(name) {
                info!(tag = name, remote = %remote_name, "pruning tag deleted on remote");
                self.repo.tag_delete(name)?;
            }
        }
        Ok(())
    }

    /// Commit currently checked out
    pub fn head_commit(&self) -> Result<CommitRef> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit_ref(&commit))
    }

    /// HEAD commit, or `None` on an unborn branch
    fn head_commit_object(&self) -> Result<Option<Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fast-forward a local branch to `remote_ref` when possible, like `git pull --ff-only`
    fn fast_forward(&self, branch_name: &str, remote_ref: &str) -> Result<()> {
        let remote_oid = self
            .repo
            .find_reference(remote_ref)?
            .target()
            .ok_or_else(|| DataVersionError::remote(format!("Remote {} reference is invalid", remote_ref)))?;

        let branch_ref_name = format!("refs/heads/{}", branch_name);
        let mut local_ref = self.repo.find_reference(&branch_ref_name)?;
        let local_oid = match local_ref.target() {
            Some(oid) => oid,
            None => return Ok(()),
        };

        if local_oid == remote_oid {
            return Ok(());
        }

        // Diverged or ahead: leave the local branch alone
        if !self.repo.graph_descendant_of(remote_oid, local_oid)? {
            return Ok(());
        }

        local_ref.set_target(remote_oid, &format!("fast-forward from {}", remote_ref))?;
        debug!(branch = branch_name, to = %remote_oid, "fast-forwarded branch");
        Ok(())
    }

    fn push_refspecs(&self, remote_name: &str, refspecs: &[String]) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|e| DataVersionError::remote(format!("Cannot find remote '{}': {}", remote_name, e)))?;

        let mut callbacks = remote_callbacks(self.credentials.as_ref());
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
        remote.push(&specs, Some(&mut push_options)).map_err(|e| {
            if e.class() == git2::ErrorClass::Net {
                DataVersionError::remote(format!("Network error during push: {}", e))
            } else {
                DataVersionError::remote(format!("Push to '{}' failed: {}", remote_name, e))
            }
        })
    }
}

/// Credential callbacks shared by fetch, clone and push
///
/// Tries plaintext credentials for HTTP(S), then SSH keys from `~/.ssh` and the
/// agent, then git's default helpers. Gives up after a few attempts so rejected
/// credentials fail instead of looping.
fn remote_callbacks(credentials: Option<&GitCredentials>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;

    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Some(creds) = credentials {
                return Cred::userpass_plaintext(&creds.username, &creds.password);
            }
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let user = username_from_url.unwrap_or("git");
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(user, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
            if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                return Ok(cred);
            }
        }

        Cred::default()
    });

    callbacks
}

/// Strip user info from a URL before it is logged
fn redact_url(url: &str) -> String {
    if let Some((scheme, rest)) = url.split_once("://") {
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at) = rest[..authority_end].rfind('@') {
            return format!("{}://***@{}", scheme, &rest[at + 1..]);
        }
    }
    url.to_string()
}

fn commit_ref(commit: &Commit<'_>) -> CommitRef {
    let time = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
    CommitRef::new(commit.id().to_string(), time)
}

impl TagStore for Git2Repository {
    fn list_tags(&self) -> Result<Vec<Tag>> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::new();

        for name in names.iter().flatten() {
            let reference = self.repo.find_reference(&format!("refs/tags/{}", name))?;
            // Tags on trees or blobs carry no commit time and cannot be releases
            if let Ok(commit) = reference.peel_to_commit() {
                tags.push(Tag::new(name, commit_ref(&commit)));
            }
        }

        Ok(tags)
    }

    fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| DataVersionError::tag(format!("Cannot peel tag '{}': {}", name, e)))?;
                Ok(Some(Tag::new(name, commit_ref(&commit))))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(DataVersionError::tag(format!("Cannot find tag '{}': {}", name, e))),
        }
    }

    fn create_tag(&self, name: &str, target: &CommitRef, force: bool) -> Result<Tag> {
        let oid = Oid::from_str(&target.id)?;
        let object = self
            .repo
            .find_object(oid, None)
            .map_err(|e| DataVersionError::tag(format!("Cannot find object {}: {}", target.id, e)))?;

        self.repo
            .tag_lightweight(name, &object, force)
            .map_err(|e| DataVersionError::tag(format!("Cannot create tag '{}': {}", name, e)))?;

        Ok(Tag::new(name, target.clone()))
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.repo
            .tag_delete(name)
            .map_err(|e| DataVersionError::tag(format!("Cannot delete tag '{}': {}", name, e)))
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.push_refspecs(remote, &[format!("refs/tags/{0}:refs/tags/{0}", name)])
    }

    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.push_refspecs(remote, &[format!(":refs/tags/{}", name)])
    }
}

impl SourceControl for Git2Repository {
    fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| DataVersionError::config("Repository is bare; a working copy is required"))
    }

    fn fetch(&self, remote_name: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|e| DataVersionError::remote(format!("Cannot find remote '{}': {}", remote_name, e)))?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(self.credentials.as_ref()));

        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", remote_name);
        let refspecs = [refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        remote
            .fetch(&refspecs, Some(&mut fetch_options), None)
            .map_err(|e| DataVersionError::remote(format!("Fetch from '{}' failed: {}", remote_name, e)))?;

        self.prune_tags(&mut remote)
    }

    fn checkout_branch(&self, remote: &str, branch: &str) -> Result<bool> {
        let remote_ref = format!("refs/remotes/{}/{}", remote, branch);
        let remote_exists = match self.repo.find_reference(&remote_ref) {
            Ok(_) => true,
            Err(e) if e.code() == ErrorCode::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        let branch_ref_name = format!("refs/heads/{}", branch);

        match self.repo.find_branch(branch, BranchType::Local) {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::NotFound => {
                let start = if remote_exists {
                    Some(self.repo.find_reference(&remote_ref)?.peel_to_commit()?)
                } else {
                    self.head_commit_object()?
                };

                match start {
                    Some(commit) => {
                        let mut created = self.repo.branch(branch, &commit, false)?;
                        if remote_exists {
                            created.set_upstream(Some(format!("{}/{}", remote, branch).as_str()))?;
                        }
                    }
                    None => {
                        // Empty repository: HEAD becomes an unborn branch
                        self.repo.set_head(&branch_ref_name)?;
                        info!(branch, "checked out unborn branch");
                        return Ok(false);
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }

        if remote_exists {
            self.fast_forward(branch, &remote_ref)?;
        }

        self.repo.set_head(&branch_ref_name)?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))?;

        info!(branch, remote_exists, "checked out branch");
        Ok(remote_exists)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path).map_err(|e| {
                DataVersionError::Git(git2::Error::from_str(&format!(
                    "Cannot stage '{}': {}",
                    path.display(),
                    e
                )))
            })?;
        }
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<CommitRef> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;

        let parent = self.head_commit_object()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        let commit = self.repo.find_commit(oid)?;

        Ok(commit_ref(&commit))
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.push_refspecs(remote, &[format!("refs/heads/{0}:refs/heads/{0}", branch)])
    }
}
