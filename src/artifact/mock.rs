use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use super::{gitignore_path, pointer_path, ArtifactStore};
use crate::error::{DataVersionError, Result};

/// A call recorded by [MockArtifactStore], in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactCall {
    Init,
    AddRemote { name: String, url: String },
    ModifyRemote { name: String, key: String, value: String, local: bool },
    Add { path: PathBuf },
    Push { remote: String },
}

/// Recording artifact store
///
/// When rooted at a directory it writes the files a real DVC run leaves
/// behind: `.dvc/config`, a pointer file per tracked path and a `.gitignore`
/// next to it.
pub struct MockArtifactStore {
    workdir: Option<PathBuf>,
    calls: RefCell<Vec<ArtifactCall>>,
    fail_push: RefCell<bool>,
}

impl MockArtifactStore {
    /// A store that only records calls
    pub fn new() -> Self {
        MockArtifactStore {
            workdir: None,
            calls: RefCell::new(Vec::new()),
            fail_push: RefCell::new(false),
        }
    }

    /// A store that also writes its files under `workdir`
    pub fn with_workdir(workdir: impl AsRef<Path>) -> Self {
        MockArtifactStore {
            workdir: Some(workdir.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// Make `push` fail after being recorded
    pub fn fail_push(&self) {
        *self.fail_push.borrow_mut() = true;
    }

    pub fn calls(&self) -> Vec<ArtifactCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: ArtifactCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Default for MockArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for MockArtifactStore {
    fn is_initialized(&self) -> bool {
        match &self.workdir {
            Some(dir) => dir.join(".dvc").is_dir(),
            None => self.calls.borrow().contains(&ArtifactCall::Init),
        }
    }

    fn init(&self) -> Result<()> {
        self.record(ArtifactCall::Init);
        if let Some(dir) = &self.workdir {
            fs::create_dir_all(dir.join(".dvc"))?;
            fs::write(dir.join(".dvc").join("config"), "")?;
        }
        Ok(())
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.record(ArtifactCall::AddRemote {
            name: name.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    fn modify_remote(&self, name: &str, key: &str, value: &str, local: bool) -> Result<()> {
        self.record(ArtifactCall::ModifyRemote {
            name: name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            local,
        });
        Ok(())
    }

    fn add(&self, path: &Path) -> Result<()> {
        self.record(ArtifactCall::Add {
            path: path.to_path_buf(),
        });
        if let Some(dir) = &self.workdir {
            if !dir.join(path).is_file() {
                return Err(DataVersionError::artifact(format!(
                    "output '{}' does not exist",
                    path.display()
                )));
            }
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            fs::write(
                dir.join(pointer_path(path)),
                format!("outs:\n- path: {}\n", file_name),
            )?;
            fs::write(dir.join(gitignore_path(path)), format!("/{}\n", file_name))?;
        }
        Ok(())
    }

    fn push(&self, remote: &str) -> Result<()> {
        self.record(ArtifactCall::Push {
            remote: remote.to_string(),
        });
        if *self.fail_push.borrow() {
            return Err(DataVersionError::artifact("injected push failure"));
        }
        Ok(())
    }
}
