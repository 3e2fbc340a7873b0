use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use super::ArtifactStore;
use crate::error::{DataVersionError, Result};

/// Drives the `dvc` executable inside a working copy
pub struct DvcCli {
    program: String,
    workdir: PathBuf,
}

impl DvcCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::with_program("dvc", workdir)
    }

    /// Use a different executable, e.g. a wrapper script or a virtualenv path
    pub fn with_program(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        DvcCli {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run one command in the working copy
    ///
    /// # Returns
    /// * `Ok(())` if the command exits with code 0
    /// * `Err` if it cannot be started or exits non-zero
    fn run(&self, args: &[&str]) -> Result<()> {
        debug!(program = %self.program, args = ?redact_args(args), "running artifact command");

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| {
                DataVersionError::artifact(format!("Failed to execute {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(DataVersionError::artifact(format!(
                "{} {} failed with exit code {}\nStdout: {}\nStderr: {}",
                self.program,
                redact_args(args).join(" "),
                output.status.code().unwrap_or(-1),
                stdout.trim(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Mask the value following a credential key so it never reaches logs or errors
fn redact_args(args: &[&str]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push("***".to_string());
            mask_next = false;
        } else {
            mask_next = matches!(*arg, "secret_access_key" | "access_key_id");
            redacted.push(arg.to_string());
        }
    }
    redacted
}

impl ArtifactStore for DvcCli {
    fn is_initialized(&self) -> bool {
        self.workdir.join(".dvc").is_dir()
    }

    fn init(&self) -> Result<()> {
        self.run(&["init"])
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "add", "-f", name, url])
    }

    fn modify_remote(&self, name: &str, key: &str, value: &str, local: bool) -> Result<()> {
        if local {
            self.run(&["remote", "modify", "--local", name, key, value])
        } else {
            self.run(&["remote", "modify", name, key, value])
        }
    }

    fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_str().ok_or_else(|| {
            DataVersionError::artifact(format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        self.run(&["add", path])
    }

    fn push(&self, remote: &str) -> Result<()> {
        self.run(&["push", "-r", remote])
    }
}
