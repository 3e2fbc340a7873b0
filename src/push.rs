//! Push orchestration
//!
//! Uploads the partitions to the artifact store, commits the pointer files to
//! the git working copy and publishes the next data version. Each step is
//! attempted once; the first failure aborts the push with the step's name.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::artifact::{
    configure_remote, gitignore_path, pointer_path, ArtifactCredentials, ArtifactStore,
    RemoteSettings,
};
use crate::config::Config;
use crate::domain::CommitRef;
use crate::error::{run_step, Result};
use crate::git::{path_in_workdir, relative_artifact_path, SourceControl};
use crate::release::{publish_release, ReleaseOutcome};
use crate::warning::PipelineWarning;

/// Files `dvc init` creates that belong in git
const PROJECT_FILES: &[&str] = &[".dvc/config", ".dvc/.gitignore", ".dvcignore"];

/// Everything a successful push produced
#[derive(Debug, Clone, PartialEq)]
pub struct PushOutcome {
    pub commit: CommitRef,
    /// Pointer and project files committed, relative to the working copy
    pub staged: Vec<PathBuf>,
    pub release: ReleaseOutcome,
    pub warnings: Vec<PipelineWarning>,
}

/// Versions the train/val/test partitions named in `config`.
///
/// Fetch and check out the branch, copy the partitions in, track and upload
/// them with the artifact store, commit and push the pointer files, then tag
/// the new commit.
pub fn push_data<R, A>(
    repo: &R,
    artifacts: &A,
    config: &Config,
    credentials: &ArtifactCredentials,
) -> Result<PushOutcome>
where
    R: SourceControl + ?Sized,
    A: ArtifactStore + ?Sized,
{
    let remote = config.git.remote.as_str();
    let branch = config.git.branch.as_str();
    let scheme = config.tag_scheme()?;
    let mut warnings = Vec::new();

    run_step("git fetch", || repo.fetch(remote))?;
    run_step("git checkout", || repo.checkout_branch(remote, branch))?;

    let workdir = repo.workdir()?;
    let tracked = run_step("copy artifacts", || {
        copy_artifacts(&workdir, &config.data_split.partition_paths())
    })?;

    if !artifacts.is_initialized() {
        run_step("dvc init", || artifacts.init())?;
    }
    let settings = RemoteSettings::from(&config.artifact_store);
    warnings.extend(run_step("dvc remote", || {
        configure_remote(artifacts, &settings, credentials)
    })?);
    run_step("dvc add", || {
        tracked.iter().try_for_each(|path| artifacts.add(path))
    })?;
    run_step("dvc push", || artifacts.push(&settings.name))?;

    let staged = files_to_stage(&workdir, &tracked);
    run_step("git add", || repo.stage(&staged))?;

    let message = config.render_commit_message(Utc::now());
    let commit = run_step("git commit", || repo.commit(&message))?;
    info!(commit = %commit.id, "committed pointer files");

    run_step("git push", || repo.push_branch(remote, branch))?;

    let release = run_step("tag release", || {
        publish_release(repo, remote, &scheme, &commit)
    })?;
    warnings.extend(release.warnings.iter().cloned());

    info!(
        tag = %release.plan.tag_name,
        commit = %commit.short_id(),
        "data version published"
    );

    Ok(PushOutcome {
        commit,
        staged,
        release,
        warnings,
    })
}

/// Copy each source file to its place in the working copy
///
/// # Returns
/// Working-copy-relative paths of the copies, in input order
fn copy_artifacts(workdir: &Path, sources: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut tracked = Vec::with_capacity(sources.len());
    for source in sources {
        let relative = relative_artifact_path(source);
        let destination = path_in_workdir(workdir, source);

        if !same_file(source, &destination) {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &destination)?;
            debug!(
                from = %source.display(),
                to = %destination.display(),
                "copied artifact"
            );
        }
        tracked.push(relative);
    }
    Ok(tracked)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Pointer files, the ignore files next to them and the project files, when present
fn files_to_stage(workdir: &Path, tracked: &[PathBuf]) -> Vec<PathBuf> {
    let mut staged: Vec<PathBuf> = Vec::new();
    let candidates = tracked
        .iter()
        .flat_map(|path| [pointer_path(path), gitignore_path(path)])
        .chain(PROJECT_FILES.iter().map(PathBuf::from));

    for candidate in candidates {
        if workdir.join(&candidate).is_file() && !staged.contains(&candidate) {
            staged.push(candidate);
        }
    }
    staged
}
