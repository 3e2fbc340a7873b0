//! Pipeline workflow orchestration
//!
//! Runs the requested stages against a loaded [Config], keeping argument
//! parsing in `main.rs` separate from the work itself so the pipeline can be
//! driven programmatically.

use std::path::Path;

use tracing::info;

use crate::artifact::{ArtifactCredentials, DvcCli};
use crate::config::Config;
use crate::dataset::{cleanse_file, download, split_file, CleanseReport};
use crate::error::{run_step, Result};
use crate::git::{GitCredentials, Git2Repository, SourceControl, TagStore};
use crate::push::{push_data, PushOutcome};
use crate::release::ReleasePlan;

/// One pipeline stage; declaration order is execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Gather,
    Cleanse,
    Split,
    Push,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Gather, Stage::Cleanse, Stage::Split, Stage::Push];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Gather => "gather",
            Stage::Cleanse => "cleanse",
            Stage::Split => "split",
            Stage::Push => "push",
        }
    }
}

/// What each stage that ran produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub stages: Vec<Stage>,
    pub downloaded_bytes: Option<u64>,
    pub cleanse: Option<CleanseReport>,
    /// Train, validation and test row counts
    pub split: Option<(usize, usize, usize)>,
    pub push: Option<PushOutcome>,
}

/// Run `stages` in canonical order, each at most once.
///
/// Stops at the first failing stage.
pub fn run_pipeline(stages: &[Stage], config: &Config) -> Result<PipelineReport> {
    config.validate()?;

    let mut ordered = stages.to_vec();
    ordered.sort();
    ordered.dedup();

    let mut report = PipelineReport {
        stages: ordered.clone(),
        ..PipelineReport::default()
    };

    for stage in ordered {
        info!(stage = stage.name(), "running stage");
        match stage {
            Stage::Gather => {
                let bytes = run_step("gather", || {
                    download(&config.data_url, &config.data_split.raw_data_save_path)
                })?;
                report.downloaded_bytes = Some(bytes);
            }
            Stage::Cleanse => {
                report.cleanse = Some(run_step("cleanse", || cleanse_file(&config.data_split))?);
            }
            Stage::Split => {
                let partitions = run_step("split", || split_file(&config.data_split))?;
                report.split = Some(partitions.sizes());
            }
            Stage::Push => {
                report.push = Some(push_stage(config)?);
            }
        }
    }

    Ok(report)
}

/// Clone or reuse the working copy and push with the real git and DVC backends
fn push_stage(config: &Config) -> Result<PushOutcome> {
    config.validate_for_push()?;

    let credentials = GitCredentials::require_for(&config.git.repo_url, GitCredentials::from_env())?;
    let repo = run_step("git clone", || {
        Git2Repository::clone_or_open(&config.git.repo_url, &config.git.save_dir, credentials)
    })?;
    let dvc = DvcCli::with_program(&config.artifact_store.dvc_command, repo.workdir()?);

    push_data(&repo, &dvc, config, &ArtifactCredentials::from_env())
}

/// Compute the next release from the tags in an existing working copy.
///
/// Reads local tags only; nothing is fetched, created or pushed.
pub fn preview_next_release(config: &Config, repo_path: Option<&Path>) -> Result<ReleasePlan> {
    let scheme = config.tag_scheme()?;
    let path = repo_path.unwrap_or(config.git.save_dir.as_path());
    let repo = Git2Repository::open(path)?;
    ReleasePlan::from_tags(&repo.list_tags()?, &scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_order_is_canonical() {
        let mut stages = vec![Stage::Push, Stage::Gather, Stage::Split];
        stages.sort();
        assert_eq!(stages, vec![Stage::Gather, Stage::Split, Stage::Push]);
    }

    #[test]
    fn test_invalid_config_runs_nothing() {
        let mut config = Config::default();
        config.data_split.test_frac = 2.0;
        assert!(run_pipeline(&Stage::ALL, &config).is_err());
    }

    #[test]
    fn test_push_without_remotes_fails_before_cloning() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.git.save_dir = dir.path().join("repo");

        let err = run_pipeline(&[Stage::Push], &config).unwrap_err();

        assert!(err.to_string().contains("must be set to push"));
        assert!(!config.git.save_dir.exists());
    }

    #[test]
    fn test_preview_on_missing_repo_fails() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        assert!(preview_next_release(&config, Some(dir.path())).is_err());
    }
}
