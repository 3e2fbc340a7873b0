// tests/push_test.rs
use std::fs;
use std::path::{Path, PathBuf};

use data_version::artifact::{ArtifactCall, ArtifactCredentials, MockArtifactStore};
use data_version::config::Config;
use data_version::error::DataVersionError;
use data_version::git::{MockCall, MockOp, MockRepository};
use data_version::push::push_data;
use data_version::warning::PipelineWarning;
use tempfile::TempDir;

struct Fixture {
    _data: TempDir,
    work: TempDir,
    config: Config,
}

/// Partition files in one directory, an empty working copy in another
fn fixture() -> Fixture {
    let data = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let mut config = Config::default();
    config.git.repo_url = "https://example.com/team/data.git".to_string();
    config.artifact_store.url = "s3://bucket/data".to_string();
    config.commit_message = "Update data".to_string();

    let split = &mut config.data_split;
    split.train_data_save_path = write(data.path(), "train.csv");
    split.val_data_save_path = write(data.path(), "val.csv");
    split.test_data_save_path = write(data.path(), "test.csv");

    Fixture {
        _data: data,
        work,
        config,
    }
}

fn write(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "x,target\n1,0\n").unwrap();
    path
}

fn full_credentials() -> ArtifactCredentials {
    ArtifactCredentials {
        access_key_id: Some("key".to_string()),
        secret_access_key: Some("secret".to_string()),
    }
}

#[test]
fn test_push_runs_steps_in_order() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());

    let outcome = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap();

    let calls = repo.calls();
    assert_eq!(
        calls[0],
        MockCall::Fetch {
            remote: "origin".to_string()
        }
    );
    assert_eq!(
        calls[1],
        MockCall::Checkout {
            remote: "origin".to_string(),
            branch: "main".to_string()
        }
    );
    assert!(matches!(calls[2], MockCall::Stage { .. }));
    assert_eq!(
        calls[3],
        MockCall::Commit {
            message: "Update data".to_string()
        }
    );
    assert_eq!(
        calls[4],
        MockCall::PushBranch {
            remote: "origin".to_string(),
            branch: "main".to_string()
        }
    );

    let dvc_calls = dvc.calls();
    assert_eq!(dvc_calls[0], ArtifactCall::Init);
    assert_eq!(
        dvc_calls.last(),
        Some(&ArtifactCall::Push {
            remote: "data-remote".to_string()
        })
    );
    let added: Vec<_> = dvc_calls
        .iter()
        .filter_map(|c| match c {
            ArtifactCall::Add { path } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        added,
        vec![
            PathBuf::from("train.csv"),
            PathBuf::from("val.csv"),
            PathBuf::from("test.csv")
        ]
    );

    assert_eq!(outcome.release.plan.tag_name, "data-v1.0.0");
    assert_eq!(
        repo.remote_tag("data-latest").unwrap().commit,
        outcome.commit
    );
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_pointer_files_are_staged() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());

    let outcome = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap();

    assert!(fx.work.path().join("train.csv").is_file());
    assert_eq!(
        outcome.staged,
        vec![
            PathBuf::from("train.csv.dvc"),
            PathBuf::from(".gitignore"),
            PathBuf::from("val.csv.dvc"),
            PathBuf::from("test.csv.dvc"),
            PathBuf::from(".dvc/config"),
        ]
    );
}

#[test]
fn test_second_push_moves_aliases() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());

    let first = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap();
    let second = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap();

    assert_eq!(second.release.plan.tag_name, "data-v1.1.0");
    assert_eq!(repo.remote_tag("data-previous").unwrap().commit, first.commit);
    assert_eq!(repo.remote_tag("data-latest").unwrap().commit, second.commit);
    assert_eq!(
        dvc.calls()
            .iter()
            .filter(|c| **c == ArtifactCall::Init)
            .count(),
        1
    );
}

#[test]
fn test_missing_secret_is_a_warning() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());

    let outcome = push_data(&repo, &dvc, &fx.config, &ArtifactCredentials::default()).unwrap();

    assert_eq!(
        outcome.warnings,
        vec![PipelineWarning::MissingArtifactCredentials {
            remote: "data-remote".to_string()
        }]
    );
    assert!(!dvc
        .calls()
        .iter()
        .any(|c| matches!(c, ArtifactCall::ModifyRemote { local: true, .. })));
}

#[test]
fn test_artifact_push_failure_aborts_before_commit() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());
    dvc.fail_push();

    let err = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap_err();

    assert_eq!(err.operation(), Some("dvc push"));
    assert!(!repo
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::Commit { .. })));
    assert!(repo.remote_tags().is_empty());
}

#[test]
fn test_branch_push_failure_creates_no_tags() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());
    repo.fail_on(MockOp::PushBranch);

    let err = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap_err();

    assert_eq!(err.operation(), Some("git push"));
    assert!(repo.local_tags().is_empty());
    assert!(repo.remote_tags().is_empty());
}

#[test]
fn test_fetch_failure_touches_nothing() {
    let fx = fixture();
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());
    repo.fail_on(MockOp::Fetch);

    let err = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap_err();

    assert!(matches!(err, DataVersionError::Step { operation: "git fetch", .. }));
    assert_eq!(repo.calls().len(), 1);
    assert!(dvc.calls().is_empty());
}

#[test]
fn test_missing_partition_fails_copy_step() {
    let mut fx = fixture();
    fx.config.data_split.val_data_save_path = fx.work.path().join("absent").join("val.csv");
    let repo = MockRepository::with_workdir(fx.work.path());
    let dvc = MockArtifactStore::with_workdir(fx.work.path());

    let err = push_data(&repo, &dvc, &fx.config, &full_credentials()).unwrap_err();

    assert_eq!(err.operation(), Some("copy artifacts"));
}
