//! Artifact store abstraction
//!
//! Large data files are uploaded to a DVC remote and replaced in git by small
//! pointer files. [ArtifactStore] is the capability the push orchestrator
//! needs; [dvc::DvcCli] drives the real `dvc` executable and
//! [mock::MockArtifactStore] records calls for tests.

pub mod dvc;
pub mod mock;

pub use dvc::DvcCli;
pub use mock::{ArtifactCall, MockArtifactStore};

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ArtifactStoreConfig;
use crate::error::Result;
use crate::warning::PipelineWarning;

/// Operations on a DVC project inside a git working copy
///
/// Paths are relative to the working copy root.
pub trait ArtifactStore {
    /// Whether the project has already been initialised
    fn is_initialized(&self) -> bool;

    /// Initialise the project (`dvc init`)
    fn init(&self) -> Result<()>;

    /// Add or replace a named remote
    fn add_remote(&self, name: &str, url: &str) -> Result<()>;

    /// Set one remote option; `local` keeps the value out of the committed config
    fn modify_remote(&self, name: &str, key: &str, value: &str, local: bool) -> Result<()>;

    /// Track a file, writing its pointer file next to it
    fn add(&self, path: &Path) -> Result<()>;

    /// Upload tracked files to the named remote
    fn push(&self, remote: &str) -> Result<()>;
}

/// Where and how the remote is reached
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub name: String,
    pub url: String,
    pub endpoint_url: String,
    pub region: Option<String>,
}

impl From<&ArtifactStoreConfig> for RemoteSettings {
    fn from(config: &ArtifactStoreConfig) -> Self {
        RemoteSettings {
            name: config.remote_name.clone(),
            url: config.url.clone(),
            endpoint_url: config.endpoint_url.clone(),
            region: config.region.clone().filter(|r| !r.is_empty()),
        }
    }
}

/// Access keys for the remote, read from the environment
#[derive(Clone, Default, PartialEq)]
pub struct ArtifactCredentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl ArtifactCredentials {
    /// Read `DVC_ACCESS_KEY_ID` and `DVC_SECRET_ACCESS_KEY`; empty values count as absent
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        ArtifactCredentials {
            access_key_id: var("DVC_ACCESS_KEY_ID"),
            secret_access_key: var("DVC_SECRET_ACCESS_KEY"),
        }
    }
}

impl std::fmt::Debug for ArtifactCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCredentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Register the remote and its options.
///
/// Credentials are only written when the secret key is present, and always
/// with `--local`. A missing secret is reported as a warning.
pub fn configure_remote<A: ArtifactStore + ?Sized>(
    store: &A,
    settings: &RemoteSettings,
    credentials: &ArtifactCredentials,
) -> Result<Vec<PipelineWarning>> {
    let mut warnings = Vec::new();

    store.add_remote(&settings.name, &settings.url)?;
    if !settings.endpoint_url.is_empty() {
        store.modify_remote(&settings.name, "endpointurl", &settings.endpoint_url, false)?;
    }

    match &credentials.secret_access_key {
        Some(secret) => {
            if let Some(key_id) = &credentials.access_key_id {
                store.modify_remote(&settings.name, "access_key_id", key_id, true)?;
            }
            store.modify_remote(&settings.name, "secret_access_key", secret, true)?;
        }
        None => {
            warn!(remote = %settings.name, "secret access key not set for artifact remote");
            warnings.push(PipelineWarning::MissingArtifactCredentials {
                remote: settings.name.clone(),
            });
        }
    }

    if let Some(region) = &settings.region {
        store.modify_remote(&settings.name, "region", region, false)?;
    }

    info!(remote = %settings.name, url = %settings.url, "configured artifact remote");
    Ok(warnings)
}

/// Pointer file DVC writes for a tracked path
pub fn pointer_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".dvc");
    PathBuf::from(name)
}

/// Ignore file DVC maintains in the directory of a tracked path
pub fn gitignore_path(path: &Path) -> PathBuf {
    path.parent()
        .map(|dir| dir.join(".gitignore"))
        .unwrap_or_else(|| PathBuf::from(".gitignore"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RemoteSettings {
        RemoteSettings {
            name: "storage".to_string(),
            url: "s3://bucket/data".to_string(),
            endpoint_url: "http://minio:9000".to_string(),
            region: None,
        }
    }

    #[test]
    fn test_credentials_written_locally() {
        let store = MockArtifactStore::new();
        let creds = ArtifactCredentials {
            access_key_id: Some("id".to_string()),
            secret_access_key: Some("secret".to_string()),
        };

        let warnings = configure_remote(&store, &settings(), &creds).unwrap();

        assert!(warnings.is_empty());
        let calls = store.calls();
        assert!(calls.contains(&ArtifactCall::ModifyRemote {
            name: "storage".to_string(),
            key: "secret_access_key".to_string(),
            value: "secret".to_string(),
            local: true,
        }));
        assert!(calls.contains(&ArtifactCall::ModifyRemote {
            name: "storage".to_string(),
            key: "endpointurl".to_string(),
            value: "http://minio:9000".to_string(),
            local: false,
        }));
    }

    #[test]
    fn test_missing_secret_warns_without_credential_calls() {
        let store = MockArtifactStore::new();
        let creds = ArtifactCredentials {
            access_key_id: Some("id".to_string()),
            secret_access_key: None,
        };

        let warnings = configure_remote(&store, &settings(), &creds).unwrap();

        assert_eq!(
            warnings,
            vec![PipelineWarning::MissingArtifactCredentials {
                remote: "storage".to_string()
            }]
        );
        assert!(!store.calls().iter().any(|c| matches!(
            c,
            ArtifactCall::ModifyRemote { local: true, .. }
        )));
    }

    #[test]
    fn test_region_only_when_configured() {
        let store = MockArtifactStore::new();
        let mut with_region = settings();
        with_region.region = Some("us-east-1".to_string());

        configure_remote(&store, &with_region, &ArtifactCredentials::default()).unwrap();

        assert!(store.calls().iter().any(|c| matches!(
            c,
            ArtifactCall::ModifyRemote { key, .. } if key == "region"
        )));
    }

    #[test]
    fn test_pointer_and_gitignore_paths() {
        let path = Path::new("data/train.csv");
        assert_eq!(pointer_path(path), PathBuf::from("data/train.csv.dvc"));
        assert_eq!(gitignore_path(path), PathBuf::from("data/.gitignore"));
        assert_eq!(gitignore_path(Path::new("test.csv")), PathBuf::from(".gitignore"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ArtifactCredentials {
            access_key_id: Some("id".to_string()),
            secret_access_key: Some("hunter2".to_string()),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
