use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{TagScheme, DEFAULT_TAG_PREFIX};
use crate::error::{DataVersionError, Result};
use crate::logging::LoggingConfig;

/// File name searched for in the working directory
pub const CONFIG_FILE_NAME: &str = "data-version.toml";

/// Represents the complete configuration for data-version.
///
/// Contains the dataset source, the cleanse/split settings, the artifact store
/// remote, the git working copy and logging options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// URL the raw dataset is downloaded from
    #[serde(default)]
    pub data_url: String,

    /// Commit message for the pointer-file commit; `{timestamp}` is replaced with the UTC time
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default)]
    pub data_split: DataSplitConfig,

    #[serde(default)]
    pub artifact_store: ArtifactStoreConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_commit_message() -> String {
    "Update dataset artifacts ({timestamp})".to_string()
}

/// Dataset paths and the cleanse/split parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DataSplitConfig {
    pub raw_data_save_path: PathBuf,
    pub cleansed_data_save_path: PathBuf,
    pub train_data_save_path: PathBuf,
    pub val_data_save_path: PathBuf,
    pub test_data_save_path: PathBuf,
    pub label_col: String,
    pub categorical_cols: Vec<String>,
    pub numeric_cols: Vec<String>,
    /// Fraction of all rows held out for test
    pub test_frac: f64,
    /// Fraction of the remaining rows held out for validation
    pub val_frac: f64,
    pub seed: u64,
}

impl Default for DataSplitConfig {
    fn default() -> Self {
        DataSplitConfig {
            raw_data_save_path: PathBuf::from("data/raw.csv"),
            cleansed_data_save_path: PathBuf::from("data/cleansed.csv"),
            train_data_save_path: PathBuf::from("data/train.csv"),
            val_data_save_path: PathBuf::from("data/val.csv"),
            test_data_save_path: PathBuf::from("data/test.csv"),
            label_col: "target".to_string(),
            categorical_cols: Vec::new(),
            numeric_cols: Vec::new(),
            test_frac: 0.2,
            val_frac: 0.25,
            seed: 42,
        }
    }
}

impl DataSplitConfig {
    /// Train, validation and test paths, in that order
    pub fn partition_paths(&self) -> [&Path; 3] {
        [
            self.train_data_save_path.as_path(),
            self.val_data_save_path.as_path(),
            self.test_data_save_path.as_path(),
        ]
    }
}

/// DVC remote the partitions are pushed to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArtifactStoreConfig {
    pub remote_name: String,
    /// Remote URL, e.g. `s3://bucket/path`
    pub url: String,
    pub endpoint_url: String,
    pub region: Option<String>,
    /// Executable used to drive the store
    pub dvc_command: String,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        ArtifactStoreConfig {
            remote_name: "data-remote".to_string(),
            url: String::new(),
            endpoint_url: String::new(),
            region: None,
            dvc_command: "dvc".to_string(),
        }
    }
}

/// Git repository the pointer files and tags are published to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    pub repo_url: String,
    pub branch: String,
    /// Local directory the working copy is cloned into
    pub save_dir: PathBuf,
    pub remote: String,
    pub tag_prefix: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            repo_url: String::new(),
            branch: "main".to_string(),
            save_dir: PathBuf::from("data-repo"),
            remote: "origin".to_string(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_url: String::new(),
            commit_message: default_commit_message(),
            data_split: DataSplitConfig::default(),
            artifact_store: ArtifactStoreConfig::default(),
            git: GitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup; empty values are ignored.
    ///
    /// Recognised keys: `DATA_URL`, `DVC_REMOTE_NAME`, `DVC_REMOTE`,
    /// `DVC_ENDPOINT_URL`, `AWS_DEFAULT_REGION`, `GIT_REPO_URL`, `GIT_BRANCH`,
    /// `LOG_LEVEL`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATA_URL") {
            self.data_url = v;
        }
        if let Some(v) = get("DVC_REMOTE_NAME") {
            self.artifact_store.remote_name = v;
        }
        if let Some(v) = get("DVC_REMOTE") {
            self.artifact_store.url = v;
        }
        if let Some(v) = get("DVC_ENDPOINT_URL") {
            self.artifact_store.endpoint_url = v;
        }
        if let Some(v) = get("AWS_DEFAULT_REGION") {
            self.artifact_store.region = Some(v);
        }
        if let Some(v) = get("GIT_REPO_URL") {
            self.git.repo_url = v;
        }
        if let Some(v) = get("GIT_BRANCH") {
            self.git.branch = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Check settings every stage relies on
    pub fn validate(&self) -> Result<()> {
        let split = &self.data_split;
        for (name, frac) in [("test_frac", split.test_frac), ("val_frac", split.val_frac)] {
            if !(frac > 0.0 && frac < 1.0) {
                return Err(DataVersionError::config(format!(
                    "{} must be between 0 and 1 (exclusive), got {}",
                    name, frac
                )));
            }
        }
        if split.label_col.trim().is_empty() {
            return Err(DataVersionError::config("label_col must not be empty"));
        }
        if self.git.tag_prefix.chars().any(char::is_whitespace) {
            return Err(DataVersionError::config("tag_prefix must not contain whitespace"));
        }
        Ok(())
    }

    /// Check settings the push stage needs
    pub fn validate_for_push(&self) -> Result<()> {
        self.validate()?;
        let required = [
            ("git.repo_url", &self.git.repo_url),
            ("git.branch", &self.git.branch),
            ("git.remote", &self.git.remote),
            ("artifact_store.remote_name", &self.artifact_store.remote_name),
            ("artifact_store.url", &self.artifact_store.url),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(DataVersionError::config(format!("{} must be set to push", key)));
            }
        }
        Ok(())
    }

    /// Tag naming for the configured prefix
    pub fn tag_scheme(&self) -> Result<TagScheme> {
        TagScheme::new(&self.git.tag_prefix)
    }

    /// Render the commit message template
    pub fn render_commit_message(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        self.commit_message
            .replace("{timestamp}", &now.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. Path in the `CONFIG_PATH` environment variable
/// 3. `data-version.toml` in current directory
/// 4. `~/.config/.data-version.toml` in user config directory
/// 5. Default configuration if no file found
///
/// Environment overrides are applied on top in every case.
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let env_path = std::env::var("CONFIG_PATH").ok().filter(|p| !p.is_empty());

    let path = if let Some(path) = config_path {
        Some(PathBuf::from(path))
    } else if let Some(path) = env_path {
        Some(PathBuf::from(path))
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        Some(PathBuf::from(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(format!(".{}", CONFIG_FILE_NAME)))
            .filter(|p| p.exists())
    };

    let mut config = match path {
        Some(path) => parse_config_file(&path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Read and parse one TOML configuration file without applying overrides
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        DataVersionError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    toml::from_str(&config_str)
        .map_err(|e| DataVersionError::config(format!("Cannot parse {}: {}", path.display(), e)))
}
