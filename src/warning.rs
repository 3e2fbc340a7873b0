use std::fmt;

/// Non-fatal conditions met during a pipeline run.
/// These are logged and reported to the user but never abort the run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// The artifact store remote was configured without a secret access key
    MissingArtifactCredentials { remote: String },
    /// Deleting the local copy of an alias tag failed before it was recreated
    LocalTagDeleteFailed { tag: String, reason: String },
    /// The computed version tag already exists and was left untouched
    VersionTagExists { tag: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::MissingArtifactCredentials { remote } => write!(
                f,
                "Secret access key missing for artifact remote '{}'; pushing without credentials",
                remote
            ),
            PipelineWarning::LocalTagDeleteFailed { tag, reason } => {
                write!(f, "Could not delete local tag '{}': {}", tag, reason)
            }
            PipelineWarning::VersionTagExists { tag } => {
                write!(f, "Tag '{}' already exists, skipping creation", tag)
            }
        }
    }
}
