use thiserror::Error;

/// Unified error type for data-version operations
#[derive(Error, Debug)]
pub enum DataVersionError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Artifact store error: {0}")]
    Artifact(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} failed: {source}")]
    Step {
        operation: &'static str,
        #[source]
        source: Box<DataVersionError>,
    },
}

/// Convenience type alias for Results in data-version
pub type Result<T> = std::result::Result<T, DataVersionError>;

impl DataVersionError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        DataVersionError::Config(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        DataVersionError::Tag(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        DataVersionError::Remote(msg.into())
    }

    /// Create an artifact store error with context
    pub fn artifact(msg: impl Into<String>) -> Self {
        DataVersionError::Artifact(msg.into())
    }

    /// Create a credentials error with context
    pub fn credentials(msg: impl Into<String>) -> Self {
        DataVersionError::Credentials(msg.into())
    }

    /// Create a data error with context
    pub fn data(msg: impl Into<String>) -> Self {
        DataVersionError::Data(msg.into())
    }

    /// Name of the pipeline operation that failed, if this error came out of [`run_step`].
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            DataVersionError::Step { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

/// Runs one attempt-once pipeline operation.
///
/// On failure a structured error line carrying the operation name is logged and
/// the error is wrapped so callers can tell which step aborted the run.
pub fn run_step<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::debug!(operation, "starting");
    f().map_err(|e| {
        tracing::error!(operation, error = %e, "operation failed");
        DataVersionError::Step {
            operation,
            source: Box::new(e),
        }
    })
}
