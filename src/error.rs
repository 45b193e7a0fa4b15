/// Centralized error types for repo-sync using thiserror
///
/// Provides domain-specific error types for better error handling and user-facing messages.
use thiserror::Error;

/// Main error type for the sync core
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Summarization error: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while resolving a remote repository address
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Remote address is not a well-formed URL: {0}")]
    Unparsable(String),

    #[error("Remote address '{0}' must contain organization and repository path segments")]
    MissingSegments(String),
}

/// Errors raised by clone/pull operations against the remote
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to clone '{remote}' after {attempts} attempts: {reason}")]
    CloneFailed {
        remote: String,
        attempts: u32,
        reason: String,
    },

    #[error("Failed to pull '{path}': {reason}")]
    PullFailed { path: String, reason: String },

    #[error("Transient transport failure: {0}")]
    Transient(String),

    #[error("Working tree has no readable HEAD: {0}")]
    HeadUnreadable(String),
}

/// Errors raised while reading commit history from a local working tree
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Cannot open repository at '{path}': {reason}")]
    RepositoryUnreadable { path: String, reason: String },

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Failed to parse commit: {0}")]
    ParseFailed(String),
}

/// Errors raised while generating or parsing a changelog
///
/// These never escape the summarizer: callers always receive an empty
/// changelog instead. The variants exist so the failure can be classified in
/// logs before being absorbed.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Text generation failed: {0}")]
    GenerationFailed(String),

    #[error("Text generation stream was cancelled")]
    Cancelled,

    #[error("Failed to parse changelog from response: {0}")]
    ParseFailed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

// Conversion from anyhow::Error to SyncError
impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Other(format!("{:#}", err))
    }
}

// Helper methods for SyncError
impl SyncError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        SyncError::Other(msg.into())
    }

    /// Check if this error is retryable (transient transport/IO failures)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(TransportError::Transient(_)) | SyncError::Io(_)
        )
    }

    /// Check if this error is fatal to the sync job (as opposed to one that
    /// is absorbed locally as an empty result)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Address(_)
                | SyncError::Transport(
                    TransportError::CloneFailed { .. } | TransportError::PullFailed { .. }
                )
        )
    }
}
