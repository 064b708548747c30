//! Replica Set Error Types
//!
//! Two layers:
//! - `AdminCommandError` is what the cluster admin client reports
//! - `ReplSetError` is what the orchestrator surfaces to callers
//!
//! Retry classification lives here so the backoff loop never inspects
//! error strings.

use thiserror::Error;

/// Errors reported by a `ClusterAdminClient`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminCommandError {
    /// Generic server-side execution failure.
    #[error("command failed{}: {message}", code_suffix(.code_name))]
    CommandFailed {
        code_name: Option<String>,
        message: String,
    },

    /// The server does not know the command.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The command is not part of the strict stable API.
    #[error("command rejected by strict API: {0}")]
    ApiStrict(String),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl AdminCommandError {
    /// Create a command failure without a server code name.
    pub fn command_failed(message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code_name: None,
            message: message.into(),
        }
    }

    /// Create a command failure carrying the server's code name.
    pub fn command_failed_with_code(code_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code_name: Some(code_name.into()),
            message: message.into(),
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Network(_))
    }

    /// Whether a config read should fall back to `local.system.replset`.
    pub fn signals_config_fallback(&self) -> bool {
        matches!(self, Self::CommandNotFound(_) | Self::ApiStrict(_))
    }

    /// Stable code name.
    pub fn code_name(&self) -> &str {
        match self {
            Self::CommandFailed { code_name: Some(code), .. } => code.as_str(),
            Self::CommandFailed { code_name: None, .. } => "CommandFailed",
            Self::CommandNotFound(_) => "CommandNotFound",
            Self::ApiStrict(_) => "APIStrictError",
            Self::Network(_) => "NetworkError",
        }
    }
}

fn code_suffix(code_name: &Option<String>) -> String {
    code_name
        .as_deref()
        .map(|code| format!(" ({})", code))
        .unwrap_or_default()
}

/// Errors surfaced by the replica set orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplSetError {
    /// Caller-supplied request violates a precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Neither `replSetGetConfig` nor the metadata read produced a config.
    #[error("replica set config unavailable: {0}")]
    ConfigUnavailable(String),

    /// A configuration document could not be decoded.
    #[error("invalid config document: {0}")]
    InvalidDocument(String),

    /// The admin client reported a failure.
    #[error(transparent)]
    Command(#[from] AdminCommandError),

    /// PSA phase 1 committed but phase 2 failed.
    ///
    /// The cluster is left in the phase-1 state; `attempted_command` is
    /// the reconfig the operator should issue by hand.
    #[error("second reconfig did not succeed ({source}); attempted command: {attempted_command}")]
    PartialTransition {
        attempted_command: String,
        source: Box<ReplSetError>,
    },

    /// The operation has been removed.
    #[error("{0}")]
    Deprecated(String),

    /// Orchestrator settings could not be loaded or are invalid.
    #[error("settings error: {0}")]
    Settings(String),
}

impl ReplSetError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a config unavailable error.
    pub fn config_unavailable(message: impl Into<String>) -> Self {
        Self::ConfigUnavailable(message.into())
    }

    /// Whether the backoff loop may absorb this error and try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Command(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Stable code name, used in logs and CLI output.
    pub fn code_name(&self) -> &str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::ConfigUnavailable(_) => "ConfigUnavailable",
            Self::InvalidDocument(_) => "InvalidDocument",
            Self::Command(err) => err.code_name(),
            Self::PartialTransition { .. } => "PartialTransition",
            Self::Deprecated(_) => "Deprecated",
            Self::Settings(_) => "SettingsError",
        }
    }
}

impl From<serde_json::Error> for ReplSetError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidDocument(e.to_string())
    }
}

/// Result type for replica set operations
pub type ReplSetResult<T> = Result<T, ReplSetError>;
