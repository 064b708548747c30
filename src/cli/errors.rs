//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit.

use std::fmt;
use std::io;

use crate::replset::ReplSetError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Input file unreadable or not a replica set config
    InputError,
    /// Settings file rejected
    SettingsError,
    /// The requested change is not allowed
    PlanRejected,
    /// stdout failure
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputError => "REPLSET_CLI_INPUT_ERROR",
            Self::SettingsError => "REPLSET_CLI_SETTINGS_ERROR",
            Self::PlanRejected => "REPLSET_CLI_PLAN_REJECTED",
            Self::IoError => "REPLSET_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ReplSetError> for CliError {
    fn from(e: ReplSetError) -> Self {
        let code = match &e {
            ReplSetError::Settings(_) => CliErrorCode::SettingsError,
            ReplSetError::InvalidDocument(_) => CliErrorCode::InputError,
            _ => CliErrorCode::PlanRejected,
        };
        Self::new(code, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
