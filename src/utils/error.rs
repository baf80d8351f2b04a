use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Container runtime unavailable: {message}")]
    RuntimeUnavailable { message: String },

    #[error("Container runtime error: {0}")]
    RuntimeError(#[from] bollard::errors::Error),

    #[error("Clone failed with exit code {exit_code}: {output}")]
    CloneFailed { exit_code: i64, output: String },

    #[error("Clone did not finish within {timeout:?}")]
    CloneTimeout { timeout: Duration },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Export task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Runtime,
    Clone,
    Archive,
    Request,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::RuntimeUnavailable { .. } | ExportError::RuntimeError(_) => {
                ErrorCategory::Runtime
            }
            ExportError::CloneFailed { .. } | ExportError::CloneTimeout { .. } => {
                ErrorCategory::Clone
            }
            ExportError::IoError(_) | ExportError::TaskError(_) => ErrorCategory::Archive,
            ExportError::InvalidRequest { .. } => ErrorCategory::Request,
            ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::InvalidRequest { .. } => ErrorSeverity::Low,
            ExportError::CloneFailed { .. } | ExportError::CloneTimeout { .. } => {
                ErrorSeverity::Medium
            }
            ExportError::RuntimeError(_)
            | ExportError::IoError(_)
            | ExportError::TaskError(_) => ErrorSeverity::High,
            ExportError::RuntimeUnavailable { .. }
            | ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    /// HTTP status the error is reported with when it escapes a request handler.
    pub fn status_code(&self) -> u16 {
        match self {
            ExportError::InvalidRequest { .. } => 400,
            ExportError::RuntimeUnavailable { .. } => 503,
            ExportError::RuntimeError(_) | ExportError::CloneFailed { .. } => 502,
            ExportError::CloneTimeout { .. } => 504,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Runtime => {
                "Check that the Docker daemon is running and DOCKER_HOST points at it"
            }
            ErrorCategory::Clone => {
                "Check the repository URL and that containers have outbound network access"
            }
            ErrorCategory::Archive => {
                "Check free disk space and permissions on the data directory"
            }
            ErrorCategory::Request => "Fix the request parameters and try again",
            ErrorCategory::Configuration => "Review the command line flags or the TOML config file",
        }
    }

    /// Short message safe to hand to an HTTP client; no paths or runtime internals.
    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::InvalidRequest { message } => format!("Invalid request: {}", message),
            ExportError::RuntimeUnavailable { .. } => "Container runtime unavailable".to_string(),
            ExportError::RuntimeError(_) => "Container runtime error".to_string(),
            ExportError::CloneFailed { .. } => "Repository clone failed".to_string(),
            ExportError::CloneTimeout { .. } => "Repository clone timed out".to_string(),
            ExportError::IoError(_) | ExportError::TaskError(_) => {
                "Archive export failed".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
