//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`], which carries a diagnostic
//! code, optional help, and the exit code the process ends with.

use miette::Diagnostic;
use schemapatch_core::PatchError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Missing or contradicting settings
    #[error("Usage error: {message}")]
    #[diagnostic(code(schemapatch::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration or schema bundle could not be read
    #[error("Configuration error: {message}")]
    #[diagnostic(code(schemapatch::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A manifest could not be parsed or patched
    #[error("{message}")]
    #[diagnostic(code(schemapatch::cli::malformed))]
    Malformed {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(schemapatch::cli::io))]
    Io { message: String },

    /// The run was interrupted
    #[error("{message}")]
    #[diagnostic(code(schemapatch::cli::interrupted))]
    Interrupted { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Config { .. } => exit_codes::ERROR,
            CliError::Malformed { .. } => exit_codes::MALFORMED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Interrupted { .. } => exit_codes::INTERRUPTED,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<PatchError> for CliError {
    fn from(err: PatchError) -> Self {
        let message = err.to_string();
        match err {
            PatchError::Io { .. } | PatchError::Output { .. } => CliError::Io { message },
            PatchError::Config { .. } => CliError::Config {
                message,
                help: Some(
                    "Schema bundles and schemapatch.yaml are YAML or JSON files".to_string(),
                ),
            },
            PatchError::DuplicateCrd { .. } => CliError::Malformed {
                message,
                help: Some(
                    "Each group and kind must be defined by exactly one manifest".to_string(),
                ),
            },
            PatchError::MalformedDocument { .. } | PatchError::MalformedCrd { .. } => {
                CliError::Malformed {
                    message,
                    help: None,
                }
            }
            PatchError::SchemaRender { .. } => CliError::Malformed {
                message,
                help: Some("The supplied schema could not be serialized to YAML".to_string()),
            },
            PatchError::Cancelled => CliError::Interrupted { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
