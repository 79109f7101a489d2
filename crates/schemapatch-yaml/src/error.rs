//! Error types for the document model

use thiserror::Error;

use crate::node::NodeKind;

/// Errors raised while parsing, editing or emitting a document
#[derive(Debug, Error, Clone, PartialEq)]
pub enum YamlError {
    /// The input is not a well-formed (or not a supported) YAML document
    #[error("malformed YAML at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    /// A path walked through a node that is not a mapping
    #[error("expected a mapping at '{path}', found {found}")]
    TypeMismatch { path: String, found: NodeKind },

    /// A path operator was called without any key
    #[error("a non-empty path is required")]
    EmptyPath,

    /// The tree violates a structural invariant (odd mapping, non-scalar key, ...)
    #[error("cannot emit document: {0}")]
    Emit(String),

    /// Conversion to a `serde_yaml::Value` failed
    #[error("cannot convert node to a value: {0}")]
    Conversion(String),
}

impl YamlError {
    pub(crate) fn type_mismatch(path: &[&str], found: NodeKind) -> Self {
        Self::TypeMismatch {
            path: if path.is_empty() {
                "<root>".to_string()
            } else {
                path.join(".")
            },
            found,
        }
    }
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, YamlError>;
