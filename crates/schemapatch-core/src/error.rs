//! Patcher error types

use std::path::PathBuf;

use schemapatch_yaml::YamlError;
use thiserror::Error;

use crate::gvk::GroupKind;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file identified as a CRD could not be parsed losslessly
    #[error("Malformed YAML in {file}: {source}")]
    MalformedDocument {
        file: String,
        #[source]
        source: YamlError,
    },

    /// The CRD does not have the shape the patcher needs
    #[error("Malformed CRD {file} at {path}: {message}")]
    MalformedCrd {
        file: String,
        path: String,
        message: String,
    },

    #[error("CRD {group_kind} is defined by both {first} and {second}")]
    DuplicateCrd {
        group_kind: GroupKind,
        first: String,
        second: String,
    },

    #[error("Failed to render schema for {group_kind} {version}: {message}")]
    SchemaRender {
        group_kind: GroupKind,
        version: String,
        message: String,
    },

    #[error("Failed to write {file}: {source}")]
    Output {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed_crd(
        file: &str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedCrd {
            file: file.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
