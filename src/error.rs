//! Error types for loading, scanning, and project handling.
//!
//! Directory convention violations are not errors: they are accumulated as
//! data in [`crate::validate::ProjectValidationResult`]. Unreadable directories
//! met during a scan are reported as events and never surface here.

use std::path::PathBuf;

use thiserror::Error;

/// An expected attribute-value wrapper is missing from a node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unexpected node structure: {node}")]
pub struct MalformedNodeError {
    /// Serialized form of the offending node.
    pub node: String,
}

/// The document's `Creator` string does not look like `<app> <major>.<minor>[.<patch>]`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognised creator string: {creator:?}")]
pub struct VersionParseError {
    pub creator: String,
}

/// The root of an operation is inaccessible for a reason other than not existing.
#[derive(Debug, Error)]
#[error("cannot access {}: {source}", path.display())]
pub struct FatalFilesystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure loading a single document. Every variant aborts that load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error reading file info for {}: {source}", path.display())]
    FileInfo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading project file {}: {message}", path.display())]
    ContainerDecode { path: PathBuf, message: String },

    #[error("error parsing xml: {0}")]
    TreeParse(String),

    #[error(transparent)]
    MalformedNode(#[from] MalformedNodeError),

    #[error(transparent)]
    VersionParse(#[from] VersionParseError),
}

/// Failure opening or loading a project folder.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("directory {} isn't a Live project:\n {}", path.display(), errors.join("\n "))]
    Invalid { path: PathBuf, errors: Vec<String> },

    #[error(transparent)]
    Filesystem(#[from] FatalFilesystemError),

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
}
