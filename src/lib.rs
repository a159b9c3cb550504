//! # Liveset Harness
//!
//! Metadata extraction for Ableton Live sets (`.als`) and project folders.
//!
//! A set is a gzip-compressed XML document. Loading one decodes the
//! container, builds a generic [`tree::DocumentTree`], and derives a
//! [`models::LiveSetInfo`] from it: version, tempo, tracks with their devices
//! and plugins, and the samples the set references with a classification of
//! where each one lives.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐
//! │ container │──▶│   xml    │──▶│   tree   │──▶│   query    │
//! │  (gzip)   │   │ (quick)  │   │          │   │  resolve   │
//! └───────────┘   └──────────┘   └──────────┘   │  classify  │
//!                                               └─────┬──────┘
//!                                                     ▼
//! ┌───────────┐   ┌──────────┐                 ┌────────────┐
//! │   scan    │──▶│ validate │──▶ project ────▶│  liveset   │
//! └───────────┘   └──────────┘                 └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lset info "Song Project/Song.als"     # summary of one set
//! lset scan ~/Music                     # every set under a folder
//! lset projects ~/Music --json          # project folders, valid and invalid
//! lset project "Song Project"           # load every set of a project
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tree`] | Generic document tree and path navigation |
//! | [`xml`] | XML to tree conversion |
//! | [`container`] | Gzip container decoding with progress |
//! | [`query`] | Key search over the tree |
//! | [`resolve`] | Attribute values, version, tempo |
//! | [`classify`] | Plugin and sample classification |
//! | [`liveset`] | Single-set load pipeline |
//! | [`project`] | Project folders and batch loading |
//! | [`validate`] | Project folder validation |
//! | [`scan`] | Recursive discovery of sets and projects |
//! | [`progress`] | Progress events and reporters |
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Extracted metadata types |

pub mod classify;
pub mod commands;
pub mod config;
pub mod container;
pub mod error;
pub mod fileinfo;
pub mod liveset;
pub mod models;
pub mod progress;
pub mod project;
pub mod query;
pub mod resolve;
pub mod scan;
pub mod tree;
pub mod validate;
pub mod xml;

use std::path::{Path, PathBuf};

use error::FatalFilesystemError;

pub use error::{LoadError, ProjectError};
pub use liveset::LiveSet;
pub use project::{BatchPolicy, LiveProject};
pub use tree::DocumentTree;

/// Extension of set documents.
pub const DOCUMENT_EXTENSION: &str = "als";

/// Suffix of a project folder's name.
pub const PROJECT_SUFFIX: &str = " Project";

/// Metadata folder every project folder holds.
pub const PROJECT_INFO_FOLDER: &str = "Ableton Project Info";

/// Folder Live writes set backups into.
pub const BACKUP_FOLDER: &str = "Backup";

/// Absolute form of `path`, without resolving symlinks or touching the filesystem.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, FatalFilesystemError> {
    std::path::absolute(path).map_err(|source| FatalFilesystemError {
        path: path.to_path_buf(),
        source,
    })
}
