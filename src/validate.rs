//! Project folder validation.
//!
//! A Live project folder is named `<Name> Project`, directly holds at least
//! one `.als` document, and holds an `Ableton Project Info` folder. All
//! checks run so every violation is reported together.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::FatalFilesystemError;
use crate::{DOCUMENT_EXTENSION, PROJECT_INFO_FOLDER, PROJECT_SUFFIX};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectValidationResult {
    pub is_valid: bool,
    pub path: PathBuf,
    /// Folder name without the ` Project` suffix; absent when the path does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub errors: Vec<String>,
}

impl ProjectValidationResult {
    fn rejected(path: PathBuf, error: &str) -> Self {
        Self {
            is_valid: false,
            path,
            name: None,
            errors: vec![error.to_string()],
        }
    }
}

/// Validates `path` against the project folder conventions.
///
/// Only failures to read the folder for a reason other than it not existing
/// are errors; convention violations are returned as data.
pub fn validate(path: &Path) -> Result<ProjectValidationResult, FatalFilesystemError> {
    let path = crate::absolute(path)?;
    let fatal = |source: std::io::Error| FatalFilesystemError {
        path: path.clone(),
        source,
    };

    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(ProjectValidationResult::rejected(path, "Path does not exist"))
        }
        Err(e) => return Err(fatal(e)),
    };
    if !metadata.is_dir() {
        return Ok(ProjectValidationResult::rejected(
            path,
            "Path is not a directory",
        ));
    }

    let mut errors = Vec::new();

    let folder_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !folder_name.ends_with(PROJECT_SUFFIX) {
        errors.push(format!("Folder name does not end with '{}'", PROJECT_SUFFIX));
    }

    let mut has_documents = false;
    let mut has_info_folder = false;
    for entry in std::fs::read_dir(&path).map_err(fatal)? {
        let entry = entry.map_err(fatal)?;
        let file_type = entry.file_type().map_err(fatal)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if file_type.is_file() && name.ends_with(&format!(".{}", DOCUMENT_EXTENSION)) {
            has_documents = true;
        }
        if file_type.is_dir() && name == PROJECT_INFO_FOLDER {
            has_info_folder = true;
        }
    }

    if !has_documents {
        errors.push(format!("No .{} files found in directory", DOCUMENT_EXTENSION));
    }
    if !has_info_folder {
        errors.push(format!("'{}' folder not found", PROJECT_INFO_FOLDER));
    }

    let name = folder_name
        .strip_suffix(PROJECT_SUFFIX)
        .unwrap_or(&folder_name)
        .to_string();

    Ok(ProjectValidationResult {
        is_valid: errors.is_empty(),
        path,
        name: Some(name),
        errors,
    })
}
