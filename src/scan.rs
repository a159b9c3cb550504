//! Recursive discovery of sets and project folders.
//!
//! Both traversals are depth-first and visit directory entries in the order
//! the filesystem returns them, so callers must not assume sorted output.
//! Each is available as a lazy [`Iterator`] of [`ScanEvent`]s
//! ([`scan_documents`], [`scan_projects`]) and as an eager collector built on
//! top of it ([`find_documents`], [`find_projects`]).
//!
//! An unreadable directory produces an [`ScanEvent::Error`] and the walk moves
//! on to its siblings. Only a root that cannot be inspected at all (for a
//! reason other than not existing) fails the whole operation.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::FatalFilesystemError;
use crate::validate::{validate, ProjectValidationResult};
use crate::{BACKUP_FOLDER, DOCUMENT_EXTENSION, PROJECT_SUFFIX};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Include documents whose parent folder is `Backup`.
    pub include_backups: bool,
    pub follow_symlinks: bool,
    /// Directories whose root-relative path matches are not descended into.
    pub exclude: Option<GlobSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScanEvent {
    Scanning {
        path: PathBuf,
        depth: usize,
    },
    Found {
        file: PathBuf,
        depth: usize,
    },
    Validating {
        path: PathBuf,
    },
    ProjectFound {
        project: ProjectValidationResult,
        is_valid: bool,
    },
    Error {
        path: PathBuf,
        error: String,
    },
    Complete,
}

/// Project folders found under a root, split by validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectPartition {
    pub valid: Vec<ProjectValidationResult>,
    pub invalid: Vec<ProjectValidationResult>,
}

/// Whether a path names a set document.
pub fn is_document(path: &Path) -> bool {
    path.extension().map(|e| e == DOCUMENT_EXTENSION).unwrap_or(false)
}

/// A document is a backup when its immediate parent folder is `Backup`.
pub fn is_backup(path: &Path) -> bool {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n == BACKUP_FOLDER)
        .unwrap_or(false)
}

fn is_project_folder(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().ends_with(PROJECT_SUFFIX)
}

fn is_excluded(exclude: Option<&GlobSet>, root: &Path, entry: &DirEntry) -> bool {
    let Some(exclude) = exclude else {
        return false;
    };
    if entry.depth() == 0 {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    exclude.is_match(relative)
}

/// Shared walk state: the walkdir iterator plus the root checks done up front.
struct Walk {
    root: PathBuf,
    walker: Option<walkdir::IntoIter>,
    /// Emitted before anything else when the root is unusable.
    root_events: VecDeque<ScanEvent>,
    exclude: Option<GlobSet>,
    done: bool,
}

impl Walk {
    fn new(root: &Path, options: &ScanOptions) -> Result<Self, FatalFilesystemError> {
        let root = crate::absolute(root)?;
        let mut walk = Self {
            root: root.clone(),
            walker: None,
            root_events: VecDeque::new(),
            exclude: options.exclude.clone(),
            done: false,
        };

        match std::fs::metadata(&root) {
            Ok(m) if m.is_dir() => {
                walk.walker = Some(
                    WalkDir::new(&root)
                        .follow_links(options.follow_symlinks)
                        .into_iter(),
                );
            }
            Ok(_) => walk.reject_root("Not a directory".to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => walk.reject_root(e.to_string()),
            Err(source) => return Err(FatalFilesystemError { path: root, source }),
        }
        Ok(walk)
    }

    /// Queues `Scanning` then `Error` for a root that cannot be walked.
    fn reject_root(&mut self, error: String) {
        self.root_events.push_back(ScanEvent::Scanning {
            path: self.root.clone(),
            depth: 0,
        });
        self.root_events.push_back(ScanEvent::Error {
            path: self.root.clone(),
            error,
        });
    }

    /// Next walkdir entry, or a ready-made event (root rejection, unreadable
    /// entry). `None` once the walk is exhausted.
    fn next_entry(&mut self) -> Option<Result<DirEntry, ScanEvent>> {
        if let Some(event) = self.root_events.pop_front() {
            return Some(Err(event));
        }
        let walker = self.walker.as_mut()?;
        loop {
            match walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir()
                        && is_excluded(self.exclude.as_ref(), &self.root, &entry)
                    {
                        debug!(path = %entry.path().display(), "excluded from scan");
                        walker.skip_current_dir();
                        continue;
                    }
                    return Some(Ok(entry));
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    let error = err
                        .io_error()
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| err.to_string());
                    return Some(Err(ScanEvent::Error { path, error }));
                }
            }
        }
    }

    fn skip_current_dir(&mut self) {
        if let Some(walker) = self.walker.as_mut() {
            walker.skip_current_dir();
        }
    }

    /// Marks the walk finished; returns `Complete` exactly once.
    fn finish(&mut self) -> Option<ScanEvent> {
        if self.done {
            None
        } else {
            self.done = true;
            Some(ScanEvent::Complete)
        }
    }
}

/// Streaming document discovery. See [`scan_documents`].
pub struct DocumentScan {
    walk: Walk,
    include_backups: bool,
}

impl Iterator for DocumentScan {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<ScanEvent> {
        if self.walk.done {
            return None;
        }
        loop {
            let entry = match self.walk.next_entry() {
                None => return self.walk.finish(),
                Some(Err(event)) => return Some(event),
                Some(Ok(entry)) => entry,
            };

            if entry.file_type().is_dir() {
                return Some(ScanEvent::Scanning {
                    path: entry.path().to_path_buf(),
                    depth: entry.depth(),
                });
            }
            if entry.file_type().is_file() && is_document(entry.path()) {
                if !self.include_backups && is_backup(entry.path()) {
                    continue;
                }
                return Some(ScanEvent::Found {
                    file: entry.path().to_path_buf(),
                    depth: entry.depth().saturating_sub(1),
                });
            }
        }
    }
}

/// Streaming project discovery. See [`scan_projects`].
pub struct ProjectScan {
    walk: Walk,
    /// Project folder announced with `Validating`, checked on the next call.
    pending: Option<PathBuf>,
}

impl Iterator for ProjectScan {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<ScanEvent> {
        if let Some(path) = self.pending.take() {
            return Some(match validate(&path) {
                Ok(project) => ScanEvent::ProjectFound {
                    is_valid: project.is_valid,
                    project,
                },
                Err(e) => ScanEvent::Error {
                    path,
                    error: e.source.to_string(),
                },
            });
        }
        if self.walk.done {
            return None;
        }
        loop {
            let entry = match self.walk.next_entry() {
                None => return self.walk.finish(),
                Some(Err(event)) => return Some(event),
                Some(Ok(entry)) => entry,
            };

            if !entry.file_type().is_dir() {
                continue;
            }
            if is_project_folder(&entry) {
                // Projects are leaves: nothing inside one is searched.
                self.walk.skip_current_dir();
                let path = entry.path().to_path_buf();
                self.pending = Some(path.clone());
                return Some(ScanEvent::Validating { path });
            }
            return Some(ScanEvent::Scanning {
                path: entry.path().to_path_buf(),
                depth: entry.depth(),
            });
        }
    }
}

/// Lazily walks `root` for `.als` documents.
///
/// Yields `Scanning` for each directory entered, `Found` for each document,
/// `Error` for unreadable directories, and finally `Complete`.
pub fn scan_documents(root: &Path, options: &ScanOptions) -> Result<DocumentScan, FatalFilesystemError> {
    Ok(DocumentScan {
        walk: Walk::new(root, options)?,
        include_backups: options.include_backups,
    })
}

/// Lazily walks `root` for project folders.
///
/// Each directory whose name ends in ` Project` yields `Validating` then
/// `ProjectFound` and is not descended into.
pub fn scan_projects(root: &Path, options: &ScanOptions) -> Result<ProjectScan, FatalFilesystemError> {
    Ok(ProjectScan {
        walk: Walk::new(root, options)?,
        pending: None,
    })
}

/// Absolute paths of every document under `root`, in discovery order.
pub fn find_documents(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, FatalFilesystemError> {
    let mut documents = Vec::new();
    for event in scan_documents(root, options)? {
        match event {
            ScanEvent::Found { file, .. } => documents.push(file),
            ScanEvent::Error { path, error } => {
                warn!("Error accessing {}: {}", path.display(), error);
            }
            _ => {}
        }
    }
    debug!(root = %root.display(), count = documents.len(), "document scan complete");
    Ok(documents)
}

/// Every project folder under `root`, validated and partitioned.
pub fn find_projects(root: &Path, options: &ScanOptions) -> Result<ProjectPartition, FatalFilesystemError> {
    let mut projects = ProjectPartition::default();
    for event in scan_projects(root, options)? {
        match event {
            ScanEvent::ProjectFound { project, is_valid } => {
                if is_valid {
                    projects.valid.push(project);
                } else {
                    projects.invalid.push(project);
                }
            }
            ScanEvent::Error { path, error } => {
                warn!("Error accessing {}: {}", path.display(), error);
            }
            _ => {}
        }
    }
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn project(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(format!("{} Project", name));
        fs::create_dir_all(dir.join("Ableton Project Info")).unwrap();
        touch(&dir.join(format!("{}.als", name)));
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn backups_are_excluded_by_default() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = project(tmp.path(), "Foo");
        touch(&dir.join("Backup").join("Foo [2024-01-01 101010].als"));
        touch(&dir.join("notes.txt"));

        let without = find_documents(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(names(&without), vec!["Foo.als"]);

        let options = ScanOptions {
            include_backups: true,
            ..Default::default()
        };
        let with = find_documents(tmp.path(), &options).unwrap();
        assert_eq!(names(&with), vec!["Foo [2024-01-01 101010].als", "Foo.als"]);
        assert!(with.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn stream_starts_at_root_and_ends_with_complete() {
        let tmp = tempfile::TempDir::new().unwrap();
        project(tmp.path(), "Foo");

        let events: Vec<ScanEvent> = scan_documents(tmp.path(), &ScanOptions::default())
            .unwrap()
            .collect();
        assert_eq!(
            events.first(),
            Some(&ScanEvent::Scanning {
                path: tmp.path().to_path_buf(),
                depth: 0
            })
        );
        assert_eq!(events.last(), Some(&ScanEvent::Complete));
        assert!(events.contains(&ScanEvent::Found {
            file: tmp.path().join("Foo Project").join("Foo.als"),
            depth: 1
        }));
    }

    #[test]
    fn excluded_directories_are_pruned() {
        let tmp = tempfile::TempDir::new().unwrap();
        project(tmp.path(), "Keep");
        project(&tmp.path().join("Archive"), "Old");

        let mut builder = globset::GlobSetBuilder::new();
        builder.add(globset::Glob::new("Archive").unwrap());
        let options = ScanOptions {
            exclude: Some(builder.build().unwrap()),
            ..Default::default()
        };
        let found = find_documents(tmp.path(), &options).unwrap();
        assert_eq!(names(&found), vec!["Keep.als"]);
    }

    #[test]
    fn projects_are_partitioned() {
        let tmp = tempfile::TempDir::new().unwrap();
        project(tmp.path(), "Foo");
        project(&tmp.path().join("Album"), "Bar");
        project(&tmp.path().join("Album").join("Live"), "Baz");
        fs::create_dir_all(tmp.path().join("Broken Project")).unwrap();

        let projects = find_projects(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(projects.valid.len(), 3);
        assert_eq!(projects.invalid.len(), 1);
        let broken = &projects.invalid[0];
        assert!(!broken.is_valid);
        assert_eq!(broken.errors.len(), 2);
        assert_eq!(broken.name.as_deref(), Some("Broken"));
    }

    #[test]
    fn projects_are_not_descended_into() {
        let tmp = tempfile::TempDir::new().unwrap();
        let outer = project(tmp.path(), "Outer");
        project(&outer, "Nested");

        let events: Vec<ScanEvent> = scan_projects(tmp.path(), &ScanOptions::default())
            .unwrap()
            .collect();
        let found: Vec<&ProjectValidationResult> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::ProjectFound { project, .. } => Some(project),
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("Outer"));

        let validating = events
            .iter()
            .position(|e| matches!(e, ScanEvent::Validating { .. }))
            .unwrap();
        assert!(matches!(events[validating + 1], ScanEvent::ProjectFound { is_valid: true, .. }));
    }

    #[test]
    fn missing_root_reports_an_error_and_completes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let events: Vec<ScanEvent> = scan_documents(&tmp.path().join("gone"), &ScanOptions::default())
            .unwrap()
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ScanEvent::Scanning {
                path: tmp.path().join("gone"),
                depth: 0
            }
        );
        assert!(matches!(events[1], ScanEvent::Error { .. }));
        assert_eq!(events[2], ScanEvent::Complete);

        let events: Vec<ScanEvent> = scan_projects(&tmp.path().join("gone"), &ScanOptions::default())
            .unwrap()
            .collect();
        assert!(matches!(events[0], ScanEvent::Scanning { depth: 0, .. }));
        assert!(matches!(events[1], ScanEvent::Error { .. }));
        assert!(find_documents(&tmp.path().join("gone"), &ScanOptions::default())
            .unwrap()
            .is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_are_reported_and_the_walk_continues() {
        let tmp = tempfile::TempDir::new().unwrap();
        project(tmp.path(), "Keep");
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("Dangling")).unwrap();
        let options = ScanOptions {
            follow_symlinks: true,
            ..Default::default()
        };
        let is_dangling_error =
            |e: &ScanEvent| matches!(e, ScanEvent::Error { path, .. } if path.ends_with("Dangling"));

        let events: Vec<ScanEvent> = scan_documents(tmp.path(), &options).unwrap().collect();
        assert!(events.iter().any(is_dangling_error), "{:?}", events);
        assert!(events.contains(&ScanEvent::Found {
            file: tmp.path().join("Keep Project").join("Keep.als"),
            depth: 1
        }));
        assert_eq!(events.last(), Some(&ScanEvent::Complete));

        let events: Vec<ScanEvent> = scan_projects(tmp.path(), &options).unwrap().collect();
        assert!(events.iter().any(is_dangling_error), "{:?}", events);
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::ProjectFound { is_valid: true, project } if project.name.as_deref() == Some("Keep")
        )));
        assert_eq!(events.last(), Some(&ScanEvent::Complete));

        let found = find_documents(tmp.path(), &options).unwrap();
        assert_eq!(names(&found), vec!["Keep.als"]);
    }

    #[test]
    fn streams_are_restartable_per_call() {
        let tmp = tempfile::TempDir::new().unwrap();
        project(tmp.path(), "Foo");
        let first: Vec<ScanEvent> = scan_documents(tmp.path(), &ScanOptions::default())
            .unwrap()
            .collect();
        let second: Vec<ScanEvent> = scan_documents(tmp.path(), &ScanOptions::default())
            .unwrap()
            .collect();
        assert_eq!(first, second);
    }
}
