//! Project folders: validation plus sequential loading of every set inside.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProjectError;
use crate::liveset::LiveSet;
use crate::progress::{LoadProgress, ProgressEvent, ProgressSink, ProjectProgress};
use crate::scan::{find_documents, ScanOptions};
use crate::validate::validate;

/// What a project load does when one of its sets fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Record the failure and continue with the next set.
    #[default]
    Skip,
    /// Stop and return the error.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug)]
pub struct LiveProject {
    path: PathBuf,
    name: String,
    set_paths: Vec<PathBuf>,
    sets: Vec<LiveSet>,
    failures: Vec<SetFailure>,
}

/// Re-attributes a set's load events to the project.
struct SetSink<'a> {
    outer: &'a dyn ProgressSink,
    path: &'a Path,
    set_index: usize,
}

impl ProgressSink for SetSink<'_> {
    fn report(&self, event: ProgressEvent) {
        let progress: LoadProgress = match event {
            ProgressEvent::Load(p) => p,
            other => return self.outer.report(other),
        };
        self.outer
            .report(ProgressEvent::Project(ProjectProgress::SetProgress {
                path: self.path.to_path_buf(),
                set_index: self.set_index,
                progress,
            }));
    }
}

impl LiveProject {
    /// Validates `dir` and lists its sets, backups excluded.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ProjectError> {
        Self::open_with(dir, &ScanOptions::default())
    }

    /// Like [`open`](Self::open), discovering sets with `options`
    /// (symlinks, excluded folders). Backups are always left out.
    pub fn open_with(dir: impl AsRef<Path>, options: &ScanOptions) -> Result<Self, ProjectError> {
        let result = validate(dir.as_ref())?;
        if !result.is_valid {
            return Err(ProjectError::Invalid {
                path: result.path,
                errors: result.errors,
            });
        }
        let options = ScanOptions {
            include_backups: false,
            ..options.clone()
        };
        let set_paths = find_documents(&result.path, &options)?;
        Ok(Self {
            name: result.name.unwrap_or_default(),
            path: result.path,
            set_paths,
            sets: Vec::new(),
            failures: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_paths(&self) -> &[PathBuf] {
        &self.set_paths
    }

    /// Sets loaded by the last [`load_sets`](Self::load_sets), in discovery order.
    pub fn sets(&self) -> &[LiveSet] {
        &self.sets
    }

    pub fn failures(&self) -> &[SetFailure] {
        &self.failures
    }

    /// Loads every set, one at a time, in discovery order.
    ///
    /// Calling again reloads from scratch.
    pub fn load_sets(&mut self, sink: &dyn ProgressSink, policy: BatchPolicy) -> Result<(), ProjectError> {
        self.sets.clear();
        self.failures.clear();

        let total = self.set_paths.len();
        if total > 0 {
            sink.report(ProgressEvent::Project(ProjectProgress::loading(0, total)));
        }

        for (index, path) in self.set_paths.iter().enumerate() {
            let set_sink = SetSink {
                outer: sink,
                path,
                set_index: index,
            };
            match LiveSet::load(path, &set_sink) {
                Ok(set) => self.sets.push(set),
                Err(source) => match policy {
                    BatchPolicy::Abort => {
                        return Err(ProjectError::Load {
                            path: path.clone(),
                            source,
                        })
                    }
                    BatchPolicy::Skip => {
                        warn!(path = %path.display(), "skipping set: {}", source);
                        sink.report(ProgressEvent::Project(ProjectProgress::SetFailed {
                            path: path.clone(),
                            set_index: index,
                            error: source.to_string(),
                        }));
                        self.failures.push(SetFailure {
                            path: path.clone(),
                            error: source.to_string(),
                        });
                    }
                },
            }
            sink.report(ProgressEvent::Project(ProjectProgress::loading(index + 1, total)));
        }

        sink.report(ProgressEvent::Project(ProjectProgress::Complete {
            completed: total,
            total,
            percent: 100.0,
        }));
        info!(
            project = %self.name,
            loaded = self.sets.len(),
            failed = self.failures.len(),
            "project loaded"
        );
        Ok(())
    }
}
