//! Load progress reporting.
//!
//! A single-document load reports percentage milestones composed from stage
//! weights: container decode occupies [0, 50), XML parsing [50, 70), derived
//! extraction [70, 90), completion 100. A project load reports
//! `completed / total * 100` after each document and wraps every document's
//! own events in [`ProjectProgress::SetProgress`].
//!
//! Percentages are hints and only ever move forward within one operation.
//! Reporters write to **stderr** so stdout stays parseable for scripts.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Weight of container decoding in a document load.
pub const DECODE_SHARE: f64 = 0.5;
pub const PARSING_XML_PERCENT: f64 = 50.0;
pub const PARSING_COMPLETE_PERCENT: f64 = 70.0;
pub const SAMPLES_EXTRACTED_PERCENT: f64 = 80.0;
pub const TRACKS_EXTRACTED_PERCENT: f64 = 90.0;
pub const COMPLETE_PERCENT: f64 = 100.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStage {
    ReadingFile,
    /// Container decoder stages.
    Reading,
    Unzipping,
    Processing,
    ParsingXml,
    ParsingComplete,
    SamplesExtracted,
    TracksExtracted,
    Complete,
    Error,
}

impl LoadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStage::ReadingFile => "reading-file",
            LoadStage::Reading => "reading",
            LoadStage::Unzipping => "unzipping",
            LoadStage::Processing => "processing",
            LoadStage::ParsingXml => "parsing-xml",
            LoadStage::ParsingComplete => "parsing-complete",
            LoadStage::SamplesExtracted => "samples-extracted",
            LoadStage::TracksExtracted => "tracks-extracted",
            LoadStage::Complete => "complete",
            LoadStage::Error => "error",
        }
    }
}

/// Progress of the container decoder on its own 0-100 scale.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeProgress {
    pub stage: LoadStage,
    pub percent: f64,
    pub bytes_read: Option<u64>,
    pub bytes_total: Option<u64>,
}

/// One milestone of a single-document load.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadProgress {
    pub stage: LoadStage,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_read: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadProgress {
    pub fn stage(stage: LoadStage, percent: f64) -> Self {
        Self {
            stage,
            percent,
            path: None,
            bytes_read: None,
            bytes_total: None,
            error: None,
        }
    }

    pub fn reading_file(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            ..Self::stage(LoadStage::ReadingFile, 0.0)
        }
    }

    /// Decoder progress rescaled into the decode share of the load.
    pub fn from_decode(event: DecodeProgress) -> Self {
        Self {
            bytes_read: event.bytes_read,
            bytes_total: event.bytes_total,
            ..Self::stage(event.stage, event.percent * DECODE_SHARE)
        }
    }

    /// Error events carry no percentage of their own.
    pub fn error(message: impl Into<String>, percent: f64) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::stage(LoadStage::Error, percent)
        }
    }
}

/// Multi-document (project) load events.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum ProjectProgress {
    LoadingSets {
        completed: usize,
        total: usize,
        percent: f64,
    },
    /// A document's own progress, attributed to it.
    SetProgress {
        path: PathBuf,
        set_index: usize,
        progress: LoadProgress,
    },
    SetFailed {
        path: PathBuf,
        set_index: usize,
        error: String,
    },
    Complete {
        completed: usize,
        total: usize,
        percent: f64,
    },
}

impl ProjectProgress {
    pub fn loading(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            COMPLETE_PERCENT
        } else {
            completed as f64 / total as f64 * 100.0
        };
        ProjectProgress::LoadingSets {
            completed,
            total,
            percent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ProgressEvent {
    Load(LoadProgress),
    Project(ProjectProgress),
}

/// Receives progress from load operations, in order, on the calling thread.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Load(p) => format!("  {}\n", describe_load(p)),
            ProgressEvent::Project(ProjectProgress::LoadingSets {
                completed,
                total,
                percent,
            }) => format!("[{}/{}] {:.1}% complete\n", completed, total, percent),
            ProgressEvent::Project(ProjectProgress::SetProgress { path, progress, .. }) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                format!("    {}  {}\n", name, describe_load(progress))
            }
            ProgressEvent::Project(ProjectProgress::SetFailed { path, error, .. }) => {
                format!("    {}  failed: {}\n", path.display(), error)
            }
            ProgressEvent::Project(ProjectProgress::Complete { completed, total, .. }) => {
                format!("loaded {} / {} sets\n", completed, total)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

fn describe_load(p: &LoadProgress) -> String {
    let mut out = format!("{:<18} {:>5.1}%", p.stage.as_str(), p.percent);
    if let (Some(read), Some(total)) = (p.bytes_read, p.bytes_total) {
        out.push_str(&format!(
            "  {} / {} bytes",
            format_number(read),
            format_number(total)
        ));
    }
    if let Some(err) = &p.error {
        out.push_str(&format!("  {}", err));
    }
    out
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressSink for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op sink when progress is disabled.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parses `off`, `human`, `json`, or `auto` (TTY detection).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            "auto" => Some(Self::default_for_tty()),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressSink> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
