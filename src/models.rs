//! Metadata types derived from a loaded set.
//!
//! These are built once when a load completes and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::fileinfo::FileInfo;

/// Application name and version from the document's `Creator` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub app: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PluginKind {
    #[serde(rename = "AU")]
    Au,
    #[serde(rename = "VST")]
    Vst,
    #[serde(rename = "VST3")]
    Vst3,
    Unknown,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PluginKind::Au => "AU",
            PluginKind::Vst => "VST",
            PluginKind::Vst3 => "VST3",
            PluginKind::Unknown => "Unknown",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginDetail {
    pub name: String,
    pub manufacturer: Option<String>,
    pub path: Option<String>,
}

/// A classified plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub kind: PluginKind,
    #[serde(flatten)]
    pub detail: PluginDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackDeviceInfo {
    pub name: String,
    pub devices: BTreeSet<String>,
    pub plugins: Vec<PluginInfo>,
}

/// A referenced audio file.
///
/// `classification` is the lower-cased name of the project sub-folder holding
/// the file (`recorded`, `processed`, ...) or `external`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleInfo {
    pub path: String,
    pub size_bytes: u64,
    pub classification: String,
}

/// Everything extracted from one set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSetInfo {
    pub name: String,
    pub location: PathBuf,
    pub version: VersionInfo,
    /// Tempo with two decimals, or `NaN` when the document has none.
    pub tempo: String,
    /// Audio plus MIDI tracks.
    pub track_count: usize,
    pub track_counts: BTreeMap<String, usize>,
    pub tracks: BTreeMap<String, Vec<TrackDeviceInfo>>,
    pub samples: Vec<SampleInfo>,
    pub file: FileInfo,
}

impl LiveSetInfo {
    /// Plugins across all tracks, first occurrence order, duplicates removed.
    pub fn unique_plugins(&self) -> Vec<&PluginInfo> {
        let mut seen: Vec<&PluginInfo> = Vec::new();
        for plugin in self.tracks.values().flatten().flat_map(|t| &t.plugins) {
            if !seen.contains(&plugin) {
                seen.push(plugin);
            }
        }
        seen
    }
}
