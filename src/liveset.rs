//! Single-document load pipeline.
//!
//! `file info → container decode → XML → tree → derived extraction`, with
//! progress reported at fixed milestones (see [`crate::progress`]). The
//! derived [`LiveSetInfo`] is computed once when the load completes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::classify::{classify_plugin, classify_sample};
use crate::container;
use crate::error::{LoadError, VersionParseError};
use crate::fileinfo;
use crate::models::{LiveSetInfo, PluginInfo, SampleInfo, TrackDeviceInfo, VersionInfo};
use crate::progress::{
    LoadProgress, LoadStage, NoProgress, ProgressEvent, ProgressSink, COMPLETE_PERCENT,
    PARSING_COMPLETE_PERCENT, PARSING_XML_PERCENT, SAMPLES_EXTRACTED_PERCENT,
    TRACKS_EXTRACTED_PERCENT,
};
use crate::query::find_by_keys;
use crate::resolve::{attribute_value_at, parse_version_string, resolve_tempo};
use crate::tree::{DocumentTree, ATTRIBUTES_KEY};
use crate::xml;

/// Track types counted by [`LiveSetInfo::track_count`].
pub const COUNTED_TRACK_TYPES: &[&str] = &["AudioTrack", "MidiTrack"];

/// A loaded set: the parsed tree and the metadata derived from it.
#[derive(Debug)]
pub struct LiveSet {
    path: PathBuf,
    tree: DocumentTree,
    info: LiveSetInfo,
}

impl LiveSet {
    /// Loads without progress reporting.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load(path, &NoProgress)
    }

    pub fn load(path: impl AsRef<Path>, sink: &dyn ProgressSink) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let emit = |progress: LoadProgress| sink.report(ProgressEvent::Load(progress));
        let fail = |err: LoadError, percent: f64| {
            emit(LoadProgress::error(err.to_string(), percent));
            err
        };

        let file = fileinfo::stat(&path).map_err(|source| {
            fail(
                LoadError::FileInfo {
                    path: path.clone(),
                    source,
                },
                0.0,
            )
        })?;

        emit(LoadProgress::reading_file(&path));
        let mut reached = 0.0;
        let raw = container::decode_with_progress(&path, |event| {
            let progress = LoadProgress::from_decode(event);
            reached = progress.percent;
            emit(progress);
        })
        .map_err(|e| fail(e, reached))?;

        emit(LoadProgress::stage(LoadStage::ParsingXml, PARSING_XML_PERCENT));
        let tree = xml::parse(&raw).map_err(|e| fail(e, PARSING_XML_PERCENT))?;
        drop(raw);
        emit(LoadProgress::stage(
            LoadStage::ParsingComplete,
            PARSING_COMPLETE_PERCENT,
        ));

        let version = document_version(&tree).map_err(|e| fail(e.into(), PARSING_COMPLETE_PERCENT))?;
        let tempo = resolve_tempo(&tree);

        let samples = extract_samples(&tree);
        emit(LoadProgress::stage(
            LoadStage::SamplesExtracted,
            SAMPLES_EXTRACTED_PERCENT,
        ));

        let tracks = extract_tracks(&tree);
        let track_counts: BTreeMap<String, usize> = tracks
            .iter()
            .map(|(kind, list)| (kind.clone(), list.len()))
            .collect();
        let track_count = COUNTED_TRACK_TYPES
            .iter()
            .filter_map(|kind| track_counts.get(*kind))
            .sum();
        emit(LoadProgress::stage(
            LoadStage::TracksExtracted,
            TRACKS_EXTRACTED_PERCENT,
        ));

        let info = LiveSetInfo {
            name: file.name.clone(),
            location: path.clone(),
            version,
            tempo,
            track_count,
            track_counts,
            tracks,
            samples,
            file,
        };
        debug!(
            path = %path.display(),
            tracks = info.track_count,
            samples = info.samples.len(),
            "set loaded"
        );
        emit(LoadProgress::stage(LoadStage::Complete, COMPLETE_PERCENT));

        Ok(Self { path, tree, info })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn info(&self) -> &LiveSetInfo {
        &self.info
    }

    pub fn tempo(&self) -> &str {
        &self.info.tempo
    }

    pub fn version(&self) -> &VersionInfo {
        &self.info.version
    }

    pub fn track_count(&self) -> usize {
        self.info.track_count
    }
}

/// Version from the root `Creator` attribute.
pub fn document_version(tree: &DocumentTree) -> Result<VersionInfo, VersionParseError> {
    let creator = tree.attribute("Creator").ok_or_else(|| VersionParseError {
        creator: String::new(),
    })?;
    parse_version_string(creator)
}

/// Tracks grouped by type (`AudioTrack`, `MidiTrack`, `ReturnTrack`, ...).
pub fn extract_tracks(tree: &DocumentTree) -> BTreeMap<String, Vec<TrackDeviceInfo>> {
    let mut groups = BTreeMap::new();
    let Some(tracks) = tree.get_path(&["LiveSet", "Tracks"]) else {
        return groups;
    };
    for (kind, value) in tracks.entries() {
        if kind == ATTRIBUTES_KEY {
            continue;
        }
        let infos: Vec<TrackDeviceInfo> = value.as_list().into_iter().map(track_info).collect();
        groups.insert(kind.clone(), infos);
    }
    groups
}

fn track_info(track: &DocumentTree) -> TrackDeviceInfo {
    let name = match attribute_value_at(track, &["Name", "EffectiveName"]) {
        Ok(name) => name.to_string(),
        Err(e) => {
            warn!("track without a name: {}", e);
            String::new()
        }
    };
    TrackDeviceInfo {
        name,
        devices: track_devices(track),
        plugins: track_plugins(track),
    }
}

/// Labels of every device in every (possibly nested) `Devices` list.
fn track_devices(track: &DocumentTree) -> BTreeSet<String> {
    find_by_keys(track, &["Devices"])
        .into_iter()
        .flat_map(|m| m.value.labels())
        .filter(|label| *label != ATTRIBUTES_KEY)
        .map(str::to_string)
        .collect()
}

fn track_plugins(track: &DocumentTree) -> Vec<PluginInfo> {
    find_by_keys(track, &["PluginDesc"])
        .into_iter()
        .filter_map(|m| match classify_plugin(m.value) {
            Ok(plugin) => Some(plugin),
            Err(e) => {
                warn!(path = %m.path, "skipping plugin: {}", e);
                None
            }
        })
        .collect()
}

/// Every `SampleRef` in the document, in traversal order.
pub fn extract_samples(tree: &DocumentTree) -> Vec<SampleInfo> {
    find_by_keys(tree, &["SampleRef"])
        .into_iter()
        .filter_map(|m| match classify_sample(m.value) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(path = %m.path, "skipping sample: {}", e);
                None
            }
        })
        .collect()
}
