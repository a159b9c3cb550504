//! Plugin and sample descriptor classification.

use crate::error::MalformedNodeError;
use crate::models::{PluginDetail, PluginInfo, PluginKind, SampleInfo};
use crate::resolve::attribute_value_at;
use crate::tree::DocumentTree;
use crate::PROJECT_SUFFIX;

/// Classification of samples stored outside the owning project folder.
pub const EXTERNAL: &str = "external";

/// Recognizes one plugin format by the child label of a `PluginDesc`.
pub struct PluginProbe {
    pub kind: PluginKind,
    pub label: &'static str,
    extract: fn(&DocumentTree) -> Result<PluginDetail, MalformedNodeError>,
}

/// Checked in order; the first probe whose label is present wins.
pub const PLUGIN_PROBES: &[PluginProbe] = &[
    PluginProbe {
        kind: PluginKind::Au,
        label: "AuPluginInfo",
        extract: au_detail,
    },
    PluginProbe {
        kind: PluginKind::Vst,
        label: "VstPluginInfo",
        extract: vst_detail,
    },
    PluginProbe {
        kind: PluginKind::Vst3,
        label: "Vst3PluginInfo",
        extract: vst3_detail,
    },
];

fn au_detail(info: &DocumentTree) -> Result<PluginDetail, MalformedNodeError> {
    Ok(PluginDetail {
        name: attribute_value_at(info, &["Name"])?.to_string(),
        manufacturer: Some(attribute_value_at(info, &["Manufacturer"])?.to_string()),
        path: None,
    })
}

fn vst_detail(info: &DocumentTree) -> Result<PluginDetail, MalformedNodeError> {
    Ok(PluginDetail {
        name: attribute_value_at(info, &["PlugName"])?.to_string(),
        manufacturer: None,
        path: Some(attribute_value_at(info, &["Path"])?.to_string()),
    })
}

fn vst3_detail(info: &DocumentTree) -> Result<PluginDetail, MalformedNodeError> {
    Ok(PluginDetail {
        name: attribute_value_at(info, &["Name"])?.to_string(),
        manufacturer: None,
        path: None,
    })
}

/// Classifies a `PluginDesc` node. Formats no probe recognizes come back as
/// [`PluginKind::Unknown`] with an empty detail; only a recognized but
/// incomplete descriptor is an error.
pub fn classify_plugin(desc: &DocumentTree) -> Result<PluginInfo, MalformedNodeError> {
    for probe in PLUGIN_PROBES {
        if let Some(info) = desc.get(probe.label) {
            return Ok(PluginInfo {
                kind: probe.kind,
                detail: (probe.extract)(info)?,
            });
        }
    }
    Ok(PluginInfo {
        kind: PluginKind::Unknown,
        detail: PluginDetail::default(),
    })
}

/// Resolves a `SampleRef` node into its path, size, and classification.
pub fn classify_sample(sample_ref: &DocumentTree) -> Result<SampleInfo, MalformedNodeError> {
    let path = attribute_value_at(sample_ref, &["FileRef", "Path"])?;
    let size = attribute_value_at(sample_ref, &["FileRef", "OriginalFileSize"])?;
    let size_bytes = size.trim().parse::<u64>().map_err(|_| MalformedNodeError {
        node: sample_ref.to_json(),
    })?;
    Ok(SampleInfo {
        path: path.to_string(),
        size_bytes,
        classification: classify_sample_path(path),
    })
}

/// Positional heuristic over the fixed project layout
/// `<... Project>/Samples/<Category>/<file>`, with an optional extra
/// `Samples` level (`<... Project>/Samples/<x>/<Category>/<file>`).
pub fn classify_sample_path(path: &str) -> String {
    let parts: Vec<&str> = path.split(['/', '\\']).collect();
    let from_end = |n: usize| parts[parts.len().saturating_sub(n)];

    let mut project_root = from_end(4);
    if project_root == "Samples" {
        project_root = from_end(5);
    }

    if project_root.ends_with(PROJECT_SUFFIX) {
        from_end(2).to_lowercase()
    } else {
        EXTERNAL.to_string()
    }
}
