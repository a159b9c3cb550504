//! Schema-tolerant field accessors.
//!
//! Most leaf facts in a set are stored as `<Label Value="..."/>`, i.e. a
//! mapping whose attribute sub-mapping carries `Value`. Facts that moved
//! between document revisions are located through an ordered list of probes.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::error::{MalformedNodeError, VersionParseError};
use crate::models::VersionInfo;
use crate::tree::DocumentTree;

/// Rendered tempo when no usable value exists.
pub const TEMPO_NAN: &str = "NaN";

lazy_static! {
    static ref CREATOR_RE: Regex =
        Regex::new(r"([a-zA-Z ]+) ([0-9]+)\.([0-9]+)(?:\.([0-9]+))?").expect("creator regex");
}

/// A named location where a fact may live in one schema revision.
pub struct Probe {
    pub name: &'static str,
    pub path: &'static [&'static str],
}

/// Tempo locations, oldest revision first. Live 12 renamed `MasterTrack`.
pub const TEMPO_PROBES: &[Probe] = &[
    Probe {
        name: "MasterTrack",
        path: &["LiveSet", "MasterTrack", "DeviceChain", "Mixer", "Tempo", "Manual"],
    },
    Probe {
        name: "MainTrack",
        path: &["LiveSet", "MainTrack", "DeviceChain", "Mixer", "Tempo", "Manual"],
    },
];

/// Returns the `Value` attribute of a `<X Value="..."/>` node.
pub fn unwrap_attribute_value(node: &DocumentTree) -> Result<&str, MalformedNodeError> {
    node.attribute("Value").ok_or_else(|| MalformedNodeError {
        node: node.to_json(),
    })
}

/// Follows `labels` from `node` and unwraps the `Value` attribute found there.
///
/// A missing intermediate label is reported against the last node reached.
pub fn attribute_value_at<'a>(
    node: &'a DocumentTree,
    labels: &[&str],
) -> Result<&'a str, MalformedNodeError> {
    let mut current = node;
    for label in labels {
        current = current.get(label).ok_or_else(|| MalformedNodeError {
            node: current.to_json(),
        })?;
    }
    unwrap_attribute_value(current)
}

/// Parses `"<app> <major>.<minor>[.<patch>]"`, e.g. `"Ableton Live 11.3.21"`.
pub fn parse_version_string(creator: &str) -> Result<VersionInfo, VersionParseError> {
    let err = || VersionParseError {
        creator: creator.to_string(),
    };
    let caps = CREATOR_RE.captures(creator).ok_or_else(err)?;
    let number = |i: usize| -> Result<u32, VersionParseError> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().map_err(|_| err()),
            None => Ok(0),
        }
    };
    Ok(VersionInfo {
        app: caps[1].to_string(),
        major: number(2)?,
        minor: number(3)?,
        patch: number(4)?,
    })
}

/// Tempo of the set with two decimals, or [`TEMPO_NAN`]. Never fails.
pub fn resolve_tempo(tree: &DocumentTree) -> String {
    for probe in TEMPO_PROBES {
        let Some(node) = tree.get_path(probe.path) else {
            continue;
        };
        return match unwrap_attribute_value(node) {
            Ok(raw) => format_tempo(raw),
            Err(e) => {
                warn!(probe = probe.name, "tempo node has no value: {}", e);
                TEMPO_NAN.to_string()
            }
        };
    }
    TEMPO_NAN.to_string()
}

/// Renders a raw tempo with exactly two decimals; unparseable input gives `NaN`.
///
/// Halves round away from zero (`120.125` is `120.13`).
pub fn format_tempo(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(bpm) if bpm.is_finite() => format!("{:.2}", (bpm * 100.0).round() / 100.0),
        _ => TEMPO_NAN.to_string(),
    }
}
