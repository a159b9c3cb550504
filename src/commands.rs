//! Command implementations for the `lset` binary.
//!
//! Results go to stdout, either as aligned text or as JSON when `json` is
//! set. Streaming commands print one JSON object per line as events arrive.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::liveset::LiveSet;
use crate::models::LiveSetInfo;
use crate::progress::{format_number, ProgressSink};
use crate::project::{BatchPolicy, LiveProject};
use crate::query::find_paths;
use crate::scan::{scan_documents, scan_projects, ScanEvent, ScanOptions};
use crate::validate::{validate, ProjectValidationResult};

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

/// Load one set and print its metadata.
pub fn run_info(path: &Path, sink: &dyn ProgressSink, json: bool) -> Result<()> {
    let set = LiveSet::load(path, sink)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let info = set.info();

    if json {
        return print_json(info, true);
    }
    print_info(info);
    Ok(())
}

fn print_info(info: &LiveSetInfo) {
    let title = format!("{} (v{})", info.name, info.version);
    println!("{}", title);
    println!("{}", "=".repeat(title.chars().count()));
    println!();
    println!("  Location:  {}", info.location.display());
    println!("  Creator:   {}", info.version.app);
    println!("  Tempo:     {} BPM", info.tempo);
    println!("  Size:      {}", format_bytes(info.file.size));
    println!("  Modified:  {}", info.file.modified.format("%Y-%m-%d %H:%M"));
    println!("  SHA-256:   {}", info.file.sha256);
    println!();

    let breakdown: Vec<String> = info
        .track_counts
        .iter()
        .map(|(kind, count)| format!("{} {}", kind, count))
        .collect();
    if breakdown.is_empty() {
        println!("  Tracks:    {}", info.track_count);
    } else {
        println!(
            "  Tracks:    {} ({})",
            info.track_count,
            breakdown.join(", ")
        );
    }

    for (kind, tracks) in &info.tracks {
        for track in tracks {
            let name = if track.name.is_empty() {
                "(unnamed)"
            } else {
                track.name.as_str()
            };
            println!("    {:<12} {}", kind, name);
            if !track.devices.is_empty() {
                let devices: Vec<&str> = track.devices.iter().map(String::as_str).collect();
                println!("    {:<12}   devices: {}", "", devices.join(", "));
            }
            for plugin in &track.plugins {
                println!("    {:<12}   {:<5} {}", "", plugin.kind, plugin.detail.name);
            }
        }
    }

    let plugins = info.unique_plugins();
    if !plugins.is_empty() {
        println!();
        println!("  Plugins:");
        for plugin in plugins {
            match &plugin.detail.manufacturer {
                Some(m) => println!("    {:<5} {} ({})", plugin.kind, plugin.detail.name, m),
                None => println!("    {:<5} {}", plugin.kind, plugin.detail.name),
            }
        }
    }

    if !info.samples.is_empty() {
        println!();
        println!("  Samples:");
        println!("    {:<12} {:>14}   {}", "CLASS", "BYTES", "PATH");
        println!("    {}", "-".repeat(60));
        for sample in &info.samples {
            println!(
                "    {:<12} {:>14}   {}",
                sample.classification,
                format_number(sample.size_bytes),
                sample.path
            );
        }
    }
    println!();
}

/// Stream every set under `root`.
pub fn run_scan(root: &Path, options: &ScanOptions, json: bool) -> Result<()> {
    let mut found = 0usize;
    for event in scan_documents(root, options)? {
        if json {
            print_json(&event, false)?;
        }
        match event {
            ScanEvent::Found { file, .. } => {
                found += 1;
                if !json {
                    println!("{}", file.display());
                }
            }
            ScanEvent::Error { path, error } => {
                warn!(path = %path.display(), "{}", error);
            }
            _ => {}
        }
    }
    if !json {
        eprintln!("{} set(s) found", found);
    }
    Ok(())
}

/// Stream every project folder under `root`, valid or not.
pub fn run_projects(root: &Path, options: &ScanOptions, json: bool) -> Result<()> {
    let (mut valid, mut invalid) = (0usize, 0usize);
    for event in scan_projects(root, options)? {
        if json {
            print_json(&event, false)?;
        }
        match event {
            ScanEvent::ProjectFound { project, is_valid } => {
                if is_valid {
                    valid += 1;
                } else {
                    invalid += 1;
                }
                if !json {
                    print_validation(&project);
                }
            }
            ScanEvent::Error { path, error } => {
                warn!(path = %path.display(), "{}", error);
            }
            _ => {}
        }
    }
    if !json {
        eprintln!("{} valid, {} invalid", valid, invalid);
    }
    Ok(())
}

fn print_validation(result: &ProjectValidationResult) {
    let status = if result.is_valid { "valid" } else { "invalid" };
    println!("{:<8} {}", status, result.path.display());
    for error in &result.errors {
        println!("         - {}", error);
    }
}

/// Validate one folder. Returns whether it is a valid project.
pub fn run_validate(dir: &Path, json: bool) -> Result<bool> {
    let result = validate(dir)?;
    if json {
        print_json(&result, true)?;
    } else {
        print_validation(&result);
    }
    Ok(result.is_valid)
}

#[derive(Serialize)]
struct ProjectSummary<'a> {
    name: &'a str,
    path: &'a Path,
    sets: Vec<&'a LiveSetInfo>,
    failures: &'a [crate::project::SetFailure],
}

/// Open a project folder and load every set in it.
pub fn run_project(
    dir: &Path,
    options: &ScanOptions,
    sink: &dyn ProgressSink,
    policy: BatchPolicy,
    json: bool,
) -> Result<()> {
    let mut project = LiveProject::open_with(dir, options)?;
    project.load_sets(sink, policy)?;

    if json {
        let summary = ProjectSummary {
            name: project.name(),
            path: project.path(),
            sets: project.sets().iter().map(LiveSet::info).collect(),
            failures: project.failures(),
        };
        return print_json(&summary, true);
    }

    println!("{} ({} set(s))", project.name(), project.set_paths().len());
    for set in project.sets() {
        let info = set.info();
        println!(
            "  {:<32} {} BPM | {} tracks | v{}",
            info.name, info.tempo, info.track_count, info.version
        );
    }
    for failure in project.failures() {
        println!("  {:<32} FAILED: {}", display_name(&failure.path), failure.error);
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write the parsed tree of a set as pretty JSON.
pub fn run_dump(file: &Path, out: Option<&Path>, sink: &dyn ProgressSink) -> Result<()> {
    let set = LiveSet::load(file, sink)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let body = serde_json::to_string_pretty(set.tree())?;

    match out {
        Some(out) => {
            std::fs::write(out, body)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            eprintln!("Wrote {}", out.display());
        }
        None => println!("{}", body),
    }
    Ok(())
}

/// List the dotted path of every node labelled `key`.
pub fn run_paths(file: &Path, key: &str, sink: &dyn ProgressSink, json: bool) -> Result<()> {
    let set = LiveSet::load(file, sink)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let paths = find_paths(set.tree(), key);

    if json {
        return print_json(&paths, true);
    }
    for path in &paths {
        println!("{}", path);
    }
    eprintln!("{} match(es) for '{}'", paths.len(), key);
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
