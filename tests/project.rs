mod common;

use std::fs;
use std::sync::Mutex;

use liveset_harness::progress::{ProgressEvent, ProgressSink, ProjectProgress};
use liveset_harness::scan::ScanOptions;
use liveset_harness::{BatchPolicy, LiveProject, ProjectError};
use tempfile::TempDir;

use common::{set_xml, write_project, write_set};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for Recorder {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Recorder {
    fn project_events(&self) -> Vec<ProjectProgress> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Project(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

fn two_set_project(tmp: &TempDir) -> std::path::PathBuf {
    write_project(
        tmp.path(),
        "Song",
        &[
            ("Song", set_xml("Ableton Live 11.3.21", "104.5")),
            ("Song Alt", set_xml("Ableton Live 12.1", "90")),
        ],
    )
}

#[test]
fn test_open_lists_sets_without_backups() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);
    write_set(
        &dir.join("Backup").join("Song [2024-01-01 120000].als"),
        &set_xml("Ableton Live 11.3.21", "104.5"),
    );

    let project = LiveProject::open(&dir).unwrap();
    assert_eq!(project.name(), "Song");
    assert_eq!(project.set_paths().len(), 2);
    assert!(project
        .set_paths()
        .iter()
        .all(|p| !p.to_string_lossy().contains("Backup")));
    assert!(project.sets().is_empty());
}

#[test]
fn test_open_with_honors_scan_options() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);
    write_set(
        &dir.join("Archive").join("Old.als"),
        &set_xml("Ableton Live 10.1", "100"),
    );
    write_set(
        &dir.join("Backup").join("Song [old].als"),
        &set_xml("Ableton Live 11.3.21", "104.5"),
    );

    assert_eq!(LiveProject::open(&dir).unwrap().set_paths().len(), 3);

    let mut builder = globset::GlobSetBuilder::new();
    builder.add(globset::Glob::new("Archive").unwrap());
    let options = ScanOptions {
        include_backups: true,
        exclude: Some(builder.build().unwrap()),
        ..Default::default()
    };
    let project = LiveProject::open_with(&dir, &options).unwrap();
    assert_eq!(project.set_paths().len(), 2);
    assert!(project.set_paths().iter().all(|p| {
        let p = p.to_string_lossy();
        !p.contains("Archive") && !p.contains("Backup")
    }));
}

#[test]
fn test_load_sets_loads_every_set() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);

    let mut project = LiveProject::open(&dir).unwrap();
    let recorder = Recorder::default();
    project.load_sets(&recorder, BatchPolicy::Skip).unwrap();

    assert_eq!(project.sets().len(), 2);
    assert!(project.failures().is_empty());
    let mut tempos: Vec<&str> = project.sets().iter().map(|s| s.tempo()).collect();
    tempos.sort();
    assert_eq!(tempos, vec!["104.50", "90.00"]);

    let events = recorder.project_events();
    assert!(matches!(
        events.first(),
        Some(ProjectProgress::LoadingSets { completed: 0, total: 2, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(ProjectProgress::Complete { completed: 2, total: 2, .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProjectProgress::SetProgress { set_index: 1, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        ProjectProgress::LoadingSets { completed: 1, percent, .. } if *percent == 50.0
    )));
}

#[test]
fn test_skip_policy_records_failures() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);
    fs::write(dir.join("Broken.als"), b"definitely not gzip").unwrap();

    let mut project = LiveProject::open(&dir).unwrap();
    let recorder = Recorder::default();
    project.load_sets(&recorder, BatchPolicy::Skip).unwrap();

    assert_eq!(project.sets().len(), 2);
    assert_eq!(project.failures().len(), 1);
    assert!(project.failures()[0].path.ends_with("Broken.als"));

    let events = recorder.project_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ProjectProgress::SetFailed { .. }))
            .count(),
        1
    );
    assert!(matches!(
        events.last(),
        Some(ProjectProgress::Complete { completed: 3, total: 3, .. })
    ));
}

#[test]
fn test_abort_policy_returns_the_error() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);
    fs::write(dir.join("Broken.als"), b"definitely not gzip").unwrap();

    let mut project = LiveProject::open(&dir).unwrap();
    let recorder = Recorder::default();
    let err = project
        .load_sets(&recorder, BatchPolicy::Abort)
        .unwrap_err();

    match err {
        ProjectError::Load { path, .. } => assert!(path.ends_with("Broken.als")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!recorder
        .project_events()
        .iter()
        .any(|e| matches!(e, ProjectProgress::Complete { .. })));
}

#[test]
fn test_reload_starts_from_scratch() {
    let tmp = TempDir::new().unwrap();
    let dir = two_set_project(&tmp);

    let mut project = LiveProject::open(&dir).unwrap();
    let recorder = Recorder::default();
    project.load_sets(&recorder, BatchPolicy::Skip).unwrap();
    project.load_sets(&recorder, BatchPolicy::Skip).unwrap();
    assert_eq!(project.sets().len(), 2);
}

#[test]
fn test_open_rejects_invalid_folder() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("Loose Sets");
    write_set(&dir.join("a.als"), &set_xml("Ableton Live 11.3.21", "120"));

    match LiveProject::open(&dir) {
        Err(ProjectError::Invalid { errors, .. }) => {
            assert_eq!(
                errors,
                vec![
                    "Folder name does not end with ' Project'".to_string(),
                    "'Ableton Project Info' folder not found".to_string(),
                ]
            );
        }
        other => panic!("expected Invalid, got {:?}", other.map(|p| p.name().to_string())),
    }
}
