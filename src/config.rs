use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::Path;

use crate::progress::ProgressMode;
use crate::project::BatchPolicy;
use crate::scan::ScanOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScanConfig {
    #[serde(default)]
    pub include_backups: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_progress")]
    pub progress: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress: default_progress(),
        }
    }
}

fn default_progress() -> String {
    "auto".to_string()
}

impl ScanConfig {
    pub fn scan_options(&self) -> Result<ScanOptions> {
        let exclude = if self.exclude_globs.is_empty() {
            None
        } else {
            Some(build_globset(&self.exclude_globs)?)
        };
        Ok(ScanOptions {
            include_backups: self.include_backups,
            follow_symlinks: self.follow_symlinks,
            exclude,
        })
    }
}

impl OutputConfig {
    pub fn progress_mode(&self) -> Result<ProgressMode> {
        ProgressMode::parse(&self.progress).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown output.progress: '{}'. Must be auto, off, human, or json.",
                self.progress
            )
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config
        .output
        .progress_mode()
        .context("Invalid [output] section")?;
    config
        .scan
        .scan_options()
        .context("Invalid scan.exclude_globs")?;

    Ok(config)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lset.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_tmp, path) = write("");
        let config = load_config(&path).unwrap();
        assert!(!config.scan.include_backups);
        assert_eq!(config.project.batch_policy, BatchPolicy::Skip);
        assert_eq!(config.output.progress, "auto");
    }

    #[test]
    fn full_file() {
        let (_tmp, path) = write(
            r#"[scan]
include_backups = true
exclude_globs = ["**/Archive"]

[project]
batch_policy = "abort"

[output]
progress = "json"
"#,
        );
        let config = load_config(&path).unwrap();
        assert!(config.scan.include_backups);
        assert_eq!(config.project.batch_policy, BatchPolicy::Abort);
        assert_eq!(config.output.progress_mode().unwrap(), ProgressMode::Json);
        let options = config.scan.scan_options().unwrap();
        assert!(options.exclude.unwrap().is_match("Music/Archive"));
    }

    #[test]
    fn rejects_unknown_values() {
        let (_tmp, path) = write("[project]\nbatch_policy = \"retry\"\n");
        assert!(load_config(&path).is_err());
        let (_tmp, path) = write("[output]\nprogress = \"loud\"\n");
        assert!(load_config(&path).is_err());
        let (_tmp, path) = write("[scan]\nexclude_globs = [\"a[\"]\n");
        assert!(load_config(&path).is_err());
    }
}
