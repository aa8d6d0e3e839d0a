//! TestKit configuration stored in `testkit.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::locator::{DEFAULT_IMPLICIT_PROJECT_NAME, MARKER_FILE_NAME};

pub const CONFIG_FILE_NAME: &str = "testkit.toml";

/// TestKit configuration (TOML).
///
/// Missing fields default to the conventional `target/` layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestKitConfig {
    pub layout: LayoutConfig,
    pub build: BuildConfig,
}

/// Where fixture projects come from and where they go.
///
/// Relative paths resolve against the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fixture project sources, copied in order (later entries win).
    pub source_dirs: Vec<PathBuf>,
    /// Processed fixtures and the locator file.
    pub output_dir: PathBuf,
    /// Parent of every staged project copy.
    pub staging_dir: PathBuf,
    pub implicit_project_name: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("tests/testkit")],
            output_dir: PathBuf::from("target/testkit"),
            staging_dir: PathBuf::from("target/tmp/testKit"),
            implicit_project_name: Some(DEFAULT_IMPLICIT_PROJECT_NAME.to_string()),
        }
    }
}

/// Build command run inside staged projects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Program followed by fixed leading arguments (e.g. `["cargo","build"]`).
    pub command: Vec<String>,
    /// Appended after per-invocation arguments.
    pub extra_args: Vec<String>,
    pub timeout_secs: u64,
    /// Captured stdout/stderr beyond this many bytes is discarded.
    pub output_limit_bytes: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: vec!["cargo".to_string(), "build".to_string()],
            extra_args: Vec::new(),
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

/// Layout paths resolved against a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub source_dirs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub locator_path: PathBuf,
    pub implicit_project_name: Option<String>,
}

impl TestKitConfig {
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.build.validate()
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source_dirs.is_empty() {
            return Err(anyhow!("layout.source_dirs must be a non-empty array"));
        }
        if self
            .source_dirs
            .iter()
            .any(|dir| dir.as_os_str().is_empty())
        {
            return Err(anyhow!("layout.source_dirs entries must be non-empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("layout.output_dir must be non-empty"));
        }
        if self.staging_dir.as_os_str().is_empty() {
            return Err(anyhow!("layout.staging_dir must be non-empty"));
        }
        if let Some(name) = &self.implicit_project_name
            && name.trim().is_empty()
        {
            return Err(anyhow!(
                "layout.implicit_project_name must be non-empty when set"
            ));
        }
        Ok(())
    }

    /// Resolve every path against `root` (which should be absolute).
    pub fn resolve(&self, root: &Path) -> ResolvedLayout {
        let output_dir = root.join(&self.output_dir);
        ResolvedLayout {
            source_dirs: self.source_dirs.iter().map(|dir| root.join(dir)).collect(),
            locator_path: output_dir.join(MARKER_FILE_NAME),
            output_dir,
            staging_dir: root.join(&self.staging_dir),
            implicit_project_name: self.implicit_project_name.clone(),
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(anyhow!("build.command must be a non-empty array"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("build.timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("build.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `TestKitConfig::default()`.
pub fn load_config(path: &Path) -> Result<TestKitConfig> {
    if !path.exists() {
        let cfg = TestKitConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: TestKitConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
