//! Test-only helpers for building fixture layouts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::container::ProjectContainer;
use crate::locator::{
    DEFAULT_IMPLICIT_PROJECT_NAME, MARKER_FILE_NAME, MarkerRecord, write_marker_file,
};

/// A temporary fixture dir, staging dir and locator, removed on drop.
pub struct FixtureSet {
    temp: TempDir,
    pub base_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub locator_path: PathBuf,
}

impl FixtureSet {
    /// Fixture projects named `projects`, with `simple` as implicit project.
    pub fn new(projects: &[&str]) -> Result<Self> {
        Self::with_implicit(projects, Some(DEFAULT_IMPLICIT_PROJECT_NAME))
    }

    /// Each project gets `fixture.txt` (`project: <name>`) and `src/lib.txt`.
    pub fn with_implicit(projects: &[&str], implicit: Option<&str>) -> Result<Self> {
        let temp = tempfile::tempdir().context("create fixture tempdir")?;
        let base_dir = temp.path().join("testkit");
        let staging_dir = temp.path().join("tmp").join("testKit");
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("create {}", base_dir.display()))?;

        let fixtures = Self {
            locator_path: base_dir.join(MARKER_FILE_NAME),
            temp,
            base_dir,
            staging_dir,
        };
        for project in projects {
            fixtures.write_project_file(
                project,
                "fixture.txt",
                &format!("project: {project}\n"),
            )?;
            fixtures.write_project_file(project, "src/lib.txt", "fixture source\n")?;
        }

        let record = MarkerRecord::new(&fixtures.staging_dir)
            .with_base_dir(&fixtures.base_dir)
            .with_implicit_project_name(implicit.map(str::to_string));
        write_marker_file(&fixtures.locator_path, &record)?;
        Ok(fixtures)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `contents` to `<base_dir>/<project>/<relative>`.
    pub fn write_project_file(
        &self,
        project: &str,
        relative: &str,
        contents: &str,
    ) -> Result<PathBuf> {
        let path = self.base_dir.join(project).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn container(&self) -> Result<ProjectContainer> {
        ProjectContainer::from_locator(&self.locator_path)
    }
}
