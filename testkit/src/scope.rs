//! A staged, isolated copy of one fixture project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::io::config::BuildConfig;
use crate::runner::BuildRunner;

/// One staged fixture project, removed from disk on drop unless kept.
#[derive(Debug)]
pub struct ProjectScope {
    name: String,
    project_dir: PathBuf,
    stage_root: PathBuf,
    build: BuildConfig,
    keep: bool,
}

impl ProjectScope {
    pub(crate) fn new(
        name: String,
        project_dir: PathBuf,
        stage_root: PathBuf,
        build: BuildConfig,
    ) -> Self {
        Self {
            name,
            project_dir,
            stage_root,
            build,
            keep: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Build runner rooted at the staged project.
    pub fn create_runner<S: AsRef<str>>(&self, args: &[S]) -> Result<BuildRunner> {
        BuildRunner::new(&self.project_dir, &self.build, args)
    }

    /// Leave the staged copy on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.project_dir.clone()
    }

    /// Remove the staged copy now, reporting failures.
    pub fn release(mut self) -> Result<()> {
        self.keep = true;
        remove_stage(&self.stage_root)
    }
}

impl Drop for ProjectScope {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(err) = remove_stage(&self.stage_root) {
            warn!(err = %format!("{err:#}"), "failed to remove staged project");
        }
    }
}

fn remove_stage(stage_root: &Path) -> Result<()> {
    if !stage_root.exists() {
        return Ok(());
    }
    fs::remove_dir_all(stage_root)
        .with_context(|| format!("remove staged project {}", stage_root.display()))?;
    debug!(stage_root = %stage_root.display(), "staged project removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(temp: &Path) -> ProjectScope {
        let stage_root = temp.join("testKit_x");
        let project_dir = stage_root.join("simple");
        fs::create_dir_all(&project_dir).expect("mkdir");
        fs::write(project_dir.join("f.txt"), "x").expect("write");
        ProjectScope::new(
            "simple".to_string(),
            project_dir,
            stage_root,
            BuildConfig::default(),
        )
    }

    #[test]
    fn drop_removes_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = staged(temp.path());
        let dir = scope.project_dir().to_path_buf();
        assert!(dir.is_dir());
        drop(scope);
        assert!(!temp.path().join("testKit_x").exists());
    }

    #[test]
    fn keep_retains_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = staged(temp.path()).keep();
        assert!(dir.join("f.txt").is_file());
    }

    #[test]
    fn release_removes_and_tolerates_missing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = staged(temp.path());
        fs::remove_dir_all(temp.path().join("testKit_x")).expect("pre-remove");
        scope.release().expect("release");
    }

    #[test]
    fn runner_uses_project_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = staged(temp.path());
        let runner = scope.create_runner(&["--offline"]).expect("runner");
        assert_eq!(runner.workdir(), scope.project_dir());
        assert_eq!(runner.arguments(), ["build", "--offline"]);
    }
}
