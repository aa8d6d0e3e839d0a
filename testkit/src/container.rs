//! Fixture projects as described by a locator file.
//!
//! A container is built once per test process: it reads the locator, checks
//! the fixture directory, and stages isolated copies of projects on demand.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, info, instrument, warn};

use crate::io::config::BuildConfig;
use crate::io::copy::copy_dir_contents;
use crate::locator::{Locator, discover, read_locator};
use crate::scope::ProjectScope;

const STAGE_PREFIX: &str = "testKit";
const STAGE_ATTEMPTS: u32 = 16;

static SHARED: Mutex<Option<Arc<ProjectContainer>>> = Mutex::new(None);

/// The fixture projects and staging area named by a locator.
#[derive(Debug, Clone)]
pub struct ProjectContainer {
    locator_path: PathBuf,
    base_dir: PathBuf,
    staging_dir: PathBuf,
    implicit_project_name: Option<String>,
    project_names: BTreeSet<String>,
    build: BuildConfig,
}

impl ProjectContainer {
    /// Discover the locator from the current directory and load it.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("resolve current directory")?;
        let path = discover(&cwd)?;
        Self::from_locator(&path)
    }

    pub fn from_locator(path: &Path) -> Result<Self> {
        let locator = read_locator(path)?;
        Self::from_parsed(&locator)
    }

    #[instrument(skip_all, fields(locator = %locator.path.display()))]
    pub fn from_parsed(locator: &Locator) -> Result<Self> {
        let base_dir = locator.resolved_base_dir();
        if !base_dir.exists() {
            bail!(
                "TestKit base directory (`{}`) did not exist",
                base_dir.display()
            );
        }
        if !base_dir.is_dir() {
            bail!(
                "TestKit base directory (`{}`) is not a directory",
                base_dir.display()
            );
        }

        let staging_dir = locator.staging_dir.clone();
        fs::create_dir_all(&staging_dir)
            .with_context(|| format!("create staging dir {}", staging_dir.display()))?;

        let project_names = list_projects(&base_dir)?;
        let implicit_project_name = locator.implicit_project_name.clone().or_else(|| {
            if project_names.len() == 1 {
                project_names.iter().next().cloned()
            } else {
                None
            }
        });

        info!(
            base_dir = %base_dir.display(),
            projects = project_names.len(),
            implicit = ?implicit_project_name,
            "TestKit projects loaded"
        );

        Ok(Self {
            locator_path: locator.path.clone(),
            base_dir,
            staging_dir,
            implicit_project_name,
            project_names,
            build: BuildConfig::default(),
        })
    }

    /// Process-wide container, created from [`ProjectContainer::discover`] on first use.
    pub fn shared() -> Result<Arc<Self>> {
        let mut guard = SHARED
            .lock()
            .map_err(|_| anyhow!("shared TestKit container lock poisoned"))?;
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let container = Arc::new(Self::discover()?);
        *guard = Some(Arc::clone(&container));
        Ok(container)
    }

    /// Drop the process-wide container and release its staging dir.
    pub fn release_shared() -> Result<()> {
        let taken = SHARED
            .lock()
            .map_err(|_| anyhow!("shared TestKit container lock poisoned"))?
            .take();
        match taken {
            Some(container) => container.release(),
            None => Ok(()),
        }
    }

    /// Use `build` for runners created from staged projects.
    pub fn with_build_config(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    pub fn locator_path(&self) -> &Path {
        &self.locator_path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn implicit_project_name(&self) -> Option<&str> {
        self.implicit_project_name.as_deref()
    }

    pub fn project_names(&self) -> &BTreeSet<String> {
        &self.project_names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.project_names.contains(name)
    }

    /// The fixture project in place, without staging a copy.
    ///
    /// Builds run here mutate the shared fixture; prefer [`Self::project_scope`].
    pub fn source_dir(&self, name: &str) -> Result<PathBuf> {
        self.require_project(name)?;
        Ok(self.base_dir.join(name))
    }

    /// Copy project `name` into a fresh directory under the staging dir.
    #[instrument(skip(self))]
    pub fn project_scope(&self, name: &str) -> Result<ProjectScope> {
        self.require_project(name)?;
        let source = self.base_dir.join(name);
        let stage_root = self.create_stage_root()?;
        let project_dir = stage_root.join(name);

        if let Err(err) = copy_dir_contents(&source, &project_dir) {
            if let Err(cleanup) = fs::remove_dir_all(&stage_root) {
                warn!(err = %cleanup, "failed to clean up partial stage");
            }
            return Err(err.context(format!("stage project `{name}`")));
        }

        debug!(project_dir = %project_dir.display(), "project staged");
        Ok(ProjectScope::new(
            name.to_string(),
            project_dir,
            stage_root,
            self.build.clone(),
        ))
    }

    /// Remove the staging dir if nothing is left in it.
    pub fn release(&self) -> Result<()> {
        match fs::remove_dir(&self.staging_dir) {
            Ok(()) => {
                debug!(staging_dir = %self.staging_dir.display(), "staging dir removed");
                Ok(())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                debug!(err = %err, "staging dir left in place");
                Ok(())
            }
            Err(err) => Err(err).with_context(|| {
                format!("remove staging dir {}", self.staging_dir.display())
            }),
        }
    }

    fn require_project(&self, name: &str) -> Result<()> {
        if !self.contains(name) {
            bail!(
                "unknown TestKit project `{name}` (available: {})",
                self.available()
            );
        }
        Ok(())
    }

    pub(crate) fn available(&self) -> String {
        if self.project_names.is_empty() {
            return "none".to_string();
        }
        self.project_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_stage_root(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.staging_dir)
            .with_context(|| format!("create staging dir {}", self.staging_dir.display()))?;
        for _ in 0..STAGE_ATTEMPTS {
            let candidate = self.staging_dir.join(build_stage_name(
                &generate_timestamp(),
                &generate_short_id(),
            ));
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("create stage dir {}", candidate.display()));
                }
            }
        }
        bail!(
            "could not create a unique stage dir under {}",
            self.staging_dir.display()
        )
    }
}

pub fn build_stage_name(timestamp: &str, short_id: &str) -> String {
    format!("{STAGE_PREFIX}_{timestamp}_{short_id}")
}

fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn generate_short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

/// Names of the immediate subdirectories of `base_dir`.
pub(crate) fn list_projects(base_dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in
        fs::read_dir(base_dir).with_context(|| format!("read {}", base_dir.display()))?
    {
        let entry = entry.context("read project entry")?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => warn!(name = ?raw, "skipping non UTF-8 project directory"),
        }
    }
    Ok(names)
}
