//! Build-time processing of fixture projects.
//!
//! Copies fixture sources into the output dir and rewrites the locator there,
//! so tests can find both the fixtures and the staging dir.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::container::list_projects;
use crate::io::config::TestKitConfig;
use crate::io::copy::copy_dir_contents;
use crate::locator::{MarkerRecord, write_marker_file};

/// Result of [`process_projects`].
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub locator_path: PathBuf,
    pub record: MarkerRecord,
    pub projects: Vec<String>,
}

/// Copy every configured source dir into the output dir, then write the locator.
///
/// The locator is rewritten on every run, even when no fixture changed.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn process_projects(root: &Path, cfg: &TestKitConfig) -> Result<ProcessOutcome> {
    cfg.validate()?;
    let root = std::path::absolute(root)
        .with_context(|| format!("resolve project root {}", root.display()))?;
    let layout = cfg.layout.resolve(&root);

    for source in &layout.source_dirs {
        let copied = copy_dir_contents(source, &layout.output_dir)
            .with_context(|| format!("process fixtures from {}", source.display()))?;
        debug!(source = %source.display(), copied, "fixtures copied");
    }

    let record = MarkerRecord::new(&layout.staging_dir)
        .with_base_dir(&layout.output_dir)
        .with_implicit_project_name(layout.implicit_project_name.clone());
    write_marker_file(&layout.locator_path, &record)?;

    let projects: Vec<String> = list_projects(&layout.output_dir)?.into_iter().collect();
    info!(
        locator = %layout.locator_path.display(),
        projects = projects.len(),
        "fixtures processed"
    );
    Ok(ProcessOutcome {
        locator_path: layout.locator_path,
        record,
        projects,
    })
}
