//! Finding the locator file from a test process.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

use super::MARKER_FILE_NAME;
use crate::io::config::{CONFIG_FILE_NAME, load_config};

/// Environment variable naming the locator file explicitly.
pub const LOCATOR_ENV: &str = "TESTKIT_LOCATOR";

/// Find the locator, honoring [`LOCATOR_ENV`] before searching from `start`.
pub fn discover(start: &Path) -> Result<PathBuf> {
    let explicit = std::env::var_os(LOCATOR_ENV).map(PathBuf::from);
    discover_from(start, explicit.as_deref())
}

/// Find the locator from `start` upward.
///
/// At each ancestor, the locator under a `testkit.toml`'s `layout.output_dir`
/// is tried first, then `target/testkit/<marker>`, then `<marker>`.
pub fn discover_from(start: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!(
                "{LOCATOR_ENV} points at {}, which is not a file",
                path.display()
            );
        }
        return Ok(path.to_path_buf());
    }

    for dir in start.ancestors() {
        let mut candidates = Vec::with_capacity(3);
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            let cfg = load_config(&config_path)?;
            candidates.push(cfg.layout.resolve(dir).locator_path);
        }
        candidates.push(dir.join("target").join("testkit").join(MARKER_FILE_NAME));
        candidates.push(dir.join(MARKER_FILE_NAME));
        for candidate in candidates {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "locator found");
                return Ok(candidate);
            }
        }
    }

    bail!(
        "could not locate TestKit locator file (`{MARKER_FILE_NAME}`) from {}; run `testkit process` first or set {LOCATOR_ENV}",
        start.display()
    )
}
