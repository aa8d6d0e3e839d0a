//! Recursive directory copy for fixture projects.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;
use walkdir::WalkDir;

/// Copy everything under `src` into `dst`, creating `dst` if needed.
///
/// Existing files in `dst` are overwritten; files not present in `src` are
/// left alone. Returns the number of files copied.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<usize> {
    if !src.is_dir() {
        bail!("source directory {} does not exist", src.display());
    }
    fs::create_dir_all(dst).with_context(|| format!("create {}", dst.display()))?;

    let mut copied = 0usize;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("relativize {}", entry.path().display()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    debug!(src = %src.display(), dst = %dst.display(), copied, "directory copied");
    Ok(copied)
}
