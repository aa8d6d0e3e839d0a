use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use super::{
    KEY_BASE_DIR, KEY_IMPLICIT_PROJECT_NAME, KEY_STAGING_DIR, MarkerRecord, escape_value,
    invalid_input,
};

const BANNER: &str =
    "## Used by tests to locate the TestKit projects dir during test execution via resource lookup";
const GENERATED_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

/// Write `record` to `target`, replacing any previous contents.
///
/// A missing parent directory is created. Creating the file is idempotent: a
/// file that already exists (including one created by a racing process) is
/// reused and truncated. Every I/O failure carries the failing path, and the
/// underlying [`io::Error`] stays reachable through the error chain.
#[instrument(skip_all, fields(target = %target.display()))]
pub fn write_marker_file(target: &Path, record: &MarkerRecord) -> Result<()> {
    record.validate()?;
    let contents = render_marker(record)?;

    prepare_marker_file(target)?;

    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(target)
        .with_context(|| format!("open marker file {} for writing", target.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .with_context(|| format!("write marker file {}", target.display()))?;
    writer
        .flush()
        .with_context(|| format!("flush marker file {}", target.display()))?;

    info!(
        staging_dir = %record.staging_dir.display(),
        base_dir = ?record.base_dir,
        "locator written"
    );
    Ok(())
}

/// Render the locator contents: banner, timestamp, then keys in fixed order.
pub fn render_marker(record: &MarkerRecord) -> Result<String> {
    let mut lines = vec![
        BANNER.to_string(),
        format!("## Generated @ {}", record.generated_at.format(GENERATED_FORMAT)),
    ];
    if let Some(base_dir) = &record.base_dir {
        lines.push(entry(KEY_BASE_DIR, &path_value(KEY_BASE_DIR, base_dir)?));
    }
    lines.push(entry(
        KEY_STAGING_DIR,
        &path_value(KEY_STAGING_DIR, &record.staging_dir)?,
    ));
    lines.push(entry(
        KEY_IMPLICIT_PROJECT_NAME,
        record.implicit_project_name.as_deref().unwrap_or_default(),
    ));

    let mut contents = lines.join("\n");
    contents.push('\n');
    Ok(contents)
}

fn entry(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

fn path_value(key: &str, path: &Path) -> Result<String> {
    let raw = path.to_str().ok_or_else(|| {
        invalid_input(format!(
            "{key} is not valid UTF-8: {}",
            path.to_string_lossy()
        ))
    })?;
    Ok(escape_value(raw))
}

fn prepare_marker_file(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create marker directory {}", parent.display()))?;
    }

    match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(_) => debug!("marker file created"),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            debug!("marker file already exists, overwriting");
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("create marker file {}", target.display()));
        }
    }
    Ok(())
}
