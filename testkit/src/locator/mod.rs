//! The locator file: a small `key=value` marker written at build time and read
//! back by tests to find fixture projects and the staging directory.
//!
//! ```text
//! ## Used by tests to locate the TestKit projects dir during test execution via resource lookup
//! ## Generated @ Jan 1, 2024, 12:00:00 PM
//! testkit.base-dir=/abs/path/to/target/testkit
//! testkit.staging-dir=/abs/path/to/target/tmp/testKit
//! testkit.implicit-project-name=simple
//! ```

mod discover;
mod reader;
mod writer;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};

pub use discover::{LOCATOR_ENV, discover, discover_from};
pub use reader::{Locator, parse_entries, read_locator};
pub use writer::{render_marker, write_marker_file};

/// File name of the locator, relative to the processed fixture directory.
pub const MARKER_FILE_NAME: &str = "testkit_locator.properties";

pub const KEY_BASE_DIR: &str = "testkit.base-dir";
pub const KEY_STAGING_DIR: &str = "testkit.staging-dir";
pub const KEY_IMPLICIT_PROJECT_NAME: &str = "testkit.implicit-project-name";
/// Staging dir key written by older locators; read only.
pub const KEY_LEGACY_TMP_DIR: &str = "testkit.tmp-dir";

/// Project used when a test does not name one.
pub const DEFAULT_IMPLICIT_PROJECT_NAME: &str = "simple";

/// Facts recorded in a locator file. Built fresh for every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    /// Processed fixture projects. Older locators omit it.
    pub base_dir: Option<PathBuf>,
    /// Where staged copies of fixture projects are created.
    pub staging_dir: PathBuf,
    /// Written as an empty value when `None`.
    pub implicit_project_name: Option<String>,
    /// Informational only; readers never parse it.
    pub generated_at: DateTime<Utc>,
}

impl MarkerRecord {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: None,
            staging_dir: staging_dir.into(),
            implicit_project_name: Some(DEFAULT_IMPLICIT_PROJECT_NAME.to_string()),
            generated_at: Utc::now(),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_implicit_project_name(mut self, name: Option<String>) -> Self {
        self.implicit_project_name = name;
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// All recorded paths must be absolute.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_dir) = &self.base_dir {
            require_absolute(KEY_BASE_DIR, base_dir)?;
        }
        require_absolute(KEY_STAGING_DIR, &self.staging_dir)?;
        if let Some(name) = &self.implicit_project_name
            && name.contains(['\n', '\r'])
        {
            return Err(invalid_input(format!(
                "{KEY_IMPLICIT_PROJECT_NAME} must be a single line (got {name:?})"
            )));
        }
        Ok(())
    }
}

fn require_absolute(key: &str, path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(invalid_input(format!(
            "{key} must be an absolute path (got {})",
            path.display()
        )));
    }
    Ok(())
}

fn invalid_input(message: String) -> anyhow::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message).into()
}

/// Double every backslash so a line reader recovers the literal path.
pub(crate) fn escape_value(raw: &str) -> String {
    raw.replace('\\', "\\\\")
}

pub(crate) fn unescape_value(escaped: &str) -> String {
    escaped.replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_defaults_to_simple_project() {
        let record = MarkerRecord::new("/tmp/testKit");
        assert_eq!(record.implicit_project_name.as_deref(), Some("simple"));
        assert!(record.base_dir.is_none());
    }

    #[test]
    fn rejects_relative_staging_dir() {
        let record = MarkerRecord::new("tmp/testKit");
        let err = record.validate().expect_err("relative path");
        assert!(err.to_string().contains(KEY_STAGING_DIR));
        let io_err = err.downcast_ref::<io::Error>().expect("io error");
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_multiline_project_name() {
        let record = MarkerRecord::new("/tmp/testKit")
            .with_implicit_project_name(Some("a\nb".to_string()));
        assert!(record.validate().is_err());
    }

    #[test]
    fn escaping_doubles_backslashes_only() {
        assert_eq!(escape_value(r"C:\work\tmp"), r"C:\\work\\tmp");
        assert_eq!(escape_value("/plain/path"), "/plain/path");
        assert_eq!(unescape_value(r"C:\\work\\tmp"), r"C:\work\tmp");
    }
}
