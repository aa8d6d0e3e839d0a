use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use super::{
    KEY_BASE_DIR, KEY_IMPLICIT_PROJECT_NAME, KEY_LEGACY_TMP_DIR, KEY_STAGING_DIR, unescape_value,
};

/// A locator file as seen by tests.
///
/// Only the staging dir is required, under `testkit.staging-dir` or the older
/// `testkit.tmp-dir`. Locators written before `testkit.base-dir` existed fall
/// back to the directory holding the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub path: PathBuf,
    pub base_dir: Option<PathBuf>,
    pub staging_dir: PathBuf,
    pub implicit_project_name: Option<String>,
}

impl Locator {
    pub fn from_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<Self> {
        let Some(staging_dir) = entries
            .get(KEY_STAGING_DIR)
            .or_else(|| entries.get(KEY_LEGACY_TMP_DIR))
        else {
            bail!(
                "could not find `{KEY_STAGING_DIR}` in locator {}",
                path.display()
            );
        };
        if staging_dir.is_empty() {
            bail!("`{KEY_STAGING_DIR}` is empty in locator {}", path.display());
        }

        let base_dir = entries
            .get(KEY_BASE_DIR)
            .filter(|value| !value.is_empty())
            .map(|value| PathBuf::from(unescape_value(value)));
        let implicit_project_name = entries
            .get(KEY_IMPLICIT_PROJECT_NAME)
            .filter(|value| !value.is_empty())
            .cloned();

        Ok(Self {
            path: path.to_path_buf(),
            base_dir,
            staging_dir: PathBuf::from(unescape_value(staging_dir)),
            implicit_project_name,
        })
    }

    /// Fixture project root: `base_dir`, or the locator's own directory.
    pub fn resolved_base_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => self
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

/// Read and interpret a locator file.
pub fn read_locator(path: &Path) -> Result<Locator> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read locator {}", path.display()))?;
    let entries = parse_entries(&contents);
    debug!(path = %path.display(), keys = entries.len(), "locator parsed");
    Locator::from_entries(path, &entries)
}

/// Split each non-comment line on its first `=` and trim both sides.
///
/// Values are kept literally; no unescaping happens here. Lines starting with
/// `#` or `!` and blank lines are skipped. A later duplicate key wins.
pub fn parse_entries(contents: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let (key, value) = trimmed.split_once('=').unwrap_or((trimmed, ""));
        entries.insert(key.trim().to_string(), value.trim().to_string());
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_splits_on_first_equals() {
        let contents = "\
## banner
! bang comment

testkit.staging-dir = /tmp/a=b
testkit.implicit-project-name=simple
";
        let entries = parse_entries(contents);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[KEY_STAGING_DIR], "/tmp/a=b");
        assert_eq!(entries[KEY_IMPLICIT_PROJECT_NAME], "simple");
    }

    #[test]
    fn parse_keeps_escaped_values_literally() {
        let entries = parse_entries(r"testkit.staging-dir=C:\\work\\testKit");
        assert_eq!(entries[KEY_STAGING_DIR], r"C:\\work\\testKit");
    }

    #[test]
    fn later_duplicate_key_wins() {
        let entries = parse_entries("k=1\nk=2\n");
        assert_eq!(entries["k"], "2");
    }

    #[test]
    fn missing_staging_dir_is_an_error() {
        let entries = parse_entries("testkit.base-dir=/tmp/base\n");
        let err = Locator::from_entries(Path::new("/x/locator"), &entries).expect_err("strict");
        assert!(err.to_string().contains(KEY_STAGING_DIR));
    }

    #[test]
    fn reads_legacy_tmp_dir_key() {
        let entries = parse_entries(
            "## Generated @ Jan 1, 2020, 9:00:00 AM\n\
             testkit.tmp-dir=/abs/build/tmp/testKit\n\
             testkit.implicit-project-name=simple\n",
        );
        let locator =
            Locator::from_entries(Path::new("/res/testkit/locator"), &entries).expect("legacy");
        assert_eq!(locator.staging_dir, PathBuf::from("/abs/build/tmp/testKit"));
        assert_eq!(locator.implicit_project_name.as_deref(), Some("simple"));
        assert_eq!(locator.resolved_base_dir(), PathBuf::from("/res/testkit"));
    }

    #[test]
    fn staging_dir_key_wins_over_legacy_key() {
        let entries = parse_entries("testkit.tmp-dir=/old\ntestkit.staging-dir=/new\n");
        let locator = Locator::from_entries(Path::new("/l"), &entries).expect("locator");
        assert_eq!(locator.staging_dir, PathBuf::from("/new"));
    }

    #[test]
    fn tolerates_missing_optional_keys() {
        let entries = parse_entries("testkit.staging-dir=/tmp/testKit\n");
        let locator =
            Locator::from_entries(Path::new("/res/testkit/locator"), &entries).expect("tolerant");
        assert_eq!(locator.base_dir, None);
        assert_eq!(locator.implicit_project_name, None);
        assert_eq!(locator.resolved_base_dir(), PathBuf::from("/res/testkit"));
    }

    #[test]
    fn empty_implicit_name_reads_as_none() {
        let entries =
            parse_entries("testkit.staging-dir=/tmp/testKit\ntestkit.implicit-project-name=\n");
        let locator = Locator::from_entries(Path::new("/l"), &entries).expect("locator");
        assert_eq!(locator.implicit_project_name, None);
    }

    #[test]
    fn unescapes_paths() {
        let entries = parse_entries(r"testkit.staging-dir=C:\\work\\testKit");
        let locator = Locator::from_entries(Path::new("/l"), &entries).expect("locator");
        assert_eq!(locator.staging_dir, PathBuf::from(r"C:\work\testKit"));
    }
}
