use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use crate::error::TablesmithError;

/// Extension of the per-table store files
pub const STORE_EXTENSION: &str = "db";

static TABLE_NAME: OnceLock<Regex> = OnceLock::new();

/// How table names map onto store files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreLayout {
    /// One store file per table name, `<dir>/<table>.db`
    PerTable(PathBuf),
    /// Every table in a single store file
    SingleFile(PathBuf),
}

impl std::fmt::Display for StoreLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerTable(dir) => write!(f, "per-table files in {}", dir.display()),
            Self::SingleFile(path) => write!(f, "single file {}", path.display()),
        }
    }
}

/// Explicit location of the relational store, passed to every operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLocation {
    pub layout: StoreLayout,
}

impl StoreLocation {
    pub fn per_table(dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::PerTable(dir.into()),
        }
    }

    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::SingleFile(path.into()),
        }
    }

    /// The `namespace_for` function resolves the store file that owns `table_name`.
    ///
    /// Arguments:
    ///
    /// * `table_name`: a table name, validated before it is used as part of a file name.
    ///
    /// Returns:
    ///
    /// The path of the store file on success or a validation error for an invalid name.
    pub fn namespace_for(&self, table_name: &str) -> Result<PathBuf, TablesmithError> {
        validate_table_name(table_name)?;

        match &self.layout {
            StoreLayout::PerTable(dir) => Ok(dir.join(format!(
                "{}.{}",
                table_name.to_ascii_lowercase(),
                STORE_EXTENSION
            ))),
            StoreLayout::SingleFile(path) => Ok(path.clone()),
        }
    }

    /// Whether two table names resolve to the same store file
    pub fn shares_namespace(&self, a: &str, b: &str) -> Result<bool, TablesmithError> {
        Ok(self.namespace_for(a)? == self.namespace_for(b)?)
    }

    /// The `namespaces` function lists the store files that currently exist at this location.
    pub fn namespaces(&self) -> Result<Vec<PathBuf>, TablesmithError> {
        match &self.layout {
            StoreLayout::PerTable(dir) => {
                if !dir.is_dir() {
                    return Ok(Vec::new());
                }

                let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension().and_then(|s| s.to_str()) == Some(STORE_EXTENSION)
                            && p.file_stem()
                                .and_then(|s| s.to_str())
                                .is_some_and(|s| validate_table_name(s).is_ok())
                    })
                    .collect();

                paths.sort();

                Ok(paths)
            }
            StoreLayout::SingleFile(path) => {
                if path.is_file() {
                    Ok(vec![path.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }

    /// Creates the parent directory of a store file when needed.
    pub(crate) fn prepare(path: &Path) -> Result<(), TablesmithError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(())
    }

    /// Removes a store file created by a call that then failed, with its journal files.
    pub(crate) fn discard(path: &Path) {
        let mut paths = vec![path.to_path_buf()];

        for suffix in ["-journal", "-wal", "-shm"] {
            let mut sibling = path.as_os_str().to_owned();
            sibling.push(suffix);
            paths.push(PathBuf::from(sibling));
        }

        for path in paths.iter().filter(|p| p.exists()) {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

/// The `validate_table_name` function checks that a table name is a plain identifier that is
/// also safe to use as a file name.
///
/// Returns:
///
/// A Result of unit on success or a validation error if the name is rejected.
pub fn validate_table_name(name: &str) -> Result<(), TablesmithError> {
    if name.trim().is_empty() {
        return Err(TablesmithError::Validation(
            "Table name cannot be empty".into(),
        ));
    }

    let re = match TABLE_NAME.get() {
        Some(re) => re,
        None => {
            let re = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$")?;
            TABLE_NAME.get_or_init(|| re)
        }
    };

    if !re.is_match(name) {
        return Err(TablesmithError::Validation(format!(
            "Table name {} contains invalid characters",
            name
        )));
    }

    if name.to_lowercase().starts_with("sqlite_") {
        return Err(TablesmithError::Validation(format!(
            "Table name {} is reserved by the store",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_table_namespace() {
        let location = StoreLocation::per_table("/tmp/stores");

        assert_eq!(
            location.namespace_for("test").unwrap(),
            PathBuf::from("/tmp/stores/test.db")
        );
        assert!(!location.shares_namespace("test", "test_new").unwrap());
    }

    #[test]
    fn test_per_table_namespace_folds_case() {
        let location = StoreLocation::per_table("/tmp/stores");

        assert_eq!(
            location.namespace_for("TEST").unwrap(),
            PathBuf::from("/tmp/stores/test.db")
        );
        assert!(location.shares_namespace("Test", "test").unwrap());
    }

    #[test]
    fn test_discard_removes_journals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.db");
        fs::write(&path, b"").unwrap();
        fs::write(dir.path().join("stale.db-journal"), b"").unwrap();

        StoreLocation::discard(&path);

        assert!(!path.exists());
        assert!(!dir.path().join("stale.db-journal").exists());
    }

    #[test]
    fn test_single_file_namespace() {
        let location = StoreLocation::single_file("/tmp/all.sqlite");

        assert_eq!(
            location.namespace_for("test_new").unwrap(),
            PathBuf::from("/tmp/all.sqlite")
        );
        assert!(location.shares_namespace("test", "test_new").unwrap());
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("test_append").is_ok());
        assert!(validate_table_name("2024-sales").is_ok());

        for name in ["", "  ", "../escape", "has space", "semi;colon", "sqlite_master"] {
            assert!(
                validate_table_name(name).unwrap_err().is_validation(),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_namespaces_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.db"), b"").unwrap();
        fs::write(dir.path().join("b.db"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let location = StoreLocation::per_table(dir.path());
        let namespaces = location.namespaces().unwrap();

        assert_eq!(namespaces.len(), 2);
        assert!(namespaces[0].ends_with("a.db"));
    }
}
