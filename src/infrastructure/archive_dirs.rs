//! On-disk archive layout.
//!
//! Creates `current/`, `base/` and `wal/` below the archive base directory.

use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

/// Subdirectories every archive needs.
pub const ARCHIVE_SUBDIRS: [&str; 3] = ["current", "base", "wal"];

/// Owner read/write/execute only.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Directory layout rooted at a base path.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    base: PathBuf,
}

impl ArchiveLayout {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Where base backups are stored.
    #[must_use]
    pub fn base_backups_dir(&self) -> PathBuf {
        self.base.join("base")
    }

    /// Full paths of all required subdirectories.
    #[must_use]
    pub fn subdirs(&self) -> Vec<PathBuf> {
        ARCHIVE_SUBDIRS.iter().map(|d| self.base.join(d)).collect()
    }

    /// Create every missing subdirectory with mode 0700.
    ///
    /// Existing directories are left untouched, permissions included.
    ///
    /// # Errors
    /// Returns `DirectoryCreate` for the first path that cannot be created.
    pub fn ensure(&self) -> Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }

        for path in self.subdirs() {
            if path.is_dir() {
                tracing::debug!(path = %path.display(), "Directory already present");
                continue;
            }

            builder
                .create(&path)
                .map_err(|source| AppError::DirectoryCreate {
                    path: path.clone(),
                    source,
                })?;

            tracing::info!(path = %path.display(), "Created directory");
        }

        Ok(())
    }

    /// Whether the base directory holds anything besides this layout.
    ///
    /// The `current/`, `base/` and `wal/` directories a previous run created
    /// do not count, so repeated setups on the same archive stay quiet.
    ///
    /// # Errors
    /// Returns error if the directory exists but cannot be read.
    pub fn is_populated(&self) -> Result<bool> {
        if !self.base.is_dir() {
            return Ok(false);
        }

        let read_error = |e| AppError::io(format!("Failed to read {}", self.base.display()), e);

        for entry in std::fs::read_dir(&self.base).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            let is_layout_dir = ARCHIVE_SUBDIRS.iter().any(|d| entry.file_name() == *d)
                && entry.path().is_dir();

            if !is_layout_dir {
                tracing::debug!(
                    entry = %entry.path().display(),
                    "Foreign entry in archive directory"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn listing(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(path)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_ensure_creates_layout() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path().join("archive"));

        layout.ensure().unwrap();

        assert_eq!(listing(layout.base()), ["base", "current", "wal"]);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());

        layout.ensure().unwrap();
        let first = listing(dir.path());
        layout.ensure().unwrap();

        assert_eq!(listing(dir.path()), first);
    }

    #[cfg(unix)]
    #[test]
    fn test_created_dirs_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path());
        layout.ensure().unwrap();

        for path in layout.subdirs() {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o077, 0, "{} is group/world accessible", path.display());
        }
    }

    #[test]
    fn test_ensure_fails_when_base_is_a_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"x").unwrap();

        let err = ArchiveLayout::new(&file).ensure().unwrap_err();
        match err {
            AppError::DirectoryCreate { path, .. } => assert!(path.starts_with(&file)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_is_populated() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path().join("archive"));

        assert!(!layout.is_populated().unwrap());
        std::fs::create_dir(layout.base()).unwrap();
        assert!(!layout.is_populated().unwrap());
        std::fs::write(layout.base().join("old-backup.tar"), b"x").unwrap();
        assert!(layout.is_populated().unwrap());
    }

    #[test]
    fn test_own_layout_does_not_count_as_populated() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path().join("archive"));

        layout.ensure().unwrap();
        std::fs::write(layout.base().join("wal").join("000000010000000000000001"), b"x")
            .unwrap();
        assert!(!layout.is_populated().unwrap());

        std::fs::create_dir(layout.base().join("lost+found")).unwrap();
        assert!(layout.is_populated().unwrap());
    }

    #[test]
    fn test_file_named_like_subdir_counts_as_populated() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("wal"), b"x").unwrap();

        assert!(ArchiveLayout::new(dir.path()).is_populated().unwrap());
    }
}
