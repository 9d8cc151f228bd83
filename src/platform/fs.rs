//! Standard-library filesystem collaborator

use std::io;
use std::path::Path;
use tracing::debug;

use super::traits::{DirEntryInfo, FileSystem, OsError};

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, OsError> {
        let entries = readable_entries(path, std::fs::read_dir(path)?)
            .into_iter()
            .map(|entry| DirEntryInfo {
                path: entry.path(),
                // file_type() does not follow symlinks
                is_dir: entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
            })
            .collect();
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> Result<(), OsError> {
        Ok(std::fs::remove_file(path)?)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), OsError> {
        Ok(std::fs::remove_dir_all(path)?)
    }
}

/// Keep the entries that could be read, skipping the ones that could not.
fn readable_entries<T>(root: &Path, entries: impl IntoIterator<Item = io::Result<T>>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry in {}: {}", root.display(), err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_dir_reports_immediate_children() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tmp"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("nested.tmp"), b"y").unwrap();

        let mut entries = StdFileSystem.list_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_dir);
        assert!(entries[1].is_dir);
    }

    #[test]
    fn test_unreadable_entry_does_not_drop_the_rest() {
        let entries = vec![
            Ok("a.tmp"),
            Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            Ok("b.tmp"),
            Err(io::Error::new(io::ErrorKind::Other, "stale handle")),
        ];
        let kept = readable_entries(Path::new("/tmp"), entries);
        assert_eq!(kept, vec!["a.tmp", "b.tmp"]);
    }

    #[test]
    fn test_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(!StdFileSystem.exists(&missing));
        assert!(matches!(
            StdFileSystem.list_dir(&missing),
            Err(OsError::NotFound(_))
        ));
    }
}
