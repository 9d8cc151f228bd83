//! Temporary directory purge
//!
//! Deletes the immediate children of each configured temp root. Files held
//! open by other processes are expected; they are recorded and skipped.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CancelFlag, ReclamationStep, StepKind, StepReport, TargetTally};
use crate::platform::FileSystem;

pub struct PurgeTempFiles {
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
}

impl PurgeTempFiles {
    /// Duplicate roots are collapsed so no entry is attempted twice.
    pub fn new(fs: Arc<dyn FileSystem>, roots: Vec<PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        Self { fs, roots: unique }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ReclamationStep for PurgeTempFiles {
    fn kind(&self) -> StepKind {
        StepKind::PurgeTempFiles
    }

    fn run(&self, cancel: &CancelFlag) -> StepReport {
        let mut tally = TargetTally::default();
        let mut unavailable: Vec<String> = Vec::new();

        'roots: for root in &self.roots {
            if !self.fs.exists(root) {
                debug!("Temp root {} does not exist", root.display());
                unavailable.push(root.display().to_string());
                continue;
            }
            let entries = match self.fs.list_dir(root) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Cannot list {}: {}", root.display(), err);
                    unavailable.push(root.display().to_string());
                    continue;
                }
            };

            for entry in entries {
                if cancel.is_cancelled() {
                    tally.mark_cancelled();
                    break 'roots;
                }
                let result = if entry.is_dir {
                    self.fs.remove_dir_all(&entry.path)
                } else {
                    self.fs.remove_file(&entry.path)
                };
                tally.record(entry.path.display(), result);
            }
        }

        let mut message = tally.describe("removed", "entries", "in use or protected");
        if !unavailable.is_empty() {
            message.push_str(&format!("; skipped roots: {}", unavailable.join(", ")));
        }
        info!(
            "Temp purge: {} removed, {} left in place",
            tally.affected(),
            tally.failed()
        );
        tally.into_report(self.kind(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFileSystem;
    use std::path::Path;

    fn purge(fs: FakeFileSystem, roots: &[&str]) -> (Arc<FakeFileSystem>, StepReport) {
        let fs = Arc::new(fs);
        let step = PurgeTempFiles::new(fs.clone(), roots.iter().map(PathBuf::from).collect());
        let report = step.run(&CancelFlag::new());
        (fs, report)
    }

    #[test]
    fn test_locked_file_is_skipped() {
        let mut fs = FakeFileSystem::default();
        fs.add_root("/tmp/a", &["1.tmp", "2.tmp", "3.tmp", "4.log"], &["cache"]);
        fs.add_root("/tmp/b", &["locked.dat"], &[]);
        fs.lock("/tmp/b/locked.dat");

        let (fs, report) = purge(fs, &["/tmp/a", "/tmp/b"]);

        assert!(report.succeeded);
        assert_eq!(report.items_affected, 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].target, Path::new("/tmp/b/locked.dat").display().to_string());
        assert_eq!(fs.removed().len(), 5);
    }

    #[test]
    fn test_duplicate_roots_are_purged_once() {
        let mut fs = FakeFileSystem::default();
        fs.add_root("/tmp/a", &["x"], &[]);

        let (fs, report) = purge(fs, &["/tmp/a", "/tmp/a"]);

        assert_eq!(report.items_affected, 1);
        assert_eq!(fs.removed(), vec![PathBuf::from("/tmp/a/x")]);
    }

    #[test]
    fn test_missing_and_unreadable_roots_are_not_failures() {
        let mut fs = FakeFileSystem::default();
        fs.add_root("/tmp/ok", &["x"], &[]);
        fs.unreadable.insert(PathBuf::from("/tmp/denied"));

        let (_, report) = purge(fs, &["/tmp/missing", "/tmp/denied", "/tmp/ok"]);

        assert!(report.succeeded);
        assert_eq!(report.items_affected, 1);
        assert!(report.failures.is_empty());
        let message = report.message.unwrap();
        assert!(message.contains("skipped roots"));
        assert!(message.contains("missing"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_no_accessible_root_still_succeeds() {
        let mut fs = FakeFileSystem::default();
        fs.unreadable.insert(PathBuf::from("/tmp/denied"));

        let (fs, report) = purge(fs, &["/tmp/missing", "/tmp/denied"]);

        assert!(report.succeeded);
        assert_eq!(report.items_affected, 0);
        assert!(report.failures.is_empty());
        assert!(fs.removed().is_empty());
        assert!(report.message.unwrap().contains("skipped roots"));
    }

    #[test]
    fn test_purges_real_directory() {
        let root = tempfile::tempdir().unwrap();
        for name in ["a.tmp", "b.tmp", "c.log"] {
            std::fs::write(root.path().join(name), b"scratch").unwrap();
        }
        let nested = root.path().join("build-cache");
        std::fs::create_dir_all(nested.join("deep")).unwrap();
        std::fs::write(nested.join("deep").join("obj.o"), b"x").unwrap();

        let step = PurgeTempFiles::new(
            Arc::new(crate::platform::StdFileSystem),
            vec![root.path().to_path_buf()],
        );
        let report = step.run(&CancelFlag::new());

        assert!(report.succeeded);
        assert_eq!(report.items_affected, 4);
        assert!(root.path().exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cancelled_before_first_entry() {
        let mut fs = FakeFileSystem::default();
        fs.add_root("/tmp/a", &["x", "y"], &[]);
        let fs = Arc::new(fs);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = PurgeTempFiles::new(fs.clone(), vec![PathBuf::from("/tmp/a")]).run(&cancel);

        assert_eq!(report.items_affected, 0);
        assert!(fs.removed().is_empty());
        assert!(report.message.unwrap().contains("cancelled"));
    }
}
