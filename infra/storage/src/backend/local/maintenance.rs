use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Marker embedded in the names of in-flight write files.
pub(crate) const TMP_MARKER: &str = ".depottmp.";

/// Default age after which an in-flight write file counts as abandoned.
pub(crate) const STALE_AFTER: Duration = Duration::from_secs(300);

/// Removes write files abandoned by interrupted commits.
///
/// Directories are never touched: the root is a user directory and empty
/// folders in it are content.
pub(crate) async fn purge_tmp(root: &Path, threshold: Duration) {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, threshold)).await {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Cleaned up abandoned write files");
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
        },
        _ => {},
    }
}

fn remove_stale(root: &Path, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file() && is_tmp(e) && is_stale(e, now, threshold))
        .for_each(|entry| {
            let path = entry.path();
            match std::fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove abandoned write file");
                    failed += 1;
                },
            }
        });

    (removed, failed)
}

pub(crate) fn is_tmp_name(name: &str) -> bool {
    name.contains(TMP_MARKER)
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(is_tmp_name)
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn removes_only_stale_temporaries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("a/empty")).unwrap();
        std::fs::write(root.join("a/keep.bin"), b"k").unwrap();
        std::fs::write(root.join(format!("a/keep.bin{TMP_MARKER}7")), b"t").unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        let (removed, failed) = remove_stale(root, later, STALE_AFTER);

        assert_eq!((removed, failed), (1, 0));
        assert!(root.join("a/keep.bin").exists());
        assert!(root.join("a/empty").is_dir());
    }

    #[test]
    fn empty_directories_are_left_alone() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::create_dir(root.join("inbox")).unwrap();
        std::fs::write(root.join(format!("a/b/x{TMP_MARKER}3")), b"t").unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(remove_stale(root, later, STALE_AFTER), (1, 0));
        assert!(root.join("a/b").is_dir());
        assert!(root.join("inbox").is_dir());
    }

    #[test]
    fn fresh_temporaries_survive() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let fresh = root.join(format!("x{TMP_MARKER}1"));
        std::fs::write(&fresh, b"t").unwrap();

        let (removed, _) = remove_stale(root, SystemTime::now(), STALE_AFTER);
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }
}
