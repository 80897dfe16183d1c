use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Collapse `.` / `..` lexically while ensuring the path never escapes the sandbox root.
///
/// A leading `/` is treated as relative to the root, matching object-store keys.
fn normalize_relative(path: &str) -> Result<PathBuf, StorageError> {
    let trimmed = path.trim_start_matches('/');
    let mut out = PathBuf::new();

    for c in Path::new(trimmed).components() {
        match c {
            Component::CurDir => {},
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(StorageError::PathTraversal {
                        path: path.to_owned().into(),
                        context: Some("Path attempted to escape sandbox via '..'".into()),
                    });
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::PathTraversal {
                    path: path.to_owned().into(),
                    context: Some("Absolute paths are not allowed in sandbox".into()),
                });
            },
        }
    }

    Ok(out)
}

/// Joins an object key to the root and ensures it doesn't escape the sandbox.
pub(crate) fn resolve(root: &Path, path: &str) -> Result<PathBuf, StorageError> {
    let safe_rel = normalize_relative(path)?;
    let joined = root.join(safe_rel);

    match joined.canonicalize() {
        Ok(canonical) => validate_canonical(root, path, &canonical).map(|()| joined),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_ancestors(root, path, &joined),
        Err(e) => Err(StorageError::Io { source: e, context: Some(format!("Resolve failed: {path}").into()) }),
    }
}

fn validate_canonical(root: &Path, path: &str, canonical: &Path) -> Result<(), StorageError> {
    if canonical.starts_with(root) {
        Ok(())
    } else {
        Err(StorageError::PathTraversal {
            path: path.to_owned().into(),
            context: Some("Path resolves outside sandbox through a symlink".into()),
        })
    }
}

/// Validates a path that doesn't exist yet by verifying its first existing ancestor.
fn validate_ancestors(root: &Path, path: &str, joined: &Path) -> Result<PathBuf, StorageError> {
    let mut current = Some(joined);

    while let Some(candidate) = current {
        if candidate == root {
            return Ok(joined.to_path_buf());
        }

        if candidate.exists() {
            return match candidate.canonicalize() {
                Ok(canonical) => validate_canonical(root, path, &canonical).map(|()| joined.to_path_buf()),
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = candidate.parent();
    }

    Err(StorageError::PathTraversal {
        path: path.to_owned().into(),
        context: Some("No valid parent directory found within sandbox".into()),
    })
}

/// Converts an on-disk path below `root` back into a forward-slash object key.
pub(crate) fn object_key(root: &Path, full: &Path) -> Option<String> {
    let rel = full.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| match c {
            Component::Normal(seg) => seg.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
