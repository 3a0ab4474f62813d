// workbench-core/src/workspace.rs

//! The workspace root and the only way to turn caller-supplied names into
//! absolute paths.
//!
//! Containment is checked lexically: `.` and `..` are folded before comparing
//! against the root, but symlinks inside the workspace are not followed.

use crate::errors::{Result, WorkbenchError};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Wraps an absolute root directory. The root is normalized lexically but
    /// not canonicalized; callers that want symlink-free roots canonicalize
    /// before constructing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(WorkbenchError::invalid_path(format!(
                "workspace root must be absolute: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: normalize(&root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` against the root and rejects anything that lands
    /// outside of it. The root itself is a valid result.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let resolved = normalize(&joined);
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            warn!(name, "Rejected path outside of workspace");
            Err(WorkbenchError::invalid_path(format!(
                "'{}' resolves outside of the workspace",
                name
            )))
        }
    }

    /// Renders a resolved path relative to the root; the root itself is `.`.
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

// Folds `.` and `..` without touching the filesystem. `..` at the top of an
// absolute path stays at the top, like the OS does.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Workspace {
        Workspace::new("/work").unwrap()
    }

    #[test]
    fn test_resolve_rejects_parent_escape() {
        let result = work().resolve("../outside");
        assert!(matches!(result, Err(WorkbenchError::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_folds_dot_dot_inside_root() {
        let path = work().resolve("sub/../sub/file.txt").unwrap();
        assert_eq!(path, PathBuf::from("/work/sub/file.txt"));
    }

    #[test]
    fn test_resolve_root_itself() {
        assert_eq!(work().resolve(".").unwrap(), PathBuf::from("/work"));
        assert_eq!(work().resolve("").unwrap(), PathBuf::from("/work"));
    }

    #[test]
    fn test_resolve_absolute_paths() {
        assert_eq!(
            work().resolve("/work/a/b.txt").unwrap(),
            PathBuf::from("/work/a/b.txt")
        );
        assert!(work().resolve("/etc/passwd").is_err());
    }

    #[test]
    fn test_resolve_sibling_with_shared_prefix_is_rejected() {
        // "/work2" shares a string prefix with "/work" but is a different directory.
        assert!(work().resolve("/work2/file").is_err());
        assert!(work().resolve("../work2/file").is_err());
    }

    #[test]
    fn test_resolve_deep_escape() {
        assert!(work().resolve("a/b/../../../etc").is_err());
        assert!(work().resolve("a/b/../../c").is_ok());
    }

    #[test]
    fn test_relative_rendering() {
        let ws = work();
        assert_eq!(ws.relative(Path::new("/work")), ".");
        assert_eq!(ws.relative(Path::new("/work/sub/file.txt")), "sub/file.txt");
    }

    #[test]
    fn test_new_requires_absolute_root() {
        assert!(Workspace::new("relative/root").is_err());
    }
}
