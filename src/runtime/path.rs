//! Path utility functions for normalization and comparison.
//!
//! Everything here is lexical: no function in this module touches the
//! filesystem or follows symlinks.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {
                // Skip `.` components
            }
            Component::ParentDir => {
                // Pop the last component if possible
                if !result.pop() {
                    // If we can't pop (e.g., at root), keep the `..`
                    result.push(component);
                }
            }
            _ => {
                result.push(component);
            }
        }
    }
    result
}

/// Check if a path is under a given directory by comparing normalized path
/// components. Returns true if `dir` is a prefix of `path` (a path is
/// considered under itself).
///
/// Both paths are normalized first so `..` segments cannot be used to fake
/// containment: `/home/user/dots/../other` is NOT under `/home/user/dots`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Calculate the text of a symlink created at `link_path` that points to
/// `source_path`, as a path relative to the link's containing directory.
///
/// Relative link text keeps the link valid when the whole tree is moved as a
/// unit. When the package and target are not in an ancestor relationship the
/// result climbs with `..` segments: a link at `/home/user/.bashrc` pointing
/// into `/src/dotfiles/shell/.bashrc` becomes `../../src/dotfiles/shell/.bashrc`.
///
/// Returns `None` if a relative path cannot be computed (e.g., different
/// drive letters on Windows).
pub fn relative_link_target(link_path: &Path, source_path: &Path) -> Option<PathBuf> {
    let link_dir = link_path.parent()?;
    let result = pathdiff::diff_paths(source_path, link_dir)?;

    // An absolute result means no relative path exists (different drives)
    if result.is_absolute() {
        return None;
    }

    Some(result)
}

/// Resolve a possibly-relative path against a base directory, normalizing
/// `.` and `..` components. Absolute paths pass through unchanged.
///
/// Used to turn the text stored in a symlink (or a registry record) back
/// into the absolute location it denotes.
pub fn resolve_relative_path(base_dir: &Path, relative_path: &Path) -> PathBuf {
    if relative_path.is_absolute() {
        relative_path.to_path_buf()
    } else {
        normalize_path(&base_dir.join(relative_path))
    }
}
