//! Recursive file discovery inside a package directory.

use anyhow::{Result, bail};
use log::trace;
use std::path::{Component, Path, PathBuf};

use crate::error::DotlinkError;
use crate::runtime::Runtime;

/// Walk a package root and return the relative path of every regular file,
/// sorted lexically for deterministic plans and dry-run output.
///
/// Directories (including empty ones) are never yielded. Symlinks inside the
/// package are yielded as files and not followed: the created link will point
/// at the in-package symlink, which resolves to whatever it resolves to.
///
/// The walk is fresh on every call; nothing is cached between invocations.
#[tracing::instrument(skip(runtime))]
pub fn discover_files<R: Runtime>(runtime: &R, package_root: &Path) -> Result<Vec<PathBuf>> {
    if !runtime.is_dir(package_root) {
        return Err(DotlinkError::PackageNotFound {
            path: package_root.to_path_buf(),
        }
        .into());
    }

    let mut files = Vec::new();
    walk(runtime, package_root, package_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk<R: Runtime>(
    runtime: &R,
    package_root: &Path,
    dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in runtime.read_dir(dir)? {
        // An in-package symlink counts as a file even when it points at a
        // directory, so check link-ness before directory-ness
        if !runtime.is_symlink(&entry) && runtime.is_dir(&entry) {
            walk(runtime, package_root, &entry, files)?;
        } else {
            files.push(relative_to_root(package_root, &entry)?);
        }
    }
    Ok(())
}

/// Express a discovered entry relative to the package root, rejecting
/// anything that would escape it. The walk itself only produces clean
/// children, so a violation means the directory tree handed something
/// unexpected back; refusing it here keeps `..` out of target paths.
fn relative_to_root(package_root: &Path, entry: &Path) -> Result<PathBuf> {
    let Ok(relative) = entry.strip_prefix(package_root) else {
        bail!(
            "Discovered file {} is outside the package directory {}",
            entry.display(),
            package_root.display()
        );
    };

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!(
            "Discovered file {} escapes the package directory",
            entry.display()
        );
    }

    trace!("Discovered {:?}", relative);
    Ok(relative.to_path_buf())
}
