//! Package identity and file discovery.
//!
//! A package is a directory tree whose regular files should be mirrored as
//! symlinks into a target directory. It is ephemeral: resolved fresh on each
//! invocation and never persisted beyond the registry entry it produces.

mod discovery;

pub use discovery::discover_files;

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use crate::error::DotlinkError;
use crate::runtime::{Runtime, is_path_under};

/// A package: its registry name and its canonicalized root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Final path component of the package root
    pub name: String,
    /// Canonicalized absolute path to the package root
    pub root: PathBuf,
}

impl Package {
    /// Resolve a package directory into a [`Package`].
    ///
    /// Fails with [`DotlinkError::PackageNotFound`] when the path does not
    /// exist or is not a directory, and rejects the filesystem root (it has
    /// no name to register under, and linking all of `/` is never intended).
    #[tracing::instrument(skip(runtime))]
    pub fn locate<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let root = match runtime.canonicalize(path) {
            Ok(root) => root,
            Err(_) => {
                return Err(DotlinkError::PackageNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
        };

        if !runtime.is_dir(&root) {
            return Err(DotlinkError::PackageNotFound { path: root }.into());
        }

        let Some(name) = root.file_name().and_then(|n| n.to_str()) else {
            bail!("Refusing to use the filesystem root as a package directory");
        };

        Ok(Package {
            name: name.to_string(),
            root,
        })
    }
}

/// Reject target directories that would make the install eat its own tail:
/// linking a package into itself (or into any directory inside itself)
/// produces self-referential links.
pub fn validate_install_directories(package_root: &Path, target_dir: &Path) -> Result<()> {
    if is_path_under(target_dir, package_root) {
        bail!(
            "Target directory {} is the package directory or inside it",
            target_dir.display()
        );
    }
    Ok(())
}
