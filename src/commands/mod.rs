//! Command entry points consumed by the CLI layer.

mod install;
mod uninstall;

pub use install::install;
pub use uninstall::uninstall;

use anyhow::Result;
use std::path::PathBuf;

use crate::registry::Registry;
use crate::runtime::Runtime;

/// The registry file to use: an explicit override, or the platform default.
pub(crate) fn resolve_registry_path<R: Runtime>(
    runtime: &R,
    overridden: Option<PathBuf>,
) -> Result<PathBuf> {
    match overridden {
        Some(path) => Ok(path),
        None => Registry::default_path(runtime),
    }
}
