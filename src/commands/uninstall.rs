use anyhow::{Result, bail};
use log::debug;
use std::path::PathBuf;

use crate::executor::execute_uninstall;
use crate::output;
use crate::plan::build_uninstall_plan;
use crate::registry::Registry;
use crate::runtime::Runtime;

/// Uninstall a package by name, removing the symlinks its registry entry
/// says it owns. The package directory itself is never consulted, so this
/// works even after it has been moved or deleted.
///
/// Note the asymmetry with install, which takes a directory path: the
/// registry keys entries by name, and the name is the only thing guaranteed
/// to still exist at uninstall time.
#[tracing::instrument(skip(runtime, registry_override))]
pub fn uninstall<R: Runtime>(
    runtime: R,
    package_name: &str,
    dry_run: bool,
    registry_override: Option<PathBuf>,
) -> Result<()> {
    let registry_path = super::resolve_registry_path(&runtime, registry_override)?;
    debug!("Using registry at {:?}", registry_path);
    let mut registry = Registry::load(&runtime, &registry_path)?;

    let home = runtime.home_dir();

    let plan = build_uninstall_plan(&runtime, &registry, package_name)?;
    output::print_uninstall_plan(&plan, dry_run, home.as_deref());

    let report = execute_uninstall(&runtime, &plan, &mut registry, &registry_path, dry_run)?;
    output::print_uninstall_summary(&plan, &report, dry_run);

    if report.failed() > 0 {
        bail!(
            "{} action(s) failed while uninstalling '{}'",
            report.failed(),
            plan.package_name
        );
    }
    Ok(())
}
