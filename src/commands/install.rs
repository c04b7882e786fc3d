use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::DotlinkError;
use crate::executor::execute_install;
use crate::output;
use crate::plan::{ConflictPolicy, build_install_plan};
use crate::registry::Registry;
use crate::runtime::Runtime;

/// Install a package by mirroring its files into the target directory as
/// relative symlinks, recording the result in the registry.
///
/// The plan is computed fully before anything is touched. Under the default
/// `abort` policy any conflict stops the whole install before the first
/// mutation; `skip` and `force` resolve conflicts per target instead.
#[tracing::instrument(skip(runtime, target, registry_override))]
pub fn install<R: Runtime>(
    runtime: R,
    package: &Path,
    target: Option<PathBuf>,
    policy: ConflictPolicy,
    dry_run: bool,
    registry_override: Option<PathBuf>,
) -> Result<()> {
    let registry_path = super::resolve_registry_path(&runtime, registry_override)?;
    debug!("Using registry at {:?}", registry_path);
    let mut registry = Registry::load(&runtime, &registry_path)?;

    let home = runtime.home_dir();
    let target_dir = match target {
        Some(dir) => dir,
        None => home.clone().context("Could not find home directory")?,
    };

    let plan = build_install_plan(&runtime, &registry, package, &target_dir, policy)?;

    if plan.aborted {
        let conflicts = plan.conflicts();
        output::print_conflicts(&conflicts, home.as_deref());
        return Err(DotlinkError::ConflictDetected { conflicts }.into());
    }

    output::print_install_plan(&plan, dry_run, home.as_deref());

    let report = execute_install(&runtime, &plan, &mut registry, &registry_path, dry_run)?;
    output::print_install_summary(&plan, &report, dry_run);

    if report.failed() > 0 {
        bail!(
            "{} action(s) failed while installing '{}'",
            report.failed(),
            plan.package_name
        );
    }
    Ok(())
}
