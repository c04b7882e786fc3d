//! Plan execution.
//!
//! Applies a plan's actions in order, best-effort: an action that fails is
//! recorded and execution continues, so one bad path does not strand the
//! rest of the package. After the action loop the registry is brought up to
//! date with whatever actually happened. The per-action outcome log is the
//! seam a future rollback/repair feature would replay.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::DotlinkError;
use crate::plan::{
    ConflictKind, Disposition, InstallPlan, Link, PlannedAction, StaleReason, UninstallPlan,
};
use crate::registry::{LinkRecord, Registry, RegistryEntry};
use crate::runtime::Runtime;

/// What actually happened to one planned action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Symlink created at a previously absent path
    Created(Link),
    /// Obstruction removed and symlink created in its place (force)
    Replaced(Link, ConflictKind),
    /// Target already held the correct symlink; nothing done
    AlreadyCorrect(Link),
    /// Conflicting target left alone
    SkippedConflict {
        target_path: PathBuf,
        kind: ConflictKind,
    },
    /// Symlink removed
    Removed(Link),
    /// Stale registry record dropped; filesystem untouched
    DroppedRecord {
        target_path: PathBuf,
        reason: StaleReason,
    },
    /// Filesystem action hard-failed
    Failed {
        target_path: PathBuf,
        error: String,
    },
}

/// Per-action outcomes of an executed (or dry-run) plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl ExecutionReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Created(_)))
    }

    pub fn replaced(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Replaced(..)))
    }

    pub fn already_correct(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::AlreadyCorrect(_)))
    }

    pub fn skipped_conflicts(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::SkippedConflict { .. }))
    }

    pub fn removed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Removed(_)))
    }

    pub fn dropped_records(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::DroppedRecord { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    /// Links the package owns after execution: everything created, replaced,
    /// or confirmed already correct.
    fn owned_links(&self) -> impl Iterator<Item = &Link> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ActionOutcome::Created(link)
            | ActionOutcome::Replaced(link, _)
            | ActionOutcome::AlreadyCorrect(link) => Some(link),
            _ => None,
        })
    }
}

/// Execute an install plan, then record the package's resolved link set in
/// the registry. With `dry_run` the outcomes are reported but neither the
/// filesystem nor the registry is touched.
#[tracing::instrument(skip(runtime, plan, registry))]
pub fn execute_install<R: Runtime>(
    runtime: &R,
    plan: &InstallPlan,
    registry: &mut Registry,
    registry_path: &Path,
    dry_run: bool,
) -> Result<ExecutionReport> {
    // An aborted plan executes nothing, ever
    if plan.aborted {
        return Err(DotlinkError::ConflictDetected {
            conflicts: plan.conflicts(),
        }
        .into());
    }

    let mut report = ExecutionReport::default();
    let mut attempted = 0usize;

    for action in &plan.actions {
        match action {
            PlannedAction::CreateLink(link) => {
                attempted += 1;
                let outcome = if dry_run {
                    ActionOutcome::Created(link.clone())
                } else {
                    match create_link(runtime, link) {
                        Ok(()) => ActionOutcome::Created(link.clone()),
                        Err(e) => failed(link, e),
                    }
                };
                report.outcomes.push(outcome);
            }
            PlannedAction::SkipExisting(link) => {
                report.outcomes.push(ActionOutcome::AlreadyCorrect(link.clone()));
            }
            PlannedAction::Conflict {
                link,
                kind,
                disposition: Disposition::Replace,
                ..
            } => {
                attempted += 1;
                let outcome = if dry_run {
                    ActionOutcome::Replaced(link.clone(), *kind)
                } else {
                    match replace_with_link(runtime, link) {
                        Ok(()) => ActionOutcome::Replaced(link.clone(), *kind),
                        Err(e) => failed(link, e),
                    }
                };
                report.outcomes.push(outcome);
            }
            PlannedAction::Conflict { link, kind, .. } => {
                report.outcomes.push(ActionOutcome::SkippedConflict {
                    target_path: link.target_path.clone(),
                    kind: *kind,
                });
            }
            other => debug!("Ignoring {:?} in an install plan", other),
        }
    }

    if dry_run {
        return Ok(report);
    }

    // Update the registry unless every filesystem action hard-failed; what
    // did succeed must stay uninstallable
    if attempted > 0 && report.failed() == attempted {
        warn!(
            "All {} action(s) for '{}' failed; registry left untouched",
            attempted, plan.package_name
        );
        return Ok(report);
    }

    let mut links = BTreeMap::new();
    for link in report.owned_links() {
        links.insert(
            link.target_path.clone(),
            LinkRecord {
                target_path: link.target_path.clone(),
                source_path: link.link_text(),
            },
        );
    }

    registry.upsert(RegistryEntry {
        name: plan.package_name.clone(),
        package_dir: plan.package_dir.clone(),
        target_dir: plan.target_dir.clone(),
        links,
        installed_at: now_utc()?,
    });
    registry.save(runtime, registry_path)?;

    Ok(report)
}

/// Execute an uninstall plan, then drop the package's registry entry. With
/// `dry_run` nothing is touched.
#[tracing::instrument(skip(runtime, plan, registry))]
pub fn execute_uninstall<R: Runtime>(
    runtime: &R,
    plan: &UninstallPlan,
    registry: &mut Registry,
    registry_path: &Path,
    dry_run: bool,
) -> Result<ExecutionReport> {
    let mut report = ExecutionReport::default();
    let mut attempted = 0usize;

    for action in &plan.actions {
        match action {
            PlannedAction::RemoveLink(link) => {
                attempted += 1;
                let outcome = if dry_run {
                    ActionOutcome::Removed(link.clone())
                } else {
                    match runtime.remove_symlink(&link.target_path) {
                        Ok(()) => ActionOutcome::Removed(link.clone()),
                        Err(e) => failed(link, e),
                    }
                };
                report.outcomes.push(outcome);
            }
            PlannedAction::RemoveMissing { target_path, reason } => {
                debug!("Dropping stale record for {:?} ({:?})", target_path, reason);
                report.outcomes.push(ActionOutcome::DroppedRecord {
                    target_path: target_path.clone(),
                    reason: reason.clone(),
                });
            }
            other => debug!("Ignoring {:?} in an uninstall plan", other),
        }
    }

    if dry_run {
        return Ok(report);
    }

    if attempted > 0 && report.failed() == attempted {
        warn!(
            "All {} removal(s) for '{}' failed; registry left untouched",
            attempted, plan.package_name
        );
        return Ok(report);
    }

    registry.remove(&plan.package_name);
    registry.save(runtime, registry_path)?;

    Ok(report)
}

/// Create the symlink for `link`, making parent directories first. Parents
/// are created as real directories, never symlinks, so multiple packages can
/// share intermediate directories like `.config`.
fn create_link<R: Runtime>(runtime: &R, link: &Link) -> Result<()> {
    if let Some(parent) = link.target_path.parent()
        && !runtime.exists(parent)
    {
        runtime.create_dir_all(parent)?;
    }
    runtime
        .symlink(&link.link_text(), &link.target_path)
        .with_context(|| format!("Failed to create symlink at {:?}", link.target_path))
}

/// Remove whatever occupies the target path, then link. The plan was built
/// read-only, so the obstruction is re-checked here in case the filesystem
/// changed between planning and execution; a directory that appeared in the
/// meantime still refuses to die.
fn replace_with_link<R: Runtime>(runtime: &R, link: &Link) -> Result<()> {
    if runtime.is_symlink(&link.target_path) {
        runtime.remove_symlink(&link.target_path)?;
    } else if runtime.is_dir(&link.target_path) {
        bail!(
            "Refusing to replace directory at {}",
            link.target_path.display()
        );
    } else if runtime.exists(&link.target_path) {
        runtime.remove_file(&link.target_path)?;
    }
    create_link(runtime, link)
}

fn failed(link: &Link, error: anyhow::Error) -> ActionOutcome {
    warn!("Action on {:?} failed: {:#}", link.target_path, error);
    ActionOutcome::Failed {
        target_path: link.target_path.clone(),
        error: format!("{:#}", error),
    }
}

fn now_utc() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("Failed to format timestamp")
}
