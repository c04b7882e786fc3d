//! Plan construction.
//!
//! Combines discovery, registry state, and the conflict policy into a fully
//! resolved plan. Everything here is read-only: the filesystem is inspected
//! but never changed, and the registry is never mutated.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::DotlinkError;
use crate::package::{Package, discover_files, validate_install_directories};
use crate::plan::{
    ConflictKind, ConflictPolicy, Disposition, InstallPlan, Link, PlannedAction, RemovalState,
    StaleReason, TargetState, UninstallPlan, classify_removal, classify_target,
};
use crate::registry::Registry;
use crate::runtime::path::normalize_path;
use crate::runtime::{Runtime, resolve_relative_path};

/// Build the full install plan for a package directory.
///
/// Under the `abort` policy the plan is built in full first (pass one,
/// read-only) and marked aborted if any conflict exists, so the executor can
/// guarantee all-or-nothing behavior without a transaction. Under `skip` and
/// `force` each conflict carries its own resolved disposition instead.
#[tracing::instrument(skip(runtime, registry))]
pub fn build_install_plan<R: Runtime>(
    runtime: &R,
    registry: &Registry,
    package_path: &Path,
    target_dir: &Path,
    policy: ConflictPolicy,
) -> Result<InstallPlan> {
    let package = Package::locate(runtime, package_path)?;
    let target_dir = absolutize(runtime, target_dir)?;
    validate_install_directories(&package.root, &target_dir)?;

    // The same name installed from a different directory is a collision, not
    // an update; re-planning from the recorded directory is the upsert path
    if let Some(entry) = registry.get(&package.name)
        && entry.package_dir != package.root
    {
        return Err(DotlinkError::PackageAlreadyInstalled {
            name: package.name,
            existing: entry.package_dir.clone(),
            requested: package.root,
        }
        .into());
    }

    let files = discover_files(runtime, &package.root)?;
    debug!(
        "Planning install of '{}': {} file(s) into {:?}",
        package.name,
        files.len(),
        target_dir
    );

    let mut actions = Vec::with_capacity(files.len());
    let mut conflict_count = 0usize;

    for relative in &files {
        let link = Link::new(target_dir.join(relative), package.root.join(relative));

        let action = match classify_target(runtime, &link) {
            TargetState::Absent => PlannedAction::CreateLink(link),
            TargetState::CorrectLink => PlannedAction::SkipExisting(link),
            TargetState::WrongLink { points_to } => {
                conflict_count += 1;
                conflict_action(link, ConflictKind::Symlink, points_to, policy)
            }
            TargetState::RegularFile => {
                conflict_count += 1;
                conflict_action(link, ConflictKind::File, None, policy)
            }
            TargetState::Directory => {
                conflict_count += 1;
                conflict_action(link, ConflictKind::Directory, None, policy)
            }
        };
        actions.push(action);
    }

    let aborted = policy == ConflictPolicy::Abort && conflict_count > 0;
    if aborted {
        debug!(
            "Plan for '{}' aborted: {} conflict(s)",
            package.name, conflict_count
        );
    }

    Ok(InstallPlan {
        package_name: package.name,
        package_dir: package.root,
        target_dir,
        policy,
        actions,
        aborted,
    })
}

fn conflict_action(
    link: Link,
    kind: ConflictKind,
    points_to: Option<PathBuf>,
    policy: ConflictPolicy,
) -> PlannedAction {
    let disposition = match policy {
        ConflictPolicy::Abort => Disposition::Abort,
        ConflictPolicy::Skip => Disposition::Skip,
        // Directories are never replaced, under any policy
        ConflictPolicy::Force if kind.is_replaceable() => Disposition::Replace,
        ConflictPolicy::Force => Disposition::Skip,
    };
    PlannedAction::Conflict {
        link,
        kind,
        points_to,
        disposition,
    }
}

/// Build the removal plan for a registered package.
///
/// The registry is the source of intent, not of current state: every record
/// is re-classified against the live filesystem, and only links that are
/// still exactly ours become removals. Everything else is dropped from the
/// registry without touching the filesystem.
#[tracing::instrument(skip(runtime, registry))]
pub fn build_uninstall_plan<R: Runtime>(
    runtime: &R,
    registry: &Registry,
    package_name: &str,
) -> Result<UninstallPlan> {
    let Some(entry) = registry.get(package_name) else {
        return Err(DotlinkError::UnregisteredPackage {
            name: package_name.to_string(),
        }
        .into());
    };

    // BTreeMap iteration keeps removal order deterministic
    let mut actions = Vec::with_capacity(entry.links.len());
    for (target_path, record) in &entry.links {
        let source_path = match target_path.parent() {
            Some(parent) => resolve_relative_path(parent, &record.source_path),
            None => record.source_path.clone(),
        };
        let link = Link::new(target_path.clone(), source_path);

        let action = match classify_removal(runtime, &link) {
            RemovalState::Owned => PlannedAction::RemoveLink(link),
            RemovalState::Missing => PlannedAction::RemoveMissing {
                target_path: target_path.clone(),
                reason: StaleReason::TargetMissing,
            },
            RemovalState::NotOwned => PlannedAction::RemoveMissing {
                target_path: target_path.clone(),
                reason: StaleReason::NotOwned,
            },
        };
        actions.push(action);
    }

    debug!(
        "Planning uninstall of '{}': {} record(s)",
        package_name,
        actions.len()
    );

    Ok(UninstallPlan {
        package_name: package_name.to_string(),
        target_dir: entry.target_dir.clone(),
        actions,
    })
}

/// Make a user-supplied target directory absolute without requiring it to
/// exist yet; parents are created at execution time.
fn absolutize<R: Runtime>(runtime: &R, path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&runtime.current_dir()?.join(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{LinkRecord, RegistryEntry};
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::collections::BTreeMap;

    const PACKAGE_ROOT: &str = "/dots/shell";
    const TARGET: &str = "/home/user";

    /// Package with `.bashrc` and `.profile`; canonicalize passthrough.
    fn mock_package(runtime: &mut MockRuntime) {
        let root = PathBuf::from(PACKAGE_ROOT);

        runtime
            .expect_canonicalize()
            .with(eq(root.clone()))
            .returning(|p| Ok(p.to_path_buf()));
        runtime
            .expect_is_dir()
            .with(eq(root.clone()))
            .returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(root.clone()))
            .returning(|p| Ok(vec![p.join(".bashrc"), p.join(".profile")]));

        for file in [".bashrc", ".profile"] {
            runtime
                .expect_is_symlink()
                .with(eq(root.join(file)))
                .returning(|_| false);
            runtime
                .expect_is_dir()
                .with(eq(root.join(file)))
                .returning(|_| false);
        }
    }

    /// Nothing exists at a target path.
    fn mock_target_absent(runtime: &mut MockRuntime, file: &str) {
        let target = PathBuf::from(TARGET).join(file);
        runtime
            .expect_is_symlink()
            .with(eq(target.clone()))
            .returning(|_| false);
        runtime
            .expect_is_dir()
            .with(eq(target.clone()))
            .returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(target))
            .returning(|_| false);
    }

    /// A regular file occupies a target path.
    fn mock_target_file(runtime: &mut MockRuntime, file: &str) {
        let target = PathBuf::from(TARGET).join(file);
        runtime
            .expect_is_symlink()
            .with(eq(target.clone()))
            .returning(|_| false);
        runtime
            .expect_is_dir()
            .with(eq(target.clone()))
            .returning(|_| false);
        runtime.expect_exists().with(eq(target)).returning(|_| true);
    }

    #[test]
    fn test_install_plan_all_absent() {
        let mut runtime = MockRuntime::new();
        mock_package(&mut runtime);
        mock_target_absent(&mut runtime, ".bashrc");
        mock_target_absent(&mut runtime, ".profile");

        let plan = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Abort,
        )
        .unwrap();

        assert_eq!(plan.package_name, "shell");
        assert!(!plan.aborted);
        assert_eq!(plan.actions.len(), 2);
        assert!(
            plan.actions
                .iter()
                .all(|a| matches!(a, PlannedAction::CreateLink(_)))
        );
        // Lexical order
        assert_eq!(
            plan.actions[0].target_path(),
            Path::new("/home/user/.bashrc")
        );
    }

    #[test_log::test]
    fn test_install_plan_abort_on_any_conflict() {
        let mut runtime = MockRuntime::new();
        mock_package(&mut runtime);
        mock_target_file(&mut runtime, ".bashrc");
        mock_target_absent(&mut runtime, ".profile");

        let plan = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Abort,
        )
        .unwrap();

        // One conflict poisons the whole plan, including the clean file
        assert!(plan.aborted);
        let conflicts = plan.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::File);
        assert!(matches!(
            plan.actions[0],
            PlannedAction::Conflict {
                disposition: Disposition::Abort,
                ..
            }
        ));
    }

    #[test]
    fn test_install_plan_skip_policy() {
        let mut runtime = MockRuntime::new();
        mock_package(&mut runtime);
        mock_target_file(&mut runtime, ".bashrc");
        mock_target_absent(&mut runtime, ".profile");

        let plan = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Skip,
        )
        .unwrap();

        assert!(!plan.aborted);
        assert!(matches!(
            plan.actions[0],
            PlannedAction::Conflict {
                disposition: Disposition::Skip,
                ..
            }
        ));
        assert!(matches!(plan.actions[1], PlannedAction::CreateLink(_)));
    }

    #[test]
    fn test_install_plan_force_replaces_file_but_never_directory() {
        let mut runtime = MockRuntime::new();
        mock_package(&mut runtime);
        mock_target_file(&mut runtime, ".bashrc");

        // .profile's target is a directory
        let profile_target = PathBuf::from(TARGET).join(".profile");
        runtime
            .expect_is_symlink()
            .with(eq(profile_target.clone()))
            .returning(|_| false);
        runtime
            .expect_is_dir()
            .with(eq(profile_target))
            .returning(|_| true);

        let plan = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Force,
        )
        .unwrap();

        assert!(!plan.aborted);
        assert!(matches!(
            plan.actions[0],
            PlannedAction::Conflict {
                kind: ConflictKind::File,
                disposition: Disposition::Replace,
                ..
            }
        ));
        assert!(matches!(
            plan.actions[1],
            PlannedAction::Conflict {
                kind: ConflictKind::Directory,
                disposition: Disposition::Skip,
                ..
            }
        ));
    }

    #[test]
    fn test_install_plan_idempotent_reinstall() {
        let mut runtime = MockRuntime::new();
        mock_package(&mut runtime);

        // Both targets already hold the correct links
        for file in [".bashrc", ".profile"] {
            let target = PathBuf::from(TARGET).join(file);
            let text = PathBuf::from("../../dots/shell").join(file);
            runtime
                .expect_is_symlink()
                .with(eq(target.clone()))
                .returning(|_| true);
            runtime
                .expect_read_link()
                .with(eq(target))
                .returning(move |_| Ok(text.clone()));
        }

        let plan = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Abort,
        )
        .unwrap();

        assert!(!plan.aborted);
        assert!(
            plan.actions
                .iter()
                .all(|a| matches!(a, PlannedAction::SkipExisting(_)))
        );
    }

    #[test]
    fn test_install_plan_rejects_same_name_different_directory() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from(PACKAGE_ROOT);
        runtime
            .expect_canonicalize()
            .with(eq(root.clone()))
            .returning(|p| Ok(p.to_path_buf()));
        runtime.expect_is_dir().with(eq(root)).returning(|_| true);

        let mut registry = Registry::default();
        registry.upsert(RegistryEntry {
            name: "shell".into(),
            package_dir: PathBuf::from("/other/shell"),
            target_dir: PathBuf::from(TARGET),
            links: BTreeMap::new(),
            installed_at: "2025-01-01T00:00:00Z".into(),
        });

        let err = build_install_plan(
            &runtime,
            &registry,
            Path::new(PACKAGE_ROOT),
            Path::new(TARGET),
            ConflictPolicy::Abort,
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DotlinkError>(),
            Some(DotlinkError::PackageAlreadyInstalled { .. })
        ));
    }

    #[test]
    fn test_install_plan_rejects_target_inside_package() {
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from(PACKAGE_ROOT);
        runtime
            .expect_canonicalize()
            .with(eq(root.clone()))
            .returning(|p| Ok(p.to_path_buf()));
        runtime.expect_is_dir().with(eq(root)).returning(|_| true);

        let err = build_install_plan(
            &runtime,
            &Registry::default(),
            Path::new(PACKAGE_ROOT),
            Path::new("/dots/shell/sub"),
            ConflictPolicy::Abort,
        )
        .unwrap_err();

        assert!(err.to_string().contains("package directory"));
    }

    fn registered_shell() -> Registry {
        let mut links = BTreeMap::new();
        for (target, source) in [
            ("/home/user/.bashrc", "../../dots/shell/.bashrc"),
            ("/home/user/.profile", "../../dots/shell/.profile"),
        ] {
            links.insert(
                PathBuf::from(target),
                LinkRecord {
                    target_path: PathBuf::from(target),
                    source_path: PathBuf::from(source),
                },
            );
        }
        let mut registry = Registry::default();
        registry.upsert(RegistryEntry {
            name: "shell".into(),
            package_dir: PathBuf::from(PACKAGE_ROOT),
            target_dir: PathBuf::from(TARGET),
            links,
            installed_at: "2025-01-01T00:00:00Z".into(),
        });
        registry
    }

    #[test]
    fn test_uninstall_plan_removes_owned_links() {
        let mut runtime = MockRuntime::new();

        for file in [".bashrc", ".profile"] {
            let target = PathBuf::from(TARGET).join(file);
            let text = PathBuf::from("../../dots/shell").join(file);
            runtime
                .expect_is_symlink()
                .with(eq(target.clone()))
                .returning(|_| true);
            runtime
                .expect_read_link()
                .with(eq(target))
                .returning(move |_| Ok(text.clone()));
        }

        let plan = build_uninstall_plan(&runtime, &registered_shell(), "shell").unwrap();

        assert_eq!(plan.package_name, "shell");
        assert_eq!(plan.actions.len(), 2);
        assert!(
            plan.actions
                .iter()
                .all(|a| matches!(a, PlannedAction::RemoveLink(_)))
        );
    }

    #[test]
    fn test_uninstall_plan_drops_stale_records() {
        let mut runtime = MockRuntime::new();

        // .bashrc was replaced by a real file; .profile vanished entirely
        let bashrc = PathBuf::from(TARGET).join(".bashrc");
        runtime
            .expect_is_symlink()
            .with(eq(bashrc.clone()))
            .returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(bashrc))
            .returning(|_| true);

        let profile = PathBuf::from(TARGET).join(".profile");
        runtime
            .expect_is_symlink()
            .with(eq(profile.clone()))
            .returning(|_| false);
        runtime
            .expect_exists()
            .with(eq(profile))
            .returning(|_| false);

        let plan = build_uninstall_plan(&runtime, &registered_shell(), "shell").unwrap();

        assert!(matches!(
            plan.actions[0],
            PlannedAction::RemoveMissing {
                reason: StaleReason::NotOwned,
                ..
            }
        ));
        assert!(matches!(
            plan.actions[1],
            PlannedAction::RemoveMissing {
                reason: StaleReason::TargetMissing,
                ..
            }
        ));
    }

    #[test]
    fn test_uninstall_plan_retargeted_link_left_alone() {
        let mut runtime = MockRuntime::new();

        for file in [".bashrc", ".profile"] {
            let target = PathBuf::from(TARGET).join(file);
            runtime
                .expect_is_symlink()
                .with(eq(target.clone()))
                .returning(|_| true);
            runtime
                .expect_read_link()
                .with(eq(target))
                .returning(|_| Ok(PathBuf::from("/somewhere/else")));
        }

        let plan = build_uninstall_plan(&runtime, &registered_shell(), "shell").unwrap();

        assert!(plan.actions.iter().all(|a| matches!(
            a,
            PlannedAction::RemoveMissing {
                reason: StaleReason::NotOwned,
                ..
            }
        )));
    }

    #[test]
    fn test_uninstall_plan_unknown_package() {
        let runtime = MockRuntime::new();

        let err = build_uninstall_plan(&runtime, &Registry::default(), "ghost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DotlinkError>(),
            Some(DotlinkError::UnregisteredPackage { .. })
        ));
    }
}
