//! Human-readable rendering of plans and execution summaries.

use std::path::Path;

use crate::error::ConflictInfo;
use crate::executor::{ActionOutcome, ExecutionReport};
use crate::plan::{
    ConflictKind, Disposition, InstallPlan, PlannedAction, StaleReason, UninstallPlan,
};

/// Print the detail sections of an install plan.
pub fn print_install_plan(plan: &InstallPlan, dry_run: bool, home: Option<&Path>) {
    let create_header = if dry_run {
        "Would create symlinks:"
    } else {
        "Creating symlinks:"
    };
    let replace_header = if dry_run {
        "Would replace files/symlinks:"
    } else {
        "Replacing files/symlinks:"
    };

    let mut creates = Vec::new();
    let mut replaces = Vec::new();
    let mut correct = Vec::new();
    let mut skips = Vec::new();

    for action in &plan.actions {
        match action {
            PlannedAction::CreateLink(link) => creates.push(format!(
                "  {} -> {}",
                display_path(&link.target_path, home),
                display_path(&link.source_path, home)
            )),
            PlannedAction::SkipExisting(link) => correct.push(format!(
                "  {} -> {}",
                display_path(&link.target_path, home),
                display_path(&link.source_path, home)
            )),
            PlannedAction::Conflict {
                link,
                kind,
                disposition,
                ..
            } => match disposition {
                Disposition::Replace => replaces.push(format!(
                    "  {} -> {}",
                    display_path(&link.target_path, home),
                    display_path(&link.source_path, home)
                )),
                _ => skips.push(format!(
                    "  {} ({})",
                    display_path(&link.target_path, home),
                    kind
                )),
            },
            _ => {}
        }
    }

    print_section(create_header, &creates);
    print_section(replace_header, &replaces);
    print_section("Already correct:", &correct);
    if !plan.aborted {
        print_section("Skipping (conflicts):", &skips);
    }
}

/// Print per-action failures and the final install summary line.
pub fn print_install_summary(plan: &InstallPlan, report: &ExecutionReport, dry_run: bool) {
    print_failures(report);

    let mut parts = Vec::new();
    let created = report.created();
    if created > 0 {
        let verb = if dry_run { "would be created" } else { "created" };
        parts.push(format!("{} symlink{} {}", created, plural(created), verb));
    }
    if report.replaced() > 0 {
        let verb = if dry_run { "would be replaced" } else { "replaced" };
        parts.push(format!("{} {}", report.replaced(), verb));
    }
    if report.already_correct() > 0 {
        parts.push(format!("{} already correct", report.already_correct()));
    }
    if report.skipped_conflicts() > 0 {
        parts.push(format!("{} skipped (conflict)", report.skipped_conflicts()));
    }
    if report.failed() > 0 {
        parts.push(format!("{} failed", report.failed()));
    }

    let summary = if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    };
    let action = if dry_run { "Would install" } else { "Installed" };
    println!("{} {} ({})", action, plan.package_name, summary);
}

/// Print the detail sections of an uninstall plan.
pub fn print_uninstall_plan(plan: &UninstallPlan, dry_run: bool, home: Option<&Path>) {
    let remove_header = if dry_run {
        "Would remove symlinks:"
    } else {
        "Removing symlinks:"
    };

    let mut removes = Vec::new();
    let mut missing = Vec::new();
    let mut modified = Vec::new();

    for action in &plan.actions {
        match action {
            PlannedAction::RemoveLink(link) => {
                removes.push(format!("  {}", display_path(&link.target_path, home)));
            }
            PlannedAction::RemoveMissing { target_path, reason } => {
                let line = format!("  {}", display_path(target_path, home));
                match reason {
                    StaleReason::TargetMissing => missing.push(line),
                    StaleReason::NotOwned => modified.push(line),
                }
            }
            _ => {}
        }
    }

    print_section(remove_header, &removes);
    print_section("Missing:", &missing);
    print_section("Skipped (modified):", &modified);
}

/// Print per-action failures and the final uninstall summary line.
pub fn print_uninstall_summary(plan: &UninstallPlan, report: &ExecutionReport, dry_run: bool) {
    print_failures(report);

    let removed = report.removed();
    let verb = if dry_run { "would be removed" } else { "removed" };
    let mut parts = vec![format!("{} symlink{} {}", removed, plural(removed), verb)];

    let (mut missing, mut modified) = (0usize, 0usize);
    for outcome in &report.outcomes {
        if let ActionOutcome::DroppedRecord { reason, .. } = outcome {
            match reason {
                StaleReason::TargetMissing => missing += 1,
                StaleReason::NotOwned => modified += 1,
            }
        }
    }
    if missing > 0 {
        parts.push(format!("{} missing", missing));
    }
    if modified > 0 {
        parts.push(format!("{} skipped (modified)", modified));
    }
    if report.failed() > 0 {
        parts.push(format!("{} failed", report.failed()));
    }

    let action = if dry_run { "Would uninstall" } else { "Uninstalled" };
    println!("{} {} ({})", action, plan.package_name, parts.join(", "));
}

/// Print the conflicting paths of an aborted plan to stderr, with a
/// remediation hint.
pub fn print_conflicts(conflicts: &[ConflictInfo], home: Option<&Path>) {
    eprintln!("Conflicts detected:");
    for conflict in conflicts {
        eprintln!("  {} ({})", display_path(&conflict.path, home), conflict.kind);
    }

    let has_directories = conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::Directory);
    if has_directories {
        eprintln!();
        eprintln!("Directory conflicts require manual resolution (cannot be forced)");
    } else {
        eprintln!();
        eprintln!("Run with --on-conflict=skip or --on-conflict=force");
    }
}

fn print_failures(report: &ExecutionReport) {
    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ActionOutcome::Failed { target_path, error } => Some((target_path, error)),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        eprintln!("Failed actions:");
        for (path, error) in failures {
            eprintln!("  {}: {}", path.display(), error);
        }
    }
}

fn print_section(header: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!("{}", header);
    for line in lines {
        println!("{}", line);
    }
}

/// Format a path for display, abbreviating the home directory to `~`.
pub fn display_path(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home
        && let Ok(relative) = path.strip_prefix(home)
    {
        return format!("~/{}", relative.display());
    }
    path.display().to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_display_path_abbreviates_home() {
        let home = PathBuf::from("/home/user");
        assert_eq!(
            display_path(Path::new("/home/user/.bashrc"), Some(&home)),
            "~/.bashrc"
        );
    }

    #[test]
    fn test_display_path_outside_home() {
        let home = PathBuf::from("/home/user");
        assert_eq!(
            display_path(Path::new("/etc/profile"), Some(&home)),
            "/etc/profile"
        );
    }

    #[test]
    fn test_display_path_no_home() {
        assert_eq!(
            display_path(Path::new("/home/user/.bashrc"), None),
            "/home/user/.bashrc"
        );
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(2), "s");
    }
}
