//! Plan data model.
//!
//! A plan is pure data: an ordered list of [`PlannedAction`] with a resolved
//! [`Disposition`] for every conflict, computed before any mutation occurs.
//! Building one reads the filesystem (`lstat`-style) but never writes to it
//! and never touches the registry.

mod builder;
mod classify;

pub use builder::{build_install_plan, build_uninstall_plan};
pub use classify::{RemovalState, TargetState, classify_removal, classify_target};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConflictInfo;
use crate::runtime::relative_link_target;

/// A symlink the engine manages: where it lives and what it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Where the symlink is (or would be) created; absolute
    pub target_path: PathBuf,
    /// The package file the symlink points to; absolute
    pub source_path: PathBuf,
}

impl Link {
    pub fn new(target_path: PathBuf, source_path: PathBuf) -> Self {
        Self {
            target_path,
            source_path,
        }
    }

    /// The text written into the symlink: the source expressed relative to
    /// the link's containing directory, so the link survives moving the
    /// whole tree as a unit. Falls back to the absolute source when no
    /// relative path exists (different drives on Windows).
    pub fn link_text(&self) -> PathBuf {
        relative_link_target(&self.target_path, &self.source_path)
            .unwrap_or_else(|| self.source_path.clone())
    }
}

/// What is currently occupying a conflicting target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A symlink pointing somewhere else, including a dangling one
    Symlink,
    /// A regular (non-symlink) file
    File,
    /// A directory; never replaceable under any policy
    Directory,
}

impl ConflictKind {
    /// Directories are never replaced by a symlink, under any policy.
    pub fn is_replaceable(&self) -> bool {
        !matches!(self, ConflictKind::Directory)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Symlink => write!(f, "symlink"),
            ConflictKind::File => write!(f, "file"),
            ConflictKind::Directory => write!(f, "directory"),
        }
    }
}

/// How to handle conflicting files when installing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Abort the whole plan if any conflict exists
    #[default]
    Abort,
    /// Skip conflicting targets, install the rest
    Skip,
    /// Replace conflicting files and symlinks (never directories)
    Force,
}

/// Resolved fate of a single conflict, decided at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The whole plan aborts; nothing is executed
    Abort,
    /// This target is left alone; other actions proceed
    Skip,
    /// The obstruction is removed and the link created in its place
    Replace,
}

/// Why a registry record is dropped without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// Nothing exists at the recorded target path anymore
    TargetMissing,
    /// Something exists, but it is no longer the symlink we created
    /// (retargeted by hand, or replaced by a file or directory)
    NotOwned,
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Create a symlink at a currently-absent target path
    CreateLink(Link),
    /// Target already holds the correct symlink; no-op, still owned
    SkipExisting(Link),
    /// Something else occupies the target path
    Conflict {
        link: Link,
        kind: ConflictKind,
        /// Where the existing symlink points, verbatim (symlink kind only)
        points_to: Option<PathBuf>,
        disposition: Disposition,
    },
    /// Remove a symlink we own (uninstall only)
    RemoveLink(Link),
    /// Drop a stale registry record without touching the filesystem
    /// (uninstall only)
    RemoveMissing {
        target_path: PathBuf,
        reason: StaleReason,
    },
}

impl PlannedAction {
    pub fn target_path(&self) -> &Path {
        match self {
            PlannedAction::CreateLink(link)
            | PlannedAction::SkipExisting(link)
            | PlannedAction::RemoveLink(link)
            | PlannedAction::Conflict { link, .. } => &link.target_path,
            PlannedAction::RemoveMissing { target_path, .. } => target_path,
        }
    }
}

/// Side-effect-free description of what an install would do.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub package_name: String,
    pub package_dir: PathBuf,
    pub target_dir: PathBuf,
    pub policy: ConflictPolicy,
    pub actions: Vec<PlannedAction>,
    /// True when the abort policy met one or more conflicts; the executor
    /// performs nothing for an aborted plan
    pub aborted: bool,
}

impl InstallPlan {
    /// Every conflict in the plan, in action order.
    pub fn conflicts(&self) -> Vec<ConflictInfo> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                PlannedAction::Conflict { link, kind, .. } => Some(ConflictInfo {
                    path: link.target_path.clone(),
                    kind: *kind,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_conflicts(&self) -> bool {
        self.actions
            .iter()
            .any(|action| matches!(action, PlannedAction::Conflict { .. }))
    }
}

/// Side-effect-free description of what an uninstall would do.
#[derive(Debug, Clone)]
pub struct UninstallPlan {
    pub package_name: String,
    pub target_dir: PathBuf,
    pub actions: Vec<PlannedAction>,
}
