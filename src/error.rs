//! Error kinds surfaced by the planning and execution engine.

use std::path::PathBuf;

use crate::plan::ConflictKind;

/// A conflicting target path, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    /// Full path to the conflicting entry in the target directory
    pub path: PathBuf,
    /// What is sitting there
    pub kind: ConflictKind,
}

#[derive(Debug, thiserror::Error)]
pub enum DotlinkError {
    #[error("package directory does not exist or is not a directory: {}", .path.display())]
    PackageNotFound { path: PathBuf },

    #[error(
        "package '{name}' is already installed from {}, not {}; uninstall it first",
        .existing.display(),
        .requested.display()
    )]
    PackageAlreadyInstalled {
        name: String,
        existing: PathBuf,
        requested: PathBuf,
    },

    #[error("registry file {} is unreadable: {reason}", .path.display())]
    RegistryCorrupt { path: PathBuf, reason: String },

    #[error("conflicts detected: {}", summarize_conflicts(.conflicts))]
    ConflictDetected { conflicts: Vec<ConflictInfo> },

    #[error("package '{name}' is not registered; reinstall it to rebuild its registry entry")]
    UnregisteredPackage { name: String },
}

/// First few conflicting paths plus a total, to keep the one-line message short.
fn summarize_conflicts(conflicts: &[ConflictInfo]) -> String {
    let mut summary = conflicts
        .iter()
        .take(3)
        .map(|c| c.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if conflicts.len() > 3 {
        summary.push_str(&format!(", ... ({} total)", conflicts.len()));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(path: &str, kind: ConflictKind) -> ConflictInfo {
        ConflictInfo {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn test_conflict_detected_short_list() {
        let err = DotlinkError::ConflictDetected {
            conflicts: vec![
                conflict("/home/user/.bashrc", ConflictKind::File),
                conflict("/home/user/.vimrc", ConflictKind::Symlink),
            ],
        };
        assert_eq!(
            err.to_string(),
            "conflicts detected: /home/user/.bashrc, /home/user/.vimrc"
        );
    }

    #[test]
    fn test_conflict_detected_truncates_long_list() {
        let conflicts = (0..5)
            .map(|i| conflict(&format!("/home/user/.file{i}"), ConflictKind::File))
            .collect();
        let err = DotlinkError::ConflictDetected { conflicts };
        let message = err.to_string();
        assert!(message.contains("/home/user/.file2"));
        assert!(!message.contains("/home/user/.file3"));
        assert!(message.contains("(5 total)"));
    }

    #[test]
    fn test_unregistered_package_mentions_workaround() {
        let err = DotlinkError::UnregisteredPackage {
            name: "shell".to_string(),
        };
        assert!(err.to_string().contains("reinstall"));
    }
}
