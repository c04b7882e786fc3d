//! Conflict classification.
//!
//! Inspects the current filesystem state of a prospective target path without
//! following the final symlink component, and decides what an install or
//! uninstall may do with it. Link correctness is a lexical comparison of the
//! existing link text's resolution against the expected source; the link
//! target itself is never stat'ed.

use std::path::PathBuf;

use crate::plan::Link;
use crate::runtime::path::normalize_path;
use crate::runtime::{Runtime, resolve_relative_path};

/// Install-side state of a candidate target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    /// Nothing exists at the path
    Absent,
    /// A symlink exists and already resolves to the expected source
    CorrectLink,
    /// A symlink exists but resolves elsewhere, or is unreadable;
    /// dangling links land here too
    WrongLink { points_to: Option<PathBuf> },
    /// A non-symlink file exists
    RegularFile,
    /// A directory exists
    Directory,
}

/// Uninstall-side state of a registered target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalState {
    /// The symlink we created is still in place; safe to remove
    Owned,
    /// Nothing exists at the recorded path; the record is stale
    Missing,
    /// Something exists but it is not our symlink anymore; leave it alone
    NotOwned,
}

/// Classify what currently occupies `link.target_path` for install planning.
pub fn classify_target<R: Runtime>(runtime: &R, link: &Link) -> TargetState {
    if runtime.is_symlink(&link.target_path) {
        match runtime.read_link(&link.target_path) {
            Ok(text) => {
                if points_to_source(link, &text) {
                    TargetState::CorrectLink
                } else {
                    TargetState::WrongLink {
                        points_to: Some(text),
                    }
                }
            }
            Err(_) => TargetState::WrongLink { points_to: None },
        }
    } else if runtime.is_dir(&link.target_path) {
        TargetState::Directory
    } else if runtime.exists(&link.target_path) {
        TargetState::RegularFile
    } else {
        TargetState::Absent
    }
}

/// Classify what currently occupies a registered target path for uninstall
/// planning. Only a symlink that still resolves to the recorded source is
/// ours to remove; anything else means the user took the path over.
pub fn classify_removal<R: Runtime>(runtime: &R, link: &Link) -> RemovalState {
    if runtime.is_symlink(&link.target_path) {
        match runtime.read_link(&link.target_path) {
            Ok(text) if points_to_source(link, &text) => RemovalState::Owned,
            _ => RemovalState::NotOwned,
        }
    } else if runtime.exists(&link.target_path) {
        RemovalState::NotOwned
    } else {
        RemovalState::Missing
    }
}

/// Whether symlink text found at `link.target_path` denotes `link.source_path`.
/// Both sides are resolved lexically so relative and absolute spellings of
/// the same location compare equal.
fn points_to_source(link: &Link, text: &std::path::Path) -> bool {
    let Some(parent) = link.target_path.parent() else {
        return false;
    };
    resolve_relative_path(parent, text) == normalize_path(&link.source_path)
}
