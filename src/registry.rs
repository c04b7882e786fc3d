//! Persistent registry of installed packages.
//!
//! The registry is the source of truth for *intent*: which symlinks each
//! package currently owns, recorded at install time and consulted at
//! uninstall time. It survives independently of the package directory and
//! never assumes the filesystem still matches its records.
//!
//! Each invocation loads the registry once, mutates an in-memory copy, and
//! persists the whole mapping once; there is no ambient state.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::DotlinkError;
use crate::runtime::Runtime;

pub const REGISTRY_VERSION: u32 = 1;

/// One symlink a package owns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Where the symlink lives; absolute
    pub target_path: PathBuf,
    /// The exact text written into the symlink, relative to the link's
    /// parent directory. Kept relative so the record stays meaningful when
    /// the package directory moves or disappears.
    pub source_path: PathBuf,
}

/// Record of an installed package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub name: String,
    /// Package directory the entry was installed from
    pub package_dir: PathBuf,
    /// Directory the symlinks were installed into
    pub target_dir: PathBuf,
    /// Owned links, keyed by target path (unique within the entry)
    pub links: BTreeMap<PathBuf, LinkRecord>,
    /// UTC RFC 3339 timestamp of the last install
    pub installed_at: String,
}

/// Registry of all installed packages, persisted as a whole on every mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub version: u32,
    pub packages: BTreeMap<String, RegistryEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            version: REGISTRY_VERSION,
            packages: BTreeMap::new(),
        }
    }
}

impl Registry {
    /// Default per-user registry location: `<state dir>/dotlink/registry.json`.
    pub fn default_path<R: Runtime>(runtime: &R) -> Result<PathBuf> {
        runtime
            .state_dir()
            .map(|dir| dir.join("dotlink").join("registry.json"))
            .context("Could not determine a user state directory for the registry")
    }

    /// Load the registry from `path`. An absent file is an empty registry,
    /// not an error; an unreadable or future-versioned file surfaces
    /// [`DotlinkError::RegistryCorrupt`] rather than being silently reset,
    /// which would orphan real symlinks.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No registry at {:?}, starting empty", path);
            return Ok(Registry::default());
        }

        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read registry from {:?}", path))?;

        let registry: Registry =
            serde_json::from_str(&content).map_err(|e| DotlinkError::RegistryCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if registry.version > REGISTRY_VERSION {
            return Err(DotlinkError::RegistryCorrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "registry version {} is newer than supported version {}",
                    registry.version, REGISTRY_VERSION
                ),
            }
            .into());
        }

        debug!("Loaded {} package(s) from {:?}", registry.packages.len(), path);
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.packages.get(name)
    }

    /// Insert or replace a package entry wholesale. Install always recomputes
    /// the full set of links a package owns, so there is no partial merge.
    pub fn upsert(&mut self, entry: RegistryEntry) {
        self.packages.insert(entry.name.clone(), entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<RegistryEntry> {
        self.packages.remove(name)
    }

    /// Persist the whole registry atomically: write to a temp file in the
    /// same directory, then rename over the destination, so a crash never
    /// leaves a half-written or zero-length registry behind.
    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !runtime.exists(parent)
        {
            runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to encode registry")?;
        let temp_path = path.with_extension("tmp");

        runtime
            .write(&temp_path, content.as_bytes())
            .with_context(|| format!("Failed to write registry to {:?}", temp_path))?;
        runtime
            .rename(&temp_path, path)
            .with_context(|| format!("Failed to move registry into place at {:?}", path))
    }
}
