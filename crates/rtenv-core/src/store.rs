use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;

use rtenv_backend::{InstallReceipt, InstalledVersion};
use rtenv_platform::RtenvPaths;

/// File written inside a prefix after a successful install.
pub const RECEIPT_FILE: &str = ".rtenv-receipt.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid version name `{name}'")]
    InvalidName { name: String },

    #[error("Version `{name}' is not installed")]
    NotInstalled { name: String },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid install receipt {path}: {source}")]
    Receipt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reject names that are not a single path component.
///
/// # Errors
/// Returns [`StoreError::InvalidName`] for empty names, `.`/`..` and names
/// containing path separators.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The set of runtime versions below `<root>/versions`.
#[derive(Debug, Clone)]
pub struct VersionStore {
    versions_dir: PathBuf,
}

impl VersionStore {
    #[must_use]
    pub fn new(paths: &RtenvPaths) -> Self {
        Self {
            versions_dir: paths.versions_dir(),
        }
    }

    #[must_use]
    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    #[must_use]
    pub fn prefix(&self, name: &str) -> PathBuf {
        self.versions_dir.join(name)
    }

    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.prefix(name).join("bin").is_dir()
    }

    /// Look up one version. Returns `None` when no prefix directory exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<InstalledVersion> {
        validate_name(name).ok()?;
        let prefix = self.prefix(name);
        if !prefix.is_dir() {
            return None;
        }
        Some(self.describe(name, prefix))
    }

    /// Every installed version, semantic versions first in ascending order,
    /// then other names lexically.
    ///
    /// # Errors
    /// Returns an error if the versions directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<InstalledVersion>, StoreError> {
        let entries = match std::fs::read_dir(&self.versions_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io("read", &self.versions_dir, error)),
        };

        let mut versions: Vec<InstalledVersion> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .map(|name| {
                let prefix = self.prefix(&name);
                self.describe(&name, prefix)
            })
            .filter(InstalledVersion::is_installed)
            .collect();

        versions.sort_by(compare_versions);
        log::trace!("Found {} installed versions", versions.len());
        Ok(versions)
    }

    /// Names of installed versions, in [`VersionStore::list`] order.
    ///
    /// # Errors
    /// See [`VersionStore::list`].
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|version| version.name).collect())
    }

    /// Installed versions whose `bin` directory contains `command`.
    ///
    /// # Errors
    /// See [`VersionStore::list`].
    pub fn versions_providing(&self, command: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|version| version.bin_dir().join(command).is_file())
            .map(|version| version.name)
            .collect())
    }

    /// # Errors
    /// Returns an error if the receipt cannot be serialized or written.
    pub fn write_receipt(&self, name: &str, receipt: &InstallReceipt) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.prefix(name).join(RECEIPT_FILE);
        let content = serde_json::to_string_pretty(receipt).map_err(|source| {
            StoreError::Receipt {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, content).map_err(|error| StoreError::io("write", &path, error))
    }

    /// # Errors
    /// Returns an error if a receipt exists but cannot be read or parsed.
    pub fn read_receipt(&self, name: &str) -> Result<Option<InstallReceipt>, StoreError> {
        validate_name(name)?;
        let path = self.prefix(name).join(RECEIPT_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StoreError::io("read", &path, error)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Receipt { path, source })
    }

    /// Delete a prefix and everything in it.
    ///
    /// # Errors
    /// Returns [`StoreError::NotInstalled`] when no prefix exists, or the
    /// I/O error from the removal.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let prefix = self.prefix(name);
        if !prefix.is_dir() {
            return Err(StoreError::NotInstalled {
                name: name.to_string(),
            });
        }
        std::fs::remove_dir_all(&prefix).map_err(|error| StoreError::io("remove", &prefix, error))?;
        log::info!("Removed {}", prefix.display());
        Ok(())
    }

    fn describe(&self, name: &str, prefix: PathBuf) -> InstalledVersion {
        let receipt = match self.read_receipt(name) {
            Ok(receipt) => receipt,
            Err(error) => {
                log::warn!("{error}");
                None
            }
        };
        InstalledVersion {
            name: name.to_string(),
            has_bin: prefix.join("bin").is_dir(),
            prefix,
            receipt,
        }
    }
}

fn compare_versions(a: &InstalledVersion, b: &InstalledVersion) -> Ordering {
    match (a.runtime_version(), b.runtime_version()) {
        (Some(left), Some(right)) => left
            .cmp(&right)
            .then_with(|| a.is_debug().cmp(&b.is_debug())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}
