use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Directory layout of one rtenv installation.
///
/// Everything rtenv manages lives under `root`; `config_dir` and `data_dir`
/// hold the user's settings and the debug log and are shared by every root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtenvPaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl RtenvPaths {
    /// Build the layout for the current user.
    ///
    /// `root_override` is the value of `RTENV_ROOT`, if set.
    ///
    /// # Errors
    /// Returns an error when a required base directory (home, config or data
    /// directory) cannot be determined.
    pub fn new(root_override: Option<PathBuf>) -> Result<Self, PathsError> {
        let root = match root_override {
            Some(root) => root,
            None => dirs::home_dir()
                .ok_or(PathsError::HomeDirUnavailable)?
                .join(".rtenv"),
        };

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().ok_or(PathsError::HomeDirUnavailable)?;
            Ok(Self {
                root,
                config_dir: home.join("Library/Application Support/rtenv"),
                data_dir: home.join("Library/Application Support/rtenv"),
            })
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(Self {
                root,
                config_dir: dirs::config_dir()
                    .ok_or(PathsError::ConfigDirUnavailable)?
                    .join("rtenv"),
                data_dir: dirs::data_dir()
                    .ok_or(PathsError::DataDirUnavailable)?
                    .join("rtenv"),
            })
        }
    }

    /// Layout rooted entirely below `base`. Used by tests and by callers
    /// that want a self-contained installation.
    #[must_use]
    pub fn under(base: &Path) -> Self {
        Self {
            root: base.to_path_buf(),
            config_dir: base.join("config"),
            data_dir: base.join("data"),
        }
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[must_use]
    pub fn version_prefix(&self, name: &str) -> PathBuf {
        self.versions_dir().join(name)
    }

    #[must_use]
    pub fn shims_dir(&self) -> PathBuf {
        self.root.join("shims")
    }

    #[must_use]
    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }

    #[must_use]
    pub fn global_version_file(&self) -> PathBuf {
        self.root.join("version")
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// Ensure the directories rtenv writes into exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.versions_dir())?;
        std::fs::create_dir_all(self.shims_dir())?;
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
