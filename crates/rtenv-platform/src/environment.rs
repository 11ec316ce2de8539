use std::ffi::OsString;
use std::path::PathBuf;

/// Names of the environment variables rtenv reads.
pub mod vars {
    pub const ROOT: &str = "RTENV_ROOT";
    pub const BUILD_ROOT: &str = "RTENV_BUILD_ROOT";
    pub const CACHE_PATH: &str = "RTENV_CACHE_PATH";
    pub const DEBUG: &str = "RTENV_DEBUG";
    pub const VERSION_FILE: &str = "RTENV_VERSION_FILE";
    pub const VERSION: &str = "RTENV_VERSION";
    pub const DIR: &str = "RTENV_DIR";
    pub const HOOK_PATH: &str = "RTENV_HOOK_PATH";
    pub const BUILDER: &str = "RTENV_BUILDER";
}

/// The process environment as rtenv sees it, captured once at startup.
///
/// Components never read `std::env` themselves; they receive the values
/// they need through the configuration built from this snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub root: Option<PathBuf>,
    pub build_root: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub debug: bool,
    pub version_file: Option<PathBuf>,
    pub version: Option<String>,
    pub dir: Option<PathBuf>,
    pub hook_path: Vec<PathBuf>,
    pub builder: Option<PathBuf>,
    pub path: Vec<PathBuf>,
    pub current_dir: PathBuf,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// # Errors
    /// Returns an error if the current directory cannot be determined.
    pub fn capture() -> std::io::Result<Self> {
        let current_dir = std::env::current_dir()?;
        Ok(Self::from_lookup(|key| std::env::var_os(key), current_dir))
    }

    /// Build a snapshot from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, current_dir: PathBuf) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let path_var = |key: &str| non_empty(key).map(PathBuf::from);
        let list_var = |key: &str| {
            non_empty(key)
                .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
                .unwrap_or_default()
        };

        let snapshot = Self {
            root: path_var(vars::ROOT),
            build_root: path_var(vars::BUILD_ROOT),
            cache_path: path_var(vars::CACHE_PATH),
            debug: non_empty(vars::DEBUG).is_some_and(|value| is_truthy(&value)),
            version_file: path_var(vars::VERSION_FILE),
            version: non_empty(vars::VERSION).map(|value| value.to_string_lossy().into_owned()),
            dir: path_var(vars::DIR),
            hook_path: list_var(vars::HOOK_PATH),
            builder: path_var(vars::BUILDER),
            path: list_var("PATH"),
            current_dir,
        };

        log::trace!("Captured environment: {snapshot:?}");
        snapshot
    }

    /// Directory the local version-file search starts from.
    #[must_use]
    pub fn search_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| self.current_dir.clone())
    }
}

fn is_truthy(value: &OsString) -> bool {
    !matches!(
        value.to_string_lossy().trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
