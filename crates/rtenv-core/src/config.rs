use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use rtenv_platform::{EnvSnapshot, PathsError, RtenvPaths};

/// What happens when a hook callback fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPolicy {
    /// Log the failure and keep running the remaining hooks.
    #[default]
    BestEffort,
    /// Stop at the first failure and report it to the caller.
    AbortOnError,
}

/// How the resolver picks the highest of several matching definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionOrder {
    /// Take the last match in the builder's listing order.
    #[default]
    Catalog,
    /// Compare candidates as semantic versions.
    Semantic,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Paths(#[from] PathsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub builder: Option<PathBuf>,

    #[serde(default)]
    pub hook_policy: HookPolicy,

    #[serde(default)]
    pub selection_order: SelectionOrder,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default)]
    pub hook_paths: Vec<PathBuf>,
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            builder: None,
            hook_policy: HookPolicy::default(),
            selection_order: SelectionOrder::default(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            hook_paths: Vec::new(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Like [`Settings::load_from`], but falls back to the defaults when the
    /// file is unreadable. The error is handed back so the caller can report
    /// it once logging is up.
    #[must_use]
    pub fn load_or_default(paths: &RtenvPaths) -> (Self, Option<SettingsError>) {
        match Self::load_from(&paths.settings_file()) {
            Ok(settings) => (settings, None),
            Err(error) => (Self::default(), Some(error)),
        }
    }
}

/// Everything a component needs to know about its surroundings.
///
/// Built once per process from the environment snapshot and the settings
/// file, then passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: RtenvPaths,
    pub env: EnvSnapshot,
    pub settings: Settings,
    pub executable: PathBuf,
}

impl Config {
    /// Assemble the configuration for the current user, along with the
    /// error from an ignored settings file, if any.
    ///
    /// # Errors
    /// Returns an error when the rtenv directories cannot be determined.
    pub fn from_env(env: EnvSnapshot) -> Result<(Self, Option<SettingsError>), SettingsError> {
        let paths = RtenvPaths::new(env.root.clone())?;
        let (settings, ignored) = Settings::load_or_default(&paths);
        Ok((Self::new(paths, env, settings), ignored))
    }

    #[must_use]
    pub fn new(paths: RtenvPaths, env: EnvSnapshot, settings: Settings) -> Self {
        Self {
            paths,
            env,
            settings,
            executable: PathBuf::from("rtenv"),
        }
    }

    /// Path of the running `rtenv` binary, embedded into generated shims.
    #[must_use]
    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = executable;
        self
    }

    #[must_use]
    pub fn version_override(&self) -> Option<&str> {
        self.env.version.as_deref()
    }

    #[must_use]
    pub fn debug_logging(&self) -> bool {
        self.env.debug || self.settings.debug_logging
    }

    /// Where the builder unpacks sources. Kept sources default to
    /// `<root>/sources`; otherwise the builder picks its own location.
    #[must_use]
    pub fn build_root(&self, keep_sources: bool) -> Option<PathBuf> {
        self.env
            .build_root
            .clone()
            .or_else(|| keep_sources.then(|| self.paths.sources_dir()))
    }

    /// Download cache handed to the builder, if one is configured or the
    /// default cache directory exists.
    #[must_use]
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.env.cache_path.clone().or_else(|| {
            let cache = self.paths.cache_dir();
            cache.is_dir().then_some(cache)
        })
    }

    /// Explicit builder location: environment first, then settings.
    #[must_use]
    pub fn builder_override(&self) -> Option<&Path> {
        self.env
            .builder
            .as_deref()
            .or(self.settings.builder.as_deref())
    }

    /// Directories searched for hook scripts, in priority order.
    #[must_use]
    pub fn hook_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .env
            .hook_path
            .iter()
            .chain(self.settings.hook_paths.iter())
            .cloned()
            .collect();

        if let Ok(entries) = std::fs::read_dir(self.paths.plugins_dir()) {
            let mut plugin_dirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path().join("etc").join("rtenv.d"))
                .filter(|dir| dir.is_dir())
                .collect();
            plugin_dirs.sort();
            dirs.extend(plugin_dirs);
        }

        dirs
    }

    /// `PATH` with the shims directory removed, used to find the system
    /// runtime without recursing into our own shims.
    #[must_use]
    pub fn system_search_path(&self) -> Vec<PathBuf> {
        let shims = self.paths.shims_dir();
        self.env
            .path
            .iter()
            .filter(|dir| !same_dir(dir, &shims))
            .cloned()
            .collect()
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use rtenv_platform::{EnvSnapshot, RtenvPaths};

    use super::{Config, HookPolicy, SelectionOrder, Settings, SettingsError};

    fn config(base: &std::path::Path, env: EnvSnapshot) -> Config {
        Config::new(RtenvPaths::under(base), env, Settings::default())
    }

    #[test]
    fn settings_defaults_are_best_effort_and_catalog_ordered() {
        let settings = Settings::default();

        assert_eq!(settings.hook_policy, HookPolicy::BestEffort);
        assert_eq!(settings.selection_order, SelectionOrder::Catalog);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(settings.builder.is_none());
    }

    #[test]
    fn settings_deserialize_kebab_case_policies() {
        let value = json!({
            "hook_policy": "abort-on-error",
            "selection_order": "semantic"
        });

        let settings: Settings =
            serde_json::from_value(value).expect("settings JSON should deserialize");

        assert_eq!(settings.hook_policy, HookPolicy::AbortOnError);
        assert_eq!(settings.selection_order, SelectionOrder::Semantic);
        assert!(!settings.debug_logging);
    }

    #[test]
    fn settings_load_from_missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");

        let settings = Settings::load_from(&temp_dir.path().join("settings.json"))
            .expect("missing settings file is not an error");

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_load_fills_missing_fields_with_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "builder": "/opt/runtime-build/bin/runtime-build", "hook_policy": "abort-on-error" }"#,
        )
        .expect("write settings");

        let loaded = Settings::load_from(&path).expect("settings should load");

        assert_eq!(
            loaded,
            Settings {
                builder: Some(PathBuf::from("/opt/runtime-build/bin/runtime-build")),
                hook_policy: HookPolicy::AbortOnError,
                ..Settings::default()
            }
        );
    }

    #[test]
    fn settings_load_from_reports_parse_errors() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("write settings");

        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults_and_report_why() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = RtenvPaths::under(temp_dir.path());
        std::fs::create_dir_all(&paths.config_dir).expect("create config dir");
        std::fs::write(paths.settings_file(), "{ not json").expect("write settings");

        let (settings, ignored) = Settings::load_or_default(&paths);

        assert_eq!(settings, Settings::default());
        assert!(matches!(ignored, Some(SettingsError::Parse { .. })));
    }

    #[test]
    fn build_root_defaults_to_sources_only_when_keeping() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let config = config(temp_dir.path(), EnvSnapshot::default());

        assert_eq!(config.build_root(false), None);
        assert_eq!(config.build_root(true), Some(temp_dir.path().join("sources")));
    }

    #[test]
    fn build_root_environment_override_wins() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let env = EnvSnapshot {
            build_root: Some(PathBuf::from("/scratch/build")),
            ..EnvSnapshot::default()
        };
        let config = config(temp_dir.path(), env);

        assert_eq!(config.build_root(true), Some(PathBuf::from("/scratch/build")));
        assert_eq!(config.build_root(false), Some(PathBuf::from("/scratch/build")));
    }

    #[test]
    fn cache_path_used_only_when_cache_dir_exists() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let config = config(temp_dir.path(), EnvSnapshot::default());

        assert_eq!(config.cache_path(), None);

        std::fs::create_dir_all(temp_dir.path().join("cache")).expect("create cache dir");
        assert_eq!(config.cache_path(), Some(temp_dir.path().join("cache")));
    }

    #[test]
    fn hook_dirs_include_plugin_hook_directories() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let plugin_hooks = temp_dir
            .path()
            .join("plugins")
            .join("doctor")
            .join("etc")
            .join("rtenv.d");
        std::fs::create_dir_all(&plugin_hooks).expect("create plugin hook dir");
        let env = EnvSnapshot {
            hook_path: vec![PathBuf::from("/etc/rtenv.d")],
            ..EnvSnapshot::default()
        };

        let dirs = config(temp_dir.path(), env).hook_dirs();

        assert_eq!(dirs, vec![PathBuf::from("/etc/rtenv.d"), plugin_hooks]);
    }

    #[test]
    fn system_search_path_excludes_shims() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let shims = temp_dir.path().join("shims");
        let env = EnvSnapshot {
            path: vec![shims, PathBuf::from("/usr/bin")],
            ..EnvSnapshot::default()
        };

        let search = config(temp_dir.path(), env).system_search_path();

        assert_eq!(search, vec![PathBuf::from("/usr/bin")]);
    }
}
