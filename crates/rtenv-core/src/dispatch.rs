use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use rtenv_platform::vars;

use crate::config::Config;
use crate::hooks::{HookContext, HookError, HookPhase, HookRegistry};
use crate::resolver::Resolver;
use crate::store::{StoreError, VersionStore};
use crate::version_file::{VersionFile, find_local_version_file, parse_override};

/// Name that selects whatever runtime is on `PATH` outside rtenv.
pub const SYSTEM_VERSION: &str = "system";

/// Where the active version was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOrigin {
    Environment,
    LocalFile(PathBuf),
    GlobalFile(PathBuf),
    System,
}

impl fmt::Display for VersionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "{} environment variable", vars::VERSION),
            Self::LocalFile(path) | Self::GlobalFile(path) => write!(f, "{}", path.display()),
            Self::System => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVersion {
    pub name: String,
    pub origin: VersionOrigin,
}

impl ActiveVersion {
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_VERSION
    }
}

impl fmt::Display for ActiveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (set by {})", self.name, self.origin)
    }
}

/// The executable a shimmed command resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTarget {
    pub version: ActiveVersion,
    pub path: PathBuf,
    /// `bin` directory to put in front of `PATH`; `None` for `system`.
    pub bin_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No version is set and no system runtime was found on PATH")]
    NoVersionSet,

    #[error("Version `{version}' is not installed (set by {origin})")]
    VersionNotInstalled {
        version: String,
        origin: VersionOrigin,
    },

    #[error("{}", command_not_found_message(.command, .version, .available_in))]
    CommandNotFound {
        command: String,
        version: String,
        available_in: Vec<String>,
    },

    #[error("The system version is not managed by rtenv and has no prefix")]
    SystemHasNoPrefix,

    #[error("Failed to read version file {path}: {message}")]
    VersionFile { path: PathBuf, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

fn command_not_found_message(command: &str, version: &str, available_in: &[String]) -> String {
    let mut message = format!("`{command}': command not found in version `{version}'");
    if !available_in.is_empty() {
        message.push_str(&format!(
            "\n\nThe `{command}' command exists in these versions:\n  {}",
            available_in.join("\n  ")
        ));
    }
    message
}

/// Selects the active version and routes commands to it.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    config: &'a Config,
    store: VersionStore,
    version_override: Option<String>,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            store: VersionStore::new(&config.paths),
            version_override: config.version_override().map(ToString::to_string),
        }
    }

    /// Replace the `RTENV_VERSION` override, as `exec --version` does.
    #[must_use]
    pub fn with_override(mut self, version: Option<String>) -> Self {
        if version.is_some() {
            self.version_override = version;
        }
        self
    }

    /// The version file that applies to the current directory, if any.
    #[must_use]
    pub fn local_version_file(&self) -> Option<PathBuf> {
        self.config
            .env
            .version_file
            .clone()
            .or_else(|| find_local_version_file(&self.config.env.search_dir()))
    }

    /// Determine the active version. The first source that names any
    /// version wins, even if that version turns out not to be installed.
    ///
    /// # Errors
    /// Returns [`DispatchError::VersionNotInstalled`] when the winning
    /// source names only versions that are not installed.
    pub fn active_version(&self) -> Result<ActiveVersion, DispatchError> {
        let installed = self.store.names()?;

        if let Some(value) = &self.version_override {
            let entries = parse_override(value);
            if !entries.is_empty() {
                return self.pick(&entries, VersionOrigin::Environment, &installed);
            }
        }

        if let Some(path) = self.local_version_file() {
            if let Some(entries) = read_entries(&path)? {
                return self.pick(&entries, VersionOrigin::LocalFile(path), &installed);
            }
        }

        let global = self.config.paths.global_version_file();
        if let Some(entries) = read_entries(&global)? {
            return self.pick(&entries, VersionOrigin::GlobalFile(global), &installed);
        }

        Ok(ActiveVersion {
            name: SYSTEM_VERSION.to_string(),
            origin: VersionOrigin::System,
        })
    }

    fn pick(
        &self,
        entries: &[String],
        origin: VersionOrigin,
        installed: &[String],
    ) -> Result<ActiveVersion, DispatchError> {
        let resolver = Resolver::new(installed, self.config.settings.selection_order);

        let usable = entries.iter().find_map(|entry| {
            if entry == SYSTEM_VERSION {
                return Some(entry.clone());
            }
            resolver
                .resolve(entry)
                .ok()
                .filter(|name| self.store.is_installed(name))
        });

        match usable {
            Some(name) => {
                log::debug!("Active version {name} (set by {origin})");
                Ok(ActiveVersion { name, origin })
            }
            None => Err(DispatchError::VersionNotInstalled {
                version: entries.join(":"),
                origin,
            }),
        }
    }

    /// Absolute path of the installed prefix for `version`.
    ///
    /// # Errors
    /// Returns [`DispatchError::SystemHasNoPrefix`] for `system` and
    /// [`DispatchError::VersionNotInstalled`] if the prefix is missing.
    pub fn prefix(&self, version: &ActiveVersion) -> Result<PathBuf, DispatchError> {
        if version.is_system() {
            return Err(DispatchError::SystemHasNoPrefix);
        }
        if !self.store.is_installed(&version.name) {
            return Err(DispatchError::VersionNotInstalled {
                version: version.name.clone(),
                origin: version.origin.clone(),
            });
        }
        Ok(self.store.prefix(&version.name))
    }

    /// Find the executable `command` for the active version.
    ///
    /// # Errors
    /// Returns [`DispatchError::NoVersionSet`] when nothing selected a
    /// version and `command` is not on `PATH`, and
    /// [`DispatchError::CommandNotFound`] when the selected version does
    /// not provide it.
    pub fn resolve_command(&self, command: &str) -> Result<CommandTarget, DispatchError> {
        let version = self.active_version()?;

        if version.is_system() {
            return match self.system_path(command) {
                Some(path) => Ok(CommandTarget {
                    version,
                    path,
                    bin_dir: None,
                }),
                None if version.origin == VersionOrigin::System => {
                    Err(DispatchError::NoVersionSet)
                }
                None => Err(self.command_not_found(command, &version.name)?),
            };
        }

        let bin_dir = self.store.prefix(&version.name).join("bin");
        let path = bin_dir.join(command);
        if !path.is_file() {
            return Err(self.command_not_found(command, &version.name)?);
        }

        log::debug!("Resolved {command} to {}", path.display());
        Ok(CommandTarget {
            version,
            path,
            bin_dir: Some(bin_dir),
        })
    }

    /// Resolve `command`, run `Exec` hooks and build the process to run.
    /// The caller decides whether to replace the current process with it.
    ///
    /// # Errors
    /// Any error of [`Dispatcher::resolve_command`], or a hook failure under
    /// the abort policy.
    pub fn exec_command(
        &self,
        hooks: &HookRegistry,
        command: &str,
        args: &[OsString],
    ) -> Result<Command, DispatchError> {
        let target = self.resolve_command(command)?;

        let context = HookContext {
            version_name: Some(target.version.name.clone()),
            prefix: target
                .bin_dir
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf),
            command: Some(command.to_string()),
            ..HookContext::new(HookPhase::Exec)
        };
        hooks.run(&context)?;

        let mut process = Command::new(&target.path);
        process.args(args);
        process.env(vars::VERSION, &target.version.name);
        if let Some(bin_dir) = &target.bin_dir {
            let search = std::iter::once(bin_dir.clone()).chain(self.config.env.path.iter().cloned());
            if let Ok(path) = std::env::join_paths(search) {
                process.env("PATH", path);
            }
        }

        log::info!(
            "Executing {} {}",
            target.path.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(process)
    }

    fn command_not_found(&self, command: &str, version: &str) -> Result<DispatchError, StoreError> {
        let available_in = self
            .store
            .versions_providing(command)?
            .into_iter()
            .filter(|name| name != version)
            .collect();
        Ok(DispatchError::CommandNotFound {
            command: command.to_string(),
            version: version.to_string(),
            available_in,
        })
    }

    fn system_path(&self, command: &str) -> Option<PathBuf> {
        let search = std::env::join_paths(self.config.system_search_path()).ok()?;
        which::which_in(command, Some(search), &self.config.env.current_dir).ok()
    }
}

fn read_entries(path: &Path) -> Result<Option<Vec<String>>, DispatchError> {
    let file = VersionFile::load_if_exists(path).map_err(|error| DispatchError::VersionFile {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    Ok(file.map(|file| file.entries).filter(|entries| !entries.is_empty()))
}

#[cfg(test)]
mod tests {
    use rtenv_platform::{EnvSnapshot, RtenvPaths};

    use super::*;
    use crate::config::Settings;
    use crate::version_file::LOCAL_VERSION_FILE;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        root: PathBuf,
        project: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
            let root = temp_dir.path().join("root");
            let project = temp_dir.path().join("project");
            std::fs::create_dir_all(&project).expect("create project dir");
            Self {
                _temp_dir: temp_dir,
                root,
                project,
            }
        }

        fn install(&self, name: &str, commands: &[&str]) {
            let bin = self.root.join("versions").join(name).join("bin");
            std::fs::create_dir_all(&bin).expect("create bin dir");
            for command in commands {
                std::fs::write(bin.join(command), "#!/bin/sh\n").expect("write command");
            }
        }

        fn config(&self, env: EnvSnapshot) -> Config {
            let env = EnvSnapshot {
                current_dir: self.project.clone(),
                ..env
            };
            Config::new(RtenvPaths::under(&self.root), env, Settings::default())
        }
    }

    #[test]
    fn falls_back_to_system_when_nothing_is_selected() {
        let fixture = Fixture::new();
        let config = fixture.config(EnvSnapshot::default());

        let active = Dispatcher::new(&config)
            .active_version()
            .expect("system fallback");

        assert!(active.is_system());
        assert_eq!(active.origin, VersionOrigin::System);
    }

    #[test]
    fn environment_override_beats_local_and_global() {
        let fixture = Fixture::new();
        fixture.install("1.10.0", &[]);
        fixture.install("1.11.2", &[]);
        std::fs::write(fixture.project.join(LOCAL_VERSION_FILE), "1.10.0\n").expect("write local");
        let config = fixture.config(EnvSnapshot {
            version: Some("1.11.2".to_string()),
            ..EnvSnapshot::default()
        });

        let active = Dispatcher::new(&config)
            .active_version()
            .expect("override is installed");

        assert_eq!(active.name, "1.11.2");
        assert_eq!(active.origin, VersionOrigin::Environment);
    }

    #[test]
    fn local_file_beats_global_file() {
        let fixture = Fixture::new();
        fixture.install("1.10.0", &[]);
        fixture.install("1.11.2", &[]);
        let local = fixture.project.join(LOCAL_VERSION_FILE);
        std::fs::write(&local, "1.10.0\n").expect("write local");
        std::fs::write(fixture.root.join("version"), "1.11.2\n").expect("write global");
        let config = fixture.config(EnvSnapshot::default());

        let active = Dispatcher::new(&config)
            .active_version()
            .expect("local version is installed");

        assert_eq!(active.name, "1.10.0");
        assert_eq!(active.origin, VersionOrigin::LocalFile(local));
        assert_eq!(
            active.to_string(),
            format!("1.10.0 (set by {})", fixture.project.join(LOCAL_VERSION_FILE).display())
        );
    }

    #[test]
    fn first_usable_entry_wins() {
        let fixture = Fixture::new();
        fixture.install("1.10.0", &[]);
        std::fs::write(fixture.root.join("version"), "9.9.9 1.10.0 system\n")
            .expect("write global");
        let config = fixture.config(EnvSnapshot::default());

        let active = Dispatcher::new(&config)
            .active_version()
            .expect("second entry is installed");

        assert_eq!(active.name, "1.10.0");
        assert!(matches!(active.origin, VersionOrigin::GlobalFile(_)));
    }

    #[test]
    fn major_minor_entry_selects_installed_patch() {
        let fixture = Fixture::new();
        fixture.install("1.11.0", &[]);
        fixture.install("1.11.2", &[]);
        let config = fixture.config(EnvSnapshot {
            version: Some("1.11".to_string()),
            ..EnvSnapshot::default()
        });

        let active = Dispatcher::new(&config)
            .active_version()
            .expect("1.11 resolves against installed versions");

        assert_eq!(active.name, "1.11.2");
    }

    #[test]
    fn missing_selected_version_is_not_installed_error() {
        let fixture = Fixture::new();
        std::fs::write(fixture.project.join(LOCAL_VERSION_FILE), "1.11.2\n").expect("write local");
        let config = fixture.config(EnvSnapshot::default());

        let error = Dispatcher::new(&config)
            .active_version()
            .expect_err("1.11.2 is not installed");

        assert!(matches!(
            error,
            DispatchError::VersionNotInstalled { ref version, origin: VersionOrigin::LocalFile(_) }
                if version == "1.11.2"
        ));
    }

    #[test]
    fn resolve_command_finds_managed_executable() {
        let fixture = Fixture::new();
        fixture.install("1.11.2", &["rt"]);
        let config = fixture.config(EnvSnapshot {
            version: Some("1.11.2".to_string()),
            ..EnvSnapshot::default()
        });

        let target = Dispatcher::new(&config)
            .resolve_command("rt")
            .expect("rt exists in 1.11.2");

        assert_eq!(
            target.path,
            fixture.root.join("versions").join("1.11.2").join("bin").join("rt")
        );
    }

    #[test]
    fn resolve_command_lists_versions_that_provide_missing_command() {
        let fixture = Fixture::new();
        fixture.install("1.10.0", &["rt"]);
        fixture.install("1.11.2", &["rt", "rtfmt"]);
        let config = fixture.config(EnvSnapshot {
            version: Some("1.10.0".to_string()),
            ..EnvSnapshot::default()
        });

        let error = Dispatcher::new(&config)
            .resolve_command("rtfmt")
            .expect_err("rtfmt is missing in 1.10.0");

        assert!(matches!(
            error,
            DispatchError::CommandNotFound { ref available_in, .. } if available_in == &vec!["1.11.2".to_string()]
        ));
        assert!(error.to_string().contains("1.11.2"));
    }

    #[test]
    fn unselected_missing_system_command_is_no_version_set() {
        let fixture = Fixture::new();
        let config = fixture.config(EnvSnapshot::default());

        let error = Dispatcher::new(&config)
            .resolve_command("rtenv-test-command-that-does-not-exist")
            .expect_err("nothing provides the command");

        assert!(matches!(error, DispatchError::NoVersionSet));
    }

    #[cfg(unix)]
    #[test]
    fn system_lookup_skips_shims_directory() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = Fixture::new();
        let shims = fixture.root.join("shims");
        let system_bin = fixture.project.join("system-bin");
        for dir in [&shims, &system_bin] {
            std::fs::create_dir_all(dir).expect("create bin dir");
            let path = dir.join("rt");
            std::fs::write(&path, "#!/bin/sh\n").expect("write command");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("make command executable");
        }
        let config = fixture.config(EnvSnapshot {
            path: vec![shims, system_bin.clone()],
            ..EnvSnapshot::default()
        });

        let target = Dispatcher::new(&config)
            .resolve_command("rt")
            .expect("system rt found");

        assert_eq!(target.path, system_bin.join("rt"));
        assert!(target.bin_dir.is_none());
    }

    #[test]
    fn exec_command_prepends_bin_dir_and_runs_exec_hooks() {
        use std::sync::{Arc, Mutex};

        let fixture = Fixture::new();
        fixture.install("1.11.2", &["rt"]);
        let config = fixture.config(EnvSnapshot {
            version: Some("1.11.2".to_string()),
            path: vec![PathBuf::from("/usr/bin")],
            ..EnvSnapshot::default()
        });
        let seen = Arc::new(Mutex::new(None));
        let mut hooks = HookRegistry::default();
        let recorder = Arc::clone(&seen);
        hooks.register(HookPhase::Exec, "record", move |context| {
            *recorder.lock().expect("hook lock") = context.command.clone();
            Ok(())
        });

        let command = Dispatcher::new(&config)
            .exec_command(&hooks, "rt", &[OsString::from("--help")])
            .expect("command prepared");

        let path_env = command
            .get_envs()
            .find(|(key, _)| *key == "PATH")
            .and_then(|(_, value)| value)
            .map(|value| std::env::split_paths(value).collect::<Vec<_>>())
            .expect("PATH is set");
        assert_eq!(
            path_env.first(),
            Some(&fixture.root.join("versions").join("1.11.2").join("bin"))
        );
        assert_eq!(*seen.lock().expect("hook lock"), Some("rt".to_string()));
    }
}
