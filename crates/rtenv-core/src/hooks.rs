use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use rtenv_backend::BuildStatus;

use crate::config::{Config, HookPolicy};

/// Lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeInstall,
    AfterInstall,
    Exec,
    Rehash,
    Uninstall,
}

impl HookPhase {
    pub const ALL: [Self; 5] = [
        Self::BeforeInstall,
        Self::AfterInstall,
        Self::Exec,
        Self::Rehash,
        Self::Uninstall,
    ];

    /// Sub-directory of a hook directory holding this phase's scripts.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::BeforeInstall => "before-install",
            Self::AfterInstall => "after-install",
            Self::Exec => "exec",
            Self::Rehash => "rehash",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What a hook gets to see about the operation in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub phase: HookPhase,
    pub version_name: Option<String>,
    pub definition: Option<String>,
    pub prefix: Option<PathBuf>,
    /// Builder status; only set for `AfterInstall`.
    pub status: Option<BuildStatus>,
    /// Command being run; only set for `Exec`.
    pub command: Option<String>,
}

impl HookContext {
    #[must_use]
    pub fn new(phase: HookPhase) -> Self {
        Self {
            phase,
            version_name: None,
            definition: None,
            prefix: None,
            status: None,
            command: None,
        }
    }

    #[must_use]
    pub fn for_version(phase: HookPhase, version_name: &str, prefix: &Path) -> Self {
        Self {
            version_name: Some(version_name.to_string()),
            prefix: Some(prefix.to_path_buf()),
            ..Self::new(phase)
        }
    }

    /// Environment variables exported to hook scripts.
    #[must_use]
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        let prefix = self
            .prefix
            .as_ref()
            .map(|prefix| prefix.display().to_string());
        vec![
            ("RTENV_HOOK_PHASE", self.phase.dir_name().to_string()),
            ("RTENV_VERSION_NAME", self.version_name.clone().unwrap_or_default()),
            ("RTENV_PREFIX", prefix.unwrap_or_default()),
            ("RTENV_DEFINITION", self.definition.clone().unwrap_or_default()),
            (
                "RTENV_STATUS",
                self.status.map(|status| status.to_string()).unwrap_or_default(),
            ),
            ("RTENV_COMMAND", self.command.clone().unwrap_or_default()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Hook `{hook}' failed: {message}")]
    Failed { hook: String, message: String },

    #[error("Hook script {path} exited with status {code:?}")]
    ScriptFailed { path: PathBuf, code: Option<i32> },

    #[error("Failed to run hook script {path}: {message}")]
    SpawnFailed { path: PathBuf, message: String },
}

impl HookError {
    pub fn failed(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

pub type HookCallback = Box<dyn Fn(&HookContext) -> Result<(), HookError> + Send + Sync>;

struct Hook {
    phase: HookPhase,
    name: String,
    callback: HookCallback,
}

/// Outcome of running one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub ran: usize,
    /// Failures tolerated under [`HookPolicy::BestEffort`].
    pub failures: Vec<HookError>,
}

/// Ordered collection of hooks for every lifecycle phase.
pub struct HookRegistry {
    policy: HookPolicy,
    hooks: Vec<Hook>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<(HookPhase, &str)> = self
            .hooks
            .iter()
            .map(|hook| (hook.phase, hook.name.as_str()))
            .collect();
        f.debug_struct("HookRegistry")
            .field("policy", &self.policy)
            .field("hooks", &names)
            .finish()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(HookPolicy::default())
    }
}

impl HookRegistry {
    #[must_use]
    pub fn new(policy: HookPolicy) -> Self {
        Self {
            policy,
            hooks: Vec::new(),
        }
    }

    /// Registry with the configured policy and every discovered hook script.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new(config.settings.hook_policy);
        registry.discover(&config.hook_dirs());
        registry
    }

    #[must_use]
    pub fn policy(&self) -> HookPolicy {
        self.policy
    }

    pub fn register<F>(&mut self, phase: HookPhase, name: impl Into<String>, callback: F)
    where
        F: Fn(&HookContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let name = name.into();
        log::trace!("Registered {phase} hook {name}");
        self.hooks.push(Hook {
            phase,
            name,
            callback: Box::new(callback),
        });
    }

    pub fn register_script(&mut self, phase: HookPhase, script: ScriptHook) {
        let name = script.path.display().to_string();
        self.register(phase, name, move |context| script.run(context));
    }

    /// Load `<dir>/<phase>/*` scripts from every directory, each phase's
    /// scripts sorted by file name within a directory.
    pub fn discover(&mut self, dirs: &[PathBuf]) {
        for phase in HookPhase::ALL {
            for dir in dirs {
                for script in ScriptHook::find_in(&dir.join(phase.dir_name())) {
                    self.register_script(phase, script);
                }
            }
        }
    }

    #[must_use]
    pub fn count(&self, phase: HookPhase) -> usize {
        self.hooks.iter().filter(|hook| hook.phase == phase).count()
    }

    /// Run the hooks registered for `context.phase` in registration order.
    ///
    /// # Errors
    /// Under [`HookPolicy::AbortOnError`] the first failure stops the
    /// sequence and is returned. Best-effort runs never fail.
    pub fn run(&self, context: &HookContext) -> Result<HookReport, HookError> {
        let mut report = HookReport::default();

        for hook in self.hooks.iter().filter(|hook| hook.phase == context.phase) {
            log::debug!("Running {} hook {}", context.phase, hook.name);
            report.ran += 1;

            if let Err(error) = (hook.callback)(context) {
                match self.policy {
                    HookPolicy::AbortOnError => {
                        log::error!("{error}");
                        return Err(error);
                    }
                    HookPolicy::BestEffort => {
                        log::warn!("{error}");
                        report.failures.push(error);
                    }
                }
            }
        }

        Ok(report)
    }
}

/// An executable hook file run with `sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHook {
    pub path: PathBuf,
}

impl ScriptHook {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Regular files in `dir`, sorted by file name. Hidden files are skipped.
    #[must_use]
    pub fn find_in(dir: &Path) -> Vec<Self> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        paths.into_iter().map(Self::new).collect()
    }

    /// # Errors
    /// Returns an error if `sh` cannot be started or the script exits
    /// unsuccessfully.
    pub fn run(&self, context: &HookContext) -> Result<(), HookError> {
        let status = Command::new("sh")
            .arg(&self.path)
            .envs(context.env_vars())
            .status()
            .map_err(|error| HookError::SpawnFailed {
                path: self.path.clone(),
                message: error.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HookError::ScriptFailed {
                path: self.path.clone(),
                code: status.code(),
            })
        }
    }
}
