use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use rtenv_backend::{
    BuildError, BuildOptions, BuildRequest, BuildStatus, Builder, DEBUG_SUFFIX, InstallReceipt,
    Prompt,
};

use crate::config::Config;
use crate::hooks::{HookContext, HookError, HookPhase, HookRegistry};
use crate::rehash::{RehashError, RehashReport, rehash};
use crate::resolver::{ResolveError, Resolver, Specifier, requested_from_version_file, suggestions};
use crate::store::{StoreError, VersionStore, validate_name};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Install even if the prefix already has a `bin` directory.
    pub force: bool,
    /// Quietly succeed if the prefix already has a `bin` directory.
    pub skip_existing: bool,
    pub build: BuildOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// `None` installs the version named by the version file.
    pub specifier: Option<String>,
    pub options: InstallOptions,
}

/// How the user should update the builder to learn about new definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeGuidance {
    GitCheckout { dir: PathBuf },
    Homebrew,
    Generic,
}

impl UpgradeGuidance {
    /// Guess how the builder at `builder_path` was installed.
    #[must_use]
    pub fn detect(builder_path: &Path) -> Self {
        let resolved = builder_path
            .canonicalize()
            .unwrap_or_else(|_| builder_path.to_path_buf());

        if resolved
            .components()
            .any(|component| component.as_os_str() == "Cellar")
        {
            return Self::Homebrew;
        }

        resolved
            .ancestors()
            .skip(1)
            .find(|dir| dir.join(".git").exists())
            .map_or(Self::Generic, |dir| Self::GitCheckout {
                dir: dir.to_path_buf(),
            })
    }

    fn write_for(&self, builder: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitCheckout { dir } => write!(
                f,
                "If the version you need is missing, try upgrading {builder}:\n\n  cd {} && git pull && cd -",
                dir.display()
            ),
            Self::Homebrew => write!(
                f,
                "If the version you need is missing, try upgrading {builder}:\n\n  brew update && brew upgrade {builder}"
            ),
            Self::Generic => write!(
                f,
                "If the version you need is missing, try upgrading {builder}."
            ),
        }
    }
}

/// Diagnostic for a builder that does not know the requested definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionNotFound {
    pub definition: String,
    pub suggestions: Vec<String>,
    pub builder: String,
    pub guidance: UpgradeGuidance,
}

impl fmt::Display for DefinitionNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.suggestions.is_empty() {
            writeln!(
                f,
                "The following versions contain `{}' in the name:",
                self.definition
            )?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {suggestion}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "See all available versions with `rtenv install --list'.")?;
        writeln!(f)?;
        self.guidance.write_for(&self.builder, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        name: String,
        prefix: PathBuf,
        rehash: RehashReport,
    },
    /// The prefix was already installed and `skip_existing` was set.
    Skipped { name: String, prefix: PathBuf },
    /// The user declined to reinstall over an existing prefix.
    Cancelled { prefix: PathBuf },
    Failed {
        status: BuildStatus,
        /// Whether a newly created prefix was removed.
        cleaned_up: bool,
    },
    DefinitionNotFound(DefinitionNotFound),
}

impl InstallOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Installed { .. } | Self::Skipped { .. } => 0,
            Self::Cancelled { .. } => 1,
            Self::Failed { status, .. } => status.code(),
            Self::DefinitionNotFound(_) => BuildStatus::DEFINITION_NOT_FOUND.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rehash(#[from] RehashError),

    #[error("Failed to remove incomplete install {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Drives one install through resolution, the builder and the hooks.
pub struct Installer<'a> {
    config: &'a Config,
    builder: &'a dyn Builder,
    hooks: &'a HookRegistry,
    store: VersionStore,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(config: &'a Config, builder: &'a dyn Builder, hooks: &'a HookRegistry) -> Self {
        Self {
            config,
            builder,
            hooks,
            store: VersionStore::new(&config.paths),
        }
    }

    /// Every definition the builder can install.
    ///
    /// # Errors
    /// Returns an error if the builder cannot list its definitions.
    pub async fn list_definitions(&self) -> Result<Vec<String>, InstallError> {
        Ok(self.builder.definitions().await?)
    }

    /// Version of rtenv and of the builder, for `install --version`.
    ///
    /// # Errors
    /// Returns an error if the builder cannot be queried.
    pub async fn versions(&self) -> Result<(String, Option<String>), InstallError> {
        let builder_version = self.builder.version().await?;
        Ok((
            format!("rtenv {}", env!("CARGO_PKG_VERSION")),
            builder_version,
        ))
    }

    /// Install the requested version.
    ///
    /// Build failures are reported as an [`InstallOutcome`] carrying the
    /// builder's status; `Err` is reserved for problems that stop the
    /// install before or around the build.
    ///
    /// # Errors
    /// Returns an error when the specifier cannot be resolved, the builder
    /// cannot be run, or a hook fails under the abort policy.
    pub async fn install(
        &self,
        request: &InstallRequest,
        prompt: &mut dyn Prompt,
    ) -> Result<InstallOutcome, InstallError> {
        let options = request.options;
        let requested = match &request.specifier {
            Some(specifier) => specifier.clone(),
            None => requested_from_version_file(self.config)?,
        };

        let catalog = if matches!(Specifier::parse(&requested), Specifier::Exact(_)) {
            Vec::new()
        } else {
            self.builder.definitions().await?
        };
        let definition =
            Resolver::new(&catalog, self.config.settings.selection_order).resolve(&requested)?;

        let name = if options.build.debug {
            format!("{definition}{DEBUG_SUFFIX}")
        } else {
            definition.clone()
        };
        validate_name(&name)?;

        let prefix = self.store.prefix(&name);
        let bin_existed = prefix.join("bin").is_dir();

        if bin_existed {
            if options.skip_existing {
                log::info!("{} already installed, skipping", prefix.display());
                return Ok(InstallOutcome::Skipped { name, prefix });
            }
            if !options.force {
                let question = format!(
                    "{} already exists, continue with installation? (y/N)",
                    prefix.display()
                );
                if !prompt.confirm(&question) {
                    return Ok(InstallOutcome::Cancelled { prefix });
                }
            }
        }

        let context = HookContext {
            definition: Some(definition.clone()),
            ..HookContext::for_version(HookPhase::BeforeInstall, &name, &prefix)
        };
        self.hooks.run(&context)?;

        let build_request = BuildRequest {
            definition: definition.clone(),
            prefix: prefix.clone(),
            options: options.build,
            build_root: self.config.build_root(options.build.keep_sources),
            cache_path: self.config.cache_path(),
        };
        log::info!("Installing {definition} to {}", prefix.display());

        let built = self.builder.build(&build_request).await;
        let status = match &built {
            Ok(status) => *status,
            Err(_) => BuildStatus::NOT_RUNNABLE,
        };
        log::debug!("Builder exited with status {status}");

        let after = HookContext {
            phase: HookPhase::AfterInstall,
            status: Some(status),
            ..context
        };
        let after_hooks = self.hooks.run(&after);
        if let Err(error) = built {
            self.discard_new_prefix(&prefix, bin_existed)?;
            return Err(error.into());
        }
        if let Err(error) = after_hooks {
            if !status.is_success() && !status.is_definition_not_found() {
                self.discard_new_prefix(&prefix, bin_existed)?;
            }
            return Err(error.into());
        }

        if status.is_success() {
            self.store.write_receipt(
                &name,
                &InstallReceipt {
                    definition,
                    debug: options.build.debug,
                    installed_at: chrono::Utc::now(),
                    builder_version: self.builder.info().version.clone(),
                },
            )?;
            let rehash = rehash(self.config, self.hooks)?;
            log::info!("Installed {name}");
            return Ok(InstallOutcome::Installed {
                name,
                prefix,
                rehash,
            });
        }

        if status.is_definition_not_found() {
            let catalog = if catalog.is_empty() {
                self.builder.definitions().await.unwrap_or_else(|error| {
                    log::warn!("Could not list definitions for suggestions: {error}");
                    Vec::new()
                })
            } else {
                catalog
            };
            let info = self.builder.info();
            return Ok(InstallOutcome::DefinitionNotFound(DefinitionNotFound {
                suggestions: suggestions(&definition, &catalog),
                definition,
                builder: info.name.to_string(),
                guidance: UpgradeGuidance::detect(&info.path),
            }));
        }

        let cleaned_up = self.discard_new_prefix(&prefix, bin_existed)?;
        log::error!("Build of {definition} failed with status {status}");
        Ok(InstallOutcome::Failed { status, cleaned_up })
    }

    /// Remove `prefix` unless it was already installed before this run.
    fn discard_new_prefix(&self, prefix: &Path, bin_existed: bool) -> Result<bool, InstallError> {
        if bin_existed || !prefix.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(prefix).map_err(|source| InstallError::Cleanup {
            path: prefix.to_path_buf(),
            source,
        })?;
        log::info!("Removed incomplete install {}", prefix.display());
        Ok(true)
    }
}
