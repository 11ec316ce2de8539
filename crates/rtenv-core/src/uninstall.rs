use std::path::PathBuf;
use thiserror::Error;

use rtenv_backend::Prompt;

use crate::config::Config;
use crate::hooks::{HookContext, HookError, HookPhase, HookRegistry};
use crate::rehash::{RehashError, rehash};
use crate::store::{StoreError, VersionStore, validate_name};

#[derive(Debug, Error)]
pub enum UninstallError {
    #[error("Version `{name}' is not installed")]
    NotInstalled { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Rehash(#[from] RehashError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed { name: String, prefix: PathBuf },
    Cancelled,
}

/// Remove an installed version and refresh the shims.
///
/// Without `force` the user is asked to confirm first, and a missing
/// version is an error.
///
/// # Errors
/// Returns an error if the version is missing (and `force` is not set),
/// the prefix cannot be removed, or a hook fails under the abort policy.
pub fn uninstall(
    config: &Config,
    hooks: &HookRegistry,
    name: &str,
    force: bool,
    prompt: &mut dyn Prompt,
) -> Result<UninstallOutcome, UninstallError> {
    validate_name(name)?;
    let store = VersionStore::new(&config.paths);
    let prefix = store.prefix(name);

    if !prefix.is_dir() {
        if force {
            return Ok(UninstallOutcome::Removed {
                name: name.to_string(),
                prefix,
            });
        }
        return Err(UninstallError::NotInstalled {
            name: name.to_string(),
        });
    }

    if !force && !prompt.confirm(&format!("remove {}? (y/N)", prefix.display())) {
        return Ok(UninstallOutcome::Cancelled);
    }

    hooks.run(&HookContext::for_version(HookPhase::Uninstall, name, &prefix))?;
    store.remove(name)?;
    rehash(config, hooks)?;

    Ok(UninstallOutcome::Removed {
        name: name.to_string(),
        prefix,
    })
}
