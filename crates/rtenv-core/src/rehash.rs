use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::hooks::{HookContext, HookError, HookPhase, HookRegistry};
use crate::store::{StoreError, VersionStore};

#[derive(Debug, Error)]
pub enum RehashError {
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

impl RehashError {
    fn io_with_path(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RehashReport {
    /// Every command that now has a shim.
    pub commands: Vec<String>,
    /// Shims that were deleted because no version provides them anymore.
    pub removed: Vec<String>,
}

/// Regenerate `<root>/shims` from the executables of every installed
/// version, then run `Rehash` hooks.
///
/// # Errors
/// Returns an error if the shims directory cannot be updated, or a hook
/// fails under the abort policy.
pub fn rehash(config: &Config, hooks: &HookRegistry) -> Result<RehashReport, RehashError> {
    let shims_dir = config.paths.shims_dir();
    std::fs::create_dir_all(&shims_dir).map_err(|error| {
        RehashError::io_with_path("failed to create shims directory", &shims_dir, error)
    })?;

    let commands = collect_commands(&VersionStore::new(&config.paths))?;
    let wanted: BTreeSet<String> = commands.iter().map(|command| shim_file_name(command)).collect();

    for command in &commands {
        write_shim(&shims_dir, command, &config.executable, &config.paths.root)?;
    }

    let removed = remove_stale_shims(&shims_dir, &wanted)?;
    log::info!(
        "Rehashed {} shims in {} ({} removed)",
        commands.len(),
        shims_dir.display(),
        removed.len()
    );

    hooks.run(&HookContext::new(HookPhase::Rehash))?;

    Ok(RehashReport {
        commands: commands.into_iter().collect(),
        removed,
    })
}

fn collect_commands(store: &VersionStore) -> Result<BTreeSet<String>, RehashError> {
    let mut commands = BTreeSet::new();

    for version in store.list()? {
        let bin_dir = version.bin_dir();
        let entries = std::fs::read_dir(&bin_dir).map_err(|error| {
            RehashError::io_with_path("failed to read", &bin_dir, error)
        })?;
        commands.extend(
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_file())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| !name.starts_with('.')),
        );
    }

    Ok(commands)
}

#[cfg(unix)]
fn shim_file_name(command: &str) -> String {
    command.to_string()
}

#[cfg(not(unix))]
fn shim_file_name(command: &str) -> String {
    let stem = Path::new(command)
        .file_stem()
        .map_or_else(|| command.to_string(), |stem| stem.to_string_lossy().into_owned());
    format!("{stem}.cmd")
}

#[cfg(unix)]
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn shim_script(command: &str, executable: &Path, root: &Path) -> String {
    format!(
        "#!/usr/bin/env sh\n\
         set -e\n\
         [ -n \"$RTENV_DEBUG\" ] && set -x\n\
         \n\
         export RTENV_ROOT={root}\n\
         exec {executable} exec {command} \"$@\"\n",
        root = sh_quote(&root.display().to_string()),
        executable = sh_quote(&executable.display().to_string()),
        command = sh_quote(command),
    )
}

#[cfg(not(unix))]
fn shim_script(command: &str, executable: &Path, root: &Path) -> String {
    format!(
        "@echo off\r\nset \"RTENV_ROOT={}\"\r\n\"{}\" exec \"{command}\" %*\r\n",
        root.display(),
        executable.display(),
    )
}

fn write_shim(
    shims_dir: &Path,
    command: &str,
    executable: &Path,
    root: &Path,
) -> Result<(), RehashError> {
    let target = shims_dir.join(shim_file_name(command));

    let mut staged = tempfile::NamedTempFile::new_in(shims_dir).map_err(|error| {
        RehashError::io_with_path("failed to stage shim in", shims_dir, error)
    })?;
    staged
        .write_all(shim_script(command, executable, root).as_bytes())
        .map_err(|error| RehashError::io_with_path("failed to write shim", &target, error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))
            .map_err(|error| {
                RehashError::io_with_path("failed to make shim executable", &target, error)
            })?;
    }

    staged
        .persist(&target)
        .map_err(|error| RehashError::io_with_path("failed to install shim", &target, error.error))?;
    log::trace!("Wrote shim {}", target.display());
    Ok(())
}

fn remove_stale_shims(
    shims_dir: &Path,
    wanted: &BTreeSet<String>,
) -> Result<Vec<String>, RehashError> {
    let entries = std::fs::read_dir(shims_dir).map_err(|error| {
        RehashError::io_with_path("failed to read shims directory", shims_dir, error)
    })?;

    let mut removed = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if wanted.contains(&name) || name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        std::fs::remove_file(&path)
            .map_err(|error| RehashError::io_with_path("failed to remove stale shim", &path, error))?;
        log::debug!("Removed stale shim {name}");
        removed.push(name);
    }

    removed.sort();
    Ok(removed)
}
