use std::io::{ErrorKind, Write};

use rtenv_backend::Prompt;
use rtenv_core::{
    ActiveVersion, Config, DispatchError, Dispatcher, HookRegistry, LOCAL_VERSION_FILE,
    SYSTEM_VERSION, StoreError, UninstallOutcome, VersionFile, VersionStore,
    uninstall as remove,
};

use crate::error::CliError;

/// `system`, or a version that is installed under the root.
fn ensure_selectable(config: &Config, version: &str) -> Result<(), CliError> {
    if version == SYSTEM_VERSION || VersionStore::new(&config.paths).is_installed(version) {
        return Ok(());
    }
    Err(StoreError::NotInstalled {
        name: version.to_string(),
    }
    .into())
}

pub fn global(config: &Config, version: Option<&str>, out: &mut impl Write) -> Result<i32, CliError> {
    let path = config.paths.global_version_file();

    let Some(version) = version else {
        let current = VersionFile::load_if_exists(&path)
            .map_err(|error| CliError::io(format!("failed to read {}", path.display()), error))?;
        let name = current
            .as_ref()
            .and_then(VersionFile::first)
            .unwrap_or(SYSTEM_VERSION);
        writeln!(out, "{name}")?;
        return Ok(0);
    };

    ensure_selectable(config, version)?;
    VersionFile::write(&path, &[version.to_string()])
        .map_err(|error| CliError::io(format!("failed to write {}", path.display()), error))?;
    log::info!("Global version set to {version}");
    Ok(0)
}

pub fn local(
    config: &Config,
    version: Option<&str>,
    unset: bool,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let here = config.env.current_dir.join(LOCAL_VERSION_FILE);

    if unset {
        return match std::fs::remove_file(&here) {
            Ok(()) => Ok(0),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(0),
            Err(error) => Err(CliError::io(format!("failed to remove {}", here.display()), error)),
        };
    }

    if let Some(version) = version {
        ensure_selectable(config, version)?;
        VersionFile::write(&here, &[version.to_string()])
            .map_err(|error| CliError::io(format!("failed to write {}", here.display()), error))?;
        return Ok(0);
    }

    let file = Dispatcher::new(config)
        .local_version_file()
        .map(|path| {
            VersionFile::load_if_exists(&path)
                .map_err(|error| CliError::io(format!("failed to read {}", path.display()), error))
        })
        .transpose()?
        .flatten();
    match file.as_ref().and_then(VersionFile::first) {
        Some(name) => {
            writeln!(out, "{name}")?;
            Ok(0)
        }
        None => Err(CliError::message("no local version configured for this directory")),
    }
}

pub fn version(config: &Config, out: &mut impl Write) -> Result<i32, CliError> {
    let active = Dispatcher::new(config).active_version()?;
    writeln!(out, "{active}")?;
    Ok(0)
}

pub fn versions(config: &Config, bare: bool, out: &mut impl Write) -> Result<i32, CliError> {
    let installed = VersionStore::new(&config.paths).names()?;

    if bare {
        for name in installed {
            writeln!(out, "{name}")?;
        }
        return Ok(0);
    }

    let active = match Dispatcher::new(config).active_version() {
        Ok(active) => Some(active),
        Err(DispatchError::VersionNotInstalled { version, origin }) => {
            log::warn!("Active version {version} (set by {origin}) is not installed");
            None
        }
        Err(error) => return Err(error.into()),
    };

    let shows_system = active.as_ref().is_some_and(ActiveVersion::is_system);
    let listed = shows_system
        .then(|| SYSTEM_VERSION.to_string())
        .into_iter()
        .chain(installed);

    for name in listed {
        match &active {
            Some(active) if active.name == name => writeln!(out, "* {active}")?,
            _ => writeln!(out, "  {name}")?,
        }
    }
    Ok(0)
}

pub fn prefix(config: &Config, version: Option<&str>, out: &mut impl Write) -> Result<i32, CliError> {
    let prefix = match version {
        Some(SYSTEM_VERSION) => return Err(DispatchError::SystemHasNoPrefix.into()),
        Some(name) => {
            let store = VersionStore::new(&config.paths);
            store.get(name).map(|installed| installed.prefix).ok_or_else(|| {
                StoreError::NotInstalled {
                    name: name.to_string(),
                }
            })?
        }
        None => {
            let dispatcher = Dispatcher::new(config);
            let active = dispatcher.active_version()?;
            dispatcher.prefix(&active)?
        }
    };

    writeln!(out, "{}", prefix.display())?;
    Ok(0)
}

pub fn which(config: &Config, command: &str, out: &mut impl Write) -> Result<i32, CliError> {
    let target = Dispatcher::new(config).resolve_command(command)?;
    writeln!(out, "{}", target.path.display())?;
    Ok(0)
}

pub fn uninstall(
    config: &Config,
    hooks: &HookRegistry,
    version: &str,
    force: bool,
    prompt: &mut dyn Prompt,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    match remove(config, hooks, version, force, prompt)? {
        UninstallOutcome::Removed { name, prefix } => {
            log::info!("Removed {name} from {}", prefix.display());
            writeln!(out, "rtenv: {name} uninstalled")?;
            Ok(0)
        }
        UninstallOutcome::Cancelled => Ok(1),
    }
}
