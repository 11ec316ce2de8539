use std::ffi::OsString;

use rtenv_core::{Config, Dispatcher, HookRegistry};

use crate::cli::split_exec_args;
use crate::error::CliError;

const USAGE: &str = "usage: rtenv exec [--version <VERSION>] <COMMAND> [ARGS]...";

/// Run a command of the active version. On unix the current process is
/// replaced, so this only returns on failure.
pub fn exec(config: &Config, hooks: &HookRegistry, argv: &[OsString]) -> Result<i32, CliError> {
    let (version, command, args) = split_exec_args(argv).ok_or_else(|| CliError::message(USAGE))?;

    let mut process = Dispatcher::new(config)
        .with_override(version)
        .exec_command(hooks, &command, &args)?;

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;

        let error = process.exec();
        Err(CliError::io(format!("failed to execute {command}"), error))
    }

    #[cfg(not(unix))]
    {
        let status = process
            .status()
            .map_err(|error| CliError::io(format!("failed to execute {command}"), error))?;
        Ok(status.code().unwrap_or(1))
    }
}
