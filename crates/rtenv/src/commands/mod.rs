mod exec;
mod install;
mod select;

use std::io::Write;

use rtenv_core::{Config, HookRegistry, rehash};

use crate::cli::Commands;
use crate::error::CliError;
use crate::prompt::StdinPrompt;

/// Run one subcommand and return the process exit code.
pub async fn run(command: Commands, config: &Config, hooks: &HookRegistry) -> Result<i32, CliError> {
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Install(args) => install::install(&args, config, hooks, &mut stdout).await,
        Commands::Uninstall { force, version } => {
            select::uninstall(config, hooks, &version, force, &mut StdinPrompt, &mut stdout)
        }
        Commands::Global { version } => select::global(config, version.as_deref(), &mut stdout),
        Commands::Local { version, unset } => {
            select::local(config, version.as_deref(), unset, &mut stdout)
        }
        Commands::Version => select::version(config, &mut stdout),
        Commands::Versions { bare } => select::versions(config, bare, &mut stdout),
        Commands::Prefix { version } => select::prefix(config, version.as_deref(), &mut stdout),
        Commands::Which { command } => select::which(config, &command, &mut stdout),
        Commands::Exec { argv } => exec::exec(config, hooks, &argv),
        Commands::Rehash => {
            let report = rehash(config, hooks)?;
            log::info!(
                "Rehashed {} commands, removed {} stale shims",
                report.commands.len(),
                report.removed.len()
            );
            Ok(0)
        }
        Commands::Root => {
            writeln!(stdout, "{}", config.paths.root.display())?;
            Ok(0)
        }
    }
}
