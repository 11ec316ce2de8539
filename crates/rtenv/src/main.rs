mod cli;
mod commands;
mod error;
mod logging;
mod prompt;

use clap::Parser;

use rtenv_core::{Config, HookRegistry};
use rtenv_platform::EnvSnapshot;

use crate::cli::Cli;
use crate::error::CliError;
use crate::logging::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let code = i32::from(error.use_stderr());
            let _ = error.print();
            std::process::exit(code);
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error:?}");
            eprintln!("rtenv: {error}");
            if let Some(hint) = error.hint() {
                eprintln!("\n{hint}");
            }
            error.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let env = EnvSnapshot::capture()
        .map_err(|error| CliError::io("failed to read the current directory", error))?;
    let (mut config, ignored_settings) = Config::from_env(env)?;
    if let Ok(executable) = std::env::current_exe() {
        config = config.with_executable(executable);
    }

    init_logging(
        &config.paths,
        config.debug_logging(),
        config.settings.max_log_size_bytes,
    );
    if let Some(error) = ignored_settings {
        log::warn!("Ignoring settings file: {error}");
        eprintln!("rtenv: ignoring settings file: {error}");
    }
    log::debug!(
        "rtenv {} root {}",
        env!("CARGO_PKG_VERSION"),
        config.paths.root.display()
    );

    let hooks = HookRegistry::from_config(&config);
    commands::run(cli.command, &config, &hooks).await
}
