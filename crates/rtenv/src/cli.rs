use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;

use rtenv_backend::BuildOptions;
use rtenv_core::InstallOptions;

#[derive(Debug, Parser)]
#[command(
    name = "rtenv",
    version,
    about = "Install and switch between runtime versions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a runtime version using runtime-build
    Install(InstallArgs),
    /// Remove an installed version
    Uninstall {
        /// Do not ask for confirmation; succeed if the version is missing
        #[arg(short, long)]
        force: bool,
        version: String,
    },
    /// Show or set the global version
    Global { version: Option<String> },
    /// Show or set the version for the current directory
    Local {
        version: Option<String>,
        /// Remove the local version file
        #[arg(long, conflicts_with = "version")]
        unset: bool,
    },
    /// Show the active version and how it was selected
    Version,
    /// List installed versions
    Versions {
        /// Print names only, without marking the active version
        #[arg(long)]
        bare: bool,
    },
    /// Show the install prefix of a version
    Prefix { version: Option<String> },
    /// Show the full path of the executable that would run
    Which { command: String },
    /// Run a command from the active version
    ///
    /// Usage: rtenv exec [--version <VERSION>] <COMMAND> [ARGS]...
    #[command(disable_help_flag = true)]
    Exec {
        #[arg(
            required = true,
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        argv: Vec<OsString>,
    },
    /// Regenerate shims for every installed executable
    Rehash,
    /// Print the rtenv root directory
    Root,
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallArgs {
    /// Version to install: an exact name, major.minor, latest or unstable
    pub version: Option<String>,

    /// Install even if the version appears to be installed already
    #[arg(short, long, conflicts_with = "skip_existing")]
    pub force: bool,

    /// Skip if the version appears to be installed already
    #[arg(short, long)]
    pub skip_existing: bool,

    /// Keep source tree in the build root after installation
    #[arg(short, long)]
    pub keep: bool,

    /// Show the builder's output while building
    #[arg(short, long)]
    pub verbose: bool,

    /// Apply a patch from stdin before building
    #[arg(short, long)]
    pub patch: bool,

    /// Suppress builder progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Build a debug version
    #[arg(short = 'g', long)]
    pub debug: bool,

    /// List all available versions
    #[arg(short, long, conflicts_with = "version")]
    pub list: bool,

    /// Show rtenv and runtime-build versions
    #[arg(long = "version", conflicts_with_all = ["version", "list"])]
    pub show_version: bool,
}

impl InstallArgs {
    #[must_use]
    pub fn options(&self) -> InstallOptions {
        InstallOptions {
            force: self.force,
            skip_existing: self.skip_existing,
            build: BuildOptions {
                keep_sources: self.keep,
                verbose: self.verbose,
                patch: self.patch,
                quiet: self.quiet,
                debug: self.debug,
            },
        }
    }
}

/// Split `exec` arguments into the optional `--version` override, the
/// command and its arguments.
#[must_use]
pub fn split_exec_args(argv: &[OsString]) -> Option<(Option<String>, String, Vec<OsString>)> {
    let (version, rest) = match argv {
        [flag, version, rest @ ..] if flag == "--version" => {
            (Some(version.to_string_lossy().into_owned()), rest)
        }
        _ => (None, argv),
    };
    let (command, args) = rest.split_first()?;
    Some((version, command.to_string_lossy().into_owned(), args.to_vec()))
}
