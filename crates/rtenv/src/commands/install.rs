use std::io::Write;

use rtenv_backend::{Builder, Prompt};
use rtenv_build::detect_builder;
use rtenv_core::{Config, HookRegistry, InstallOutcome, InstallRequest, Installer};

use crate::cli::InstallArgs;
use crate::error::CliError;
use crate::prompt::StdinPrompt;

pub async fn install(
    args: &InstallArgs,
    config: &Config,
    hooks: &HookRegistry,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let builder = detect_builder(config)
        .await
        .into_builder()
        .ok_or(CliError::BuilderNotFound)?;
    log::debug!("Using builder {}", builder.info().path.display());
    config
        .paths
        .ensure_dirs()
        .map_err(|error| CliError::io("failed to create rtenv directories", error))?;

    run_install(args, config, &builder, hooks, &mut StdinPrompt, out).await
}

async fn run_install(
    args: &InstallArgs,
    config: &Config,
    builder: &dyn Builder,
    hooks: &HookRegistry,
    prompt: &mut dyn Prompt,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let installer = Installer::new(config, builder, hooks);

    if args.show_version {
        let (own, builder_version) = installer.versions().await?;
        writeln!(out, "{own}")?;
        writeln!(
            out,
            "{} {}",
            builder.info().name,
            builder_version.as_deref().unwrap_or("(unknown version)")
        )?;
        return Ok(0);
    }

    if args.list {
        writeln!(out, "Available versions:")?;
        for definition in installer.list_definitions().await? {
            writeln!(out, "  {definition}")?;
        }
        return Ok(0);
    }

    let request = InstallRequest {
        specifier: args.version.clone(),
        options: args.options(),
    };
    let outcome = installer.install(&request, prompt).await?;
    if let Some(message) = describe(&outcome) {
        eprintln!("{message}");
    }
    Ok(outcome.exit_code())
}

/// Message shown on stderr once an install finishes.
fn describe(outcome: &InstallOutcome) -> Option<String> {
    match outcome {
        InstallOutcome::Installed { name, prefix, .. } => {
            Some(format!("Installed {name} to {}", prefix.display()))
        }
        InstallOutcome::Skipped { .. } | InstallOutcome::Cancelled { .. } => None,
        InstallOutcome::Failed { status, cleaned_up } => Some(if *cleaned_up {
            format!("rtenv: build failed with status {status}; removed incomplete install")
        } else {
            format!("rtenv: build failed with status {status}")
        }),
        InstallOutcome::DefinitionNotFound(diagnostic) => Some(format!(
            "rtenv: definition not found: {}\n\n{diagnostic}",
            diagnostic.definition
        )),
    }
}
