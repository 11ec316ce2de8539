use async_trait::async_trait;
use log::{debug, error, info, trace, warn};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use rtenv_backend::{BuildError, BuildRequest, BuildStatus, Builder, BuilderInfo};
use rtenv_platform::vars;

use crate::detection::DEFAULT_BUILDER;

/// The `runtime-build` executable, driven as a child process.
#[derive(Debug, Clone)]
pub struct ExternalBuilder {
    info: BuilderInfo,
}

impl ExternalBuilder {
    #[must_use]
    pub fn new(path: PathBuf, version: Option<String>, in_path: bool) -> Self {
        Self {
            info: BuilderInfo {
                name: DEFAULT_BUILDER,
                path,
                version,
                in_path,
            },
        }
    }

    fn build_command(&self, args: &[OsString]) -> Command {
        debug!(
            "Building builder command: {} {}",
            self.info.path.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut cmd = Command::new(&self.info.path);
        cmd.args(args);
        cmd
    }

    async fn execute(&self, args: &[&str]) -> Result<String, BuildError> {
        info!("Executing builder command: {}", args.join(" "));

        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        let output = self
            .build_command(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|error| BuildError::spawn_failed(self.info.path.display().to_string(), &error))?;

        debug!("Builder command exit status: {:?}", output.status);
        trace!("Builder stdout: {}", String::from_utf8_lossy(&output.stdout));

        if !output.stderr.is_empty() {
            trace!("Builder stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            debug!("Builder command succeeded, output: {} bytes", stdout.len());
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!("Builder command failed: args={args:?}, stderr='{stderr}'");
            Err(BuildError::CommandFailed { stderr })
        }
    }
}

#[async_trait]
impl Builder for ExternalBuilder {
    fn info(&self) -> &BuilderInfo {
        &self.info
    }

    async fn definitions(&self) -> Result<Vec<String>, BuildError> {
        let output = self.execute(&["--definitions"]).await?;
        Ok(parse_definitions(&output))
    }

    async fn version(&self) -> Result<Option<String>, BuildError> {
        let output = self.execute(&["--version"]).await?;
        Ok(parse_version(&output, self.info.name))
    }

    async fn build(&self, request: &BuildRequest) -> Result<BuildStatus, BuildError> {
        let mut args: Vec<OsString> = request
            .options
            .flags()
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(OsString::from(&request.definition));
        args.push(request.prefix.clone().into_os_string());

        let mut cmd = self.build_command(&args);
        cmd.kill_on_drop(true);
        if let Some(build_root) = &request.build_root {
            debug!("Setting {}={}", vars::BUILD_ROOT, build_root.display());
            cmd.env(vars::BUILD_ROOT, build_root);
        }
        if let Some(cache_path) = &request.cache_path {
            debug!("Setting {}={}", vars::CACHE_PATH, cache_path.display());
            cmd.env(vars::CACHE_PATH, cache_path);
        }

        info!(
            "Building {} into {}",
            request.definition,
            request.prefix.display()
        );
        let mut child = cmd
            .spawn()
            .map_err(|error| BuildError::spawn_failed(self.info.path.display().to_string(), &error))?;

        let status = tokio::select! {
            status = child.wait() => status?,
            interrupted = tokio::signal::ctrl_c() => {
                if let Err(error) = interrupted {
                    warn!("Failed to listen for interrupts: {error}");
                }
                warn!("Interrupted, stopping {}", self.info.name);
                if let Err(error) = child.kill().await {
                    warn!("Failed to stop builder: {error}");
                }
                return Ok(BuildStatus::INTERRUPTED);
            }
        };

        let status = BuildStatus::from_code(exit_code(status));
        debug!("Builder finished with status {status}");
        Ok(status)
    }
}

fn parse_definitions(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub(crate) fn parse_version(output: &str, name: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }
    let version = trimmed
        .strip_prefix(name)
        .map_or(trimmed, str::trim_start);
    Some(version.to_string())
}

/// Exit code of a finished child; signals map to `128 + signal` like a
/// shell reports them.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
