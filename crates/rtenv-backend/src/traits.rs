use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::BuildError;
use crate::types::{BuildOptions, BuildStatus};

#[derive(Debug, Clone)]
pub struct BuilderInfo {
    pub name: &'static str,
    pub path: PathBuf,
    pub version: Option<String>,
    pub in_path: bool,
}

/// Everything the builder needs to populate one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub definition: String,
    pub prefix: PathBuf,
    pub options: BuildOptions,
    pub build_root: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
}

/// The external tool that knows how to download and compile definitions.
#[async_trait]
pub trait Builder: Send + Sync {
    fn info(&self) -> &BuilderInfo;

    /// Every definition the builder can install, in the builder's listing
    /// order.
    async fn definitions(&self) -> Result<Vec<String>, BuildError>;

    async fn version(&self) -> Result<Option<String>, BuildError>;

    /// Run a build to completion and report its exit status. A non-zero
    /// status is not an error; `Err` means the builder could not be run.
    async fn build(&self, request: &BuildRequest) -> Result<BuildStatus, BuildError>;
}
