use std::path::{Path, PathBuf};
use tokio::process::Command;
use which::which_in;

use rtenv_core::Config;

use crate::backend::{ExternalBuilder, parse_version};

/// Executable name of the builder looked up on `PATH`.
pub const DEFAULT_BUILDER: &str = "runtime-build";

#[derive(Debug, Clone)]
pub struct BuilderDetection {
    pub found: bool,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub in_path: bool,
}

impl BuilderDetection {
    /// The detected builder, or `None` when nothing was found.
    #[must_use]
    pub fn into_builder(self) -> Option<ExternalBuilder> {
        let path = self.path.filter(|_| self.found)?;
        Some(ExternalBuilder::new(path, self.version, self.in_path))
    }
}

/// Locate the builder: an explicit `RTENV_BUILDER` or settings entry first,
/// then `PATH`, then plugins under `<root>/plugins`, then common install
/// locations.
pub async fn detect_builder(config: &Config) -> BuilderDetection {
    if let Some(path) = config.builder_override() {
        let version = get_builder_version(path).await;
        return BuilderDetection {
            found: path.is_file(),
            path: Some(path.to_path_buf()),
            version,
            in_path: false,
        };
    }

    let search_path = std::env::join_paths(&config.env.path).ok();
    if let Ok(path) = which_in(DEFAULT_BUILDER, search_path, &config.env.current_dir) {
        let version = get_builder_version(&path).await;
        return BuilderDetection {
            found: true,
            path: Some(path),
            version,
            in_path: true,
        };
    }

    let candidates = plugin_builder_paths(&config.paths.plugins_dir())
        .into_iter()
        .chain(get_common_builder_paths());
    for path in candidates {
        if path.is_file() {
            let version = get_builder_version(&path).await;
            return BuilderDetection {
                found: true,
                path: Some(path),
                version,
                in_path: false,
            };
        }
    }

    log::debug!("No {DEFAULT_BUILDER} found");
    BuilderDetection {
        found: false,
        path: None,
        version: None,
        in_path: false,
    }
}

fn plugin_builder_paths(plugins_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path().join("bin").join(DEFAULT_BUILDER))
        .collect();
    paths.sort();
    paths
}

fn get_common_builder_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".local").join("bin").join(DEFAULT_BUILDER));

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/opt/homebrew/bin").join(DEFAULT_BUILDER));
        }

        #[cfg(unix)]
        {
            paths.push(PathBuf::from("/usr/local/bin").join(DEFAULT_BUILDER));
            paths.push(PathBuf::from("/usr/bin").join(DEFAULT_BUILDER));
        }
    }

    paths
}

async fn get_builder_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().await.ok()?;

    if !output.status.success() {
        return None;
    }

    parse_version(&String::from_utf8_lossy(&output.stdout), DEFAULT_BUILDER)
}
