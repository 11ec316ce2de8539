use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

use rtenv_backend::RuntimeVersion;

use crate::config::{Config, SelectionOrder};
use crate::version_file::{VersionFile, find_local_version_file};

static STABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("stable version pattern is valid"));

static UNSTABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(-(alpha|beta|rc)[.\d]*)?$")
        .expect("unstable version pattern is valid")
});

static MAJOR_MINOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+$").expect("major.minor pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No version specified and no version file found")]
    NoSpecifier,

    #[error("No definition matches `{specifier}'")]
    NoMatch {
        specifier: String,
        suggestions: Vec<String>,
    },

    #[error("Invalid version name `{name}'")]
    InvalidName { name: String },

    #[error("Failed to read version file {path}: {message}")]
    VersionFile { path: PathBuf, message: String },
}

/// A parsed version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    Latest,
    Unstable,
    /// A `major.minor` prefix such as `1.11`.
    MajorMinor(String),
    /// Anything else, handed to the builder verbatim.
    Exact(String),
}

impl Specifier {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input {
            "latest" => Self::Latest,
            "unstable" => Self::Unstable,
            _ if MAJOR_MINOR.is_match(input) => Self::MajorMinor(input.to_string()),
            _ => Self::Exact(input.to_string()),
        }
    }

    fn matches(&self, definition: &str) -> bool {
        match self {
            Self::Latest => STABLE.is_match(definition),
            Self::Unstable => UNSTABLE.is_match(definition),
            Self::MajorMinor(prefix) => definition
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|patch| !patch.is_empty() && patch.bytes().all(|b| b.is_ascii_digit())),
            Self::Exact(name) => definition == name,
        }
    }

    fn as_query(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Unstable => "unstable",
            Self::MajorMinor(value) | Self::Exact(value) => value,
        }
    }
}

/// Maps version specifiers onto concrete definition names from a catalog.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    catalog: &'a [String],
    order: SelectionOrder,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(catalog: &'a [String], order: SelectionOrder) -> Self {
        Self { catalog, order }
    }

    /// Resolve an explicit specifier.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoMatch`] when a `latest`, `unstable` or
    /// `major.minor` request has no candidate in the catalog, and
    /// [`ResolveError::InvalidName`] for names that cannot be a directory.
    pub fn resolve(&self, specifier: &str) -> Result<String, ResolveError> {
        let parsed = Specifier::parse(specifier);
        let resolved = match &parsed {
            Specifier::Exact(name) => {
                if name.is_empty() || crate::store::validate_name(name).is_err() {
                    return Err(ResolveError::InvalidName { name: name.clone() });
                }
                name.clone()
            }
            pattern => self
                .highest(pattern)
                .ok_or_else(|| ResolveError::NoMatch {
                    specifier: specifier.trim().to_string(),
                    suggestions: suggestions(pattern.as_query(), self.catalog),
                })?
                .to_string(),
        };

        log::debug!("Resolved `{specifier}' to {resolved}");
        Ok(resolved)
    }

    /// Resolve `specifier`, falling back to the version file when absent.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoSpecifier`] when neither a specifier nor a
    /// version file entry is available, plus any error of
    /// [`Resolver::resolve`].
    pub fn resolve_requested(
        &self,
        specifier: Option<&str>,
        config: &Config,
    ) -> Result<String, ResolveError> {
        match specifier {
            Some(specifier) => self.resolve(specifier),
            None => {
                let requested = requested_from_version_file(config)?;
                self.resolve(&requested)
            }
        }
    }

    fn highest(&self, specifier: &Specifier) -> Option<&'a str> {
        let candidates = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, definition)| specifier.matches(definition));

        let chosen = match self.order {
            SelectionOrder::Catalog => candidates.last(),
            SelectionOrder::Semantic => candidates.max_by_key(|(index, definition)| {
                (definition.parse::<RuntimeVersion>().ok(), *index)
            }),
        };
        chosen.map(|(_, definition)| definition.as_str())
    }
}

/// First entry of the version file that applies to the current directory:
/// the file named by `RTENV_VERSION_FILE`, else the nearest local marker.
///
/// # Errors
/// Returns [`ResolveError::NoSpecifier`] when no file or entry is found.
pub fn requested_from_version_file(config: &Config) -> Result<String, ResolveError> {
    let path = config
        .env
        .version_file
        .clone()
        .or_else(|| find_local_version_file(&config.env.search_dir()))
        .ok_or(ResolveError::NoSpecifier)?;

    let file = VersionFile::load_if_exists(&path)
        .map_err(|error| ResolveError::VersionFile {
            path: path.clone(),
            message: error.to_string(),
        })?
        .ok_or(ResolveError::NoSpecifier)?;

    file.first()
        .map(ToString::to_string)
        .ok_or(ResolveError::NoSpecifier)
}

/// Catalog entries containing `query`, in catalog order.
#[must_use]
pub fn suggestions(query: &str, catalog: &[String]) -> Vec<String> {
    if query.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|definition| definition.contains(query))
        .cloned()
        .collect()
}
