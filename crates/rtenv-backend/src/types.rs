use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Suffix appended to the version name of a debug build.
pub const DEBUG_SUFFIX: &str = "-debug";

/// A runtime version in `major.minor.patch[-pre]` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuntimeVersion(semver::Version);

impl RuntimeVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.0.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .major
            .cmp(&other.0.major)
            .then(self.0.minor.cmp(&other.0.minor))
            .then(self.0.patch.cmp(&other.0.patch))
            .then_with(|| self.0.pre.cmp(&other.0.pre))
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z[-pre] format, got: {input}")]
    InvalidFormat { input: String },
}

impl FromStr for RuntimeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        semver::Version::parse(trimmed)
            .map(Self)
            .map_err(|_| VersionParseError::InvalidFormat {
                input: s.trim().to_string(),
            })
    }
}

/// Record written next to an installed prefix after a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub definition: String,
    #[serde(default)]
    pub debug: bool,
    pub installed_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub builder_version: Option<String>,
}

/// One entry of the version store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub name: String,
    pub prefix: PathBuf,
    pub has_bin: bool,
    pub receipt: Option<InstallReceipt>,
}

impl InstalledVersion {
    /// A version counts as installed once its `bin` directory exists.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.has_bin
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.name.ends_with(DEBUG_SUFFIX)
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Parsed version, ignoring the debug suffix. `None` for names that are
    /// not semantic versions (for example distribution names).
    #[must_use]
    pub fn runtime_version(&self) -> Option<RuntimeVersion> {
        self.name
            .strip_suffix(DEBUG_SUFFIX)
            .unwrap_or(&self.name)
            .parse()
            .ok()
    }
}

/// Flags forwarded to the external builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuildOptions {
    pub keep_sources: bool,
    pub verbose: bool,
    pub patch: bool,
    pub quiet: bool,
    pub debug: bool,
}

impl BuildOptions {
    /// Command-line flags understood by the builder, in a stable order.
    #[must_use]
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.keep_sources {
            flags.push("--keep");
        }
        if self.verbose {
            flags.push("--verbose");
        }
        if self.patch {
            flags.push("--patch");
        }
        if self.quiet {
            flags.push("--quiet");
        }
        if self.debug {
            flags.push("--debug");
        }
        flags
    }
}

/// Exit status reported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildStatus(i32);

impl BuildStatus {
    pub const SUCCESS: Self = Self(0);
    /// Status used when the build is interrupted before the builder exits.
    pub const INTERRUPTED: Self = Self(1);
    /// The builder does not know the requested definition.
    pub const DEFINITION_NOT_FOUND: Self = Self(2);
    /// The builder could not be run at all.
    pub const NOT_RUNNABLE: Self = Self(127);

    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    #[must_use]
    pub fn is_definition_not_found(self) -> bool {
        self == Self::DEFINITION_NOT_FOUND
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(name: &str) -> InstalledVersion {
        InstalledVersion {
            name: name.to_string(),
            prefix: PathBuf::from("/rtenv/versions").join(name),
            has_bin: true,
            receipt: None,
        }
    }

    #[test]
    fn test_parse_version_with_v_prefix() {
        let v: RuntimeVersion = "v1.11.2".parse().unwrap();
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 11);
        assert_eq!(v.patch(), 2);
    }

    #[test]
    fn test_parse_prerelease_version() {
        let v: RuntimeVersion = "1.12.0-rc1".parse().unwrap();
        assert!(v.is_prerelease());
        assert_eq!(v.to_string(), "1.12.0-rc1");
    }

    #[test]
    fn test_parse_version_invalid_format() {
        let result: Result<RuntimeVersion, _> = "1.11".parse();
        assert!(matches!(
            result,
            Err(VersionParseError::InvalidFormat { ref input }) if input == "1.11"
        ));
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        let v9: RuntimeVersion = "1.9.4".parse().unwrap();
        let v10: RuntimeVersion = "1.10.0".parse().unwrap();
        assert!(v10 > v9);
    }

    #[test]
    fn test_prerelease_ranks_below_release() {
        let rc: RuntimeVersion = "1.11.0-rc2".parse().unwrap();
        let release: RuntimeVersion = "1.11.0".parse().unwrap();
        let beta: RuntimeVersion = "1.11.0-beta3".parse().unwrap();
        assert!(release > rc);
        assert!(rc > beta);
    }

    #[test]
    fn installed_version_detects_debug_suffix() {
        let debug = installed("1.11.2-debug");

        assert!(debug.is_debug());
        assert_eq!(debug.runtime_version(), Some(RuntimeVersion::new(1, 11, 2)));
        assert!(!installed("1.11.2").is_debug());
    }

    #[test]
    fn installed_version_without_semver_name_has_no_runtime_version() {
        assert!(installed("nightly").runtime_version().is_none());
    }

    #[test]
    fn build_options_translate_to_builder_flags() {
        let options = BuildOptions {
            keep_sources: true,
            verbose: false,
            patch: true,
            quiet: false,
            debug: true,
        };

        assert_eq!(options.flags(), vec!["--keep", "--patch", "--debug"]);
        assert!(BuildOptions::default().flags().is_empty());
    }

    #[test]
    fn build_status_classifies_codes() {
        assert!(BuildStatus::from_code(0).is_success());
        assert!(BuildStatus::from_code(2).is_definition_not_found());
        assert!(!BuildStatus::from_code(1).is_success());
        assert_eq!(BuildStatus::from_code(77).code(), 77);
    }

    #[test]
    fn install_receipt_round_trips_through_json() {
        let receipt = InstallReceipt {
            definition: "1.11.2".to_string(),
            debug: false,
            installed_at: chrono::DateTime::from_timestamp(1_700_000_000, 0)
                .expect("valid timestamp"),
            builder_version: Some("runtime-build 20240101".to_string()),
        };

        let json = serde_json::to_string(&receipt).expect("receipt should serialize");
        let parsed: InstallReceipt = serde_json::from_str(&json).expect("receipt should parse");

        assert_eq!(parsed, receipt);
    }
}
