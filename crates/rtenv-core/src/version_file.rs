use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the per-directory version marker.
pub const LOCAL_VERSION_FILE: &str = ".rtenv-version";

/// An ordered list of version entries read from a marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFile {
    pub path: PathBuf,
    pub entries: Vec<String>,
}

impl VersionFile {
    /// Read and parse a version file.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the file cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: parse_entries(&content),
        })
    }

    /// Like [`VersionFile::load`], but a missing file is `None`.
    ///
    /// # Errors
    /// Returns I/O errors other than `NotFound`.
    pub fn load_if_exists(path: &Path) -> std::io::Result<Option<Self>> {
        match Self::load(path) {
            Ok(file) => Ok(Some(file)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Write `entries` to `path`, one per line.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the file cannot be written.
    pub fn write(path: &Path, entries: &[String]) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = entries.join("\n");
        content.push('\n');
        std::fs::write(path, content)?;
        log::debug!("Wrote {} to {}", entries.join(" "), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            entries: entries.to_vec(),
        })
    }

    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }
}

/// Split version file content into entries.
///
/// Entries are separated by any whitespace; `#` starts a comment that runs
/// to the end of the line. Entries that could escape the versions directory
/// are dropped.
#[must_use]
pub fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before))
        .flat_map(str::split_whitespace)
        .filter(|entry| is_safe_entry(entry))
        .map(ToString::to_string)
        .collect()
}

/// Split a colon-separated override such as `RTENV_VERSION=1.11.2:system`.
#[must_use]
pub fn parse_override(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && is_safe_entry(entry))
        .map(ToString::to_string)
        .collect()
}

fn is_safe_entry(entry: &str) -> bool {
    !entry.contains('/') && !entry.contains('\\') && entry != "." && entry != ".."
}

/// Walk from `start` up to the filesystem root looking for a local version
/// file.
#[must_use]
pub fn find_local_version_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(LOCAL_VERSION_FILE))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entries_splits_on_whitespace_and_newlines() {
        let entries = parse_entries("1.11.2 1.10.4\n\tsystem\n");

        assert_eq!(entries, vec!["1.11.2", "1.10.4", "system"]);
    }

    #[test]
    fn parse_entries_ignores_comments() {
        let entries = parse_entries("# project runtime\n1.11.2 # pinned\n#1.9.0\n");

        assert_eq!(entries, vec!["1.11.2"]);
    }

    #[test]
    fn parse_entries_drops_path_like_entries() {
        let entries = parse_entries("../../etc 1.11.2 ..\n");

        assert_eq!(entries, vec!["1.11.2"]);
    }

    #[test]
    fn parse_override_splits_on_colons() {
        assert_eq!(
            parse_override("1.11.2::system"),
            vec!["1.11.2".to_string(), "system".to_string()]
        );
        assert!(parse_override("").is_empty());
    }

    #[test]
    fn write_then_load_returns_same_entries() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("version");

        VersionFile::write(&path, &["1.11.2".to_string()]).expect("version file should write");
        let loaded = VersionFile::load(&path).expect("version file should load");

        assert_eq!(loaded.first(), Some("1.11.2"));
        assert_eq!(
            std::fs::read_to_string(&path).expect("read version file"),
            "1.11.2\n"
        );
    }

    #[test]
    fn load_if_exists_returns_none_for_missing_file() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");

        let loaded = VersionFile::load_if_exists(&temp_dir.path().join("missing"))
            .expect("missing file is not an error");

        assert!(loaded.is_none());
    }

    #[test]
    fn find_local_version_file_walks_up_directories() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&nested).expect("create nested dirs");
        let marker = temp_dir.path().join("a").join(LOCAL_VERSION_FILE);
        std::fs::write(&marker, "1.10.4\n").expect("write marker");

        assert_eq!(find_local_version_file(&nested), Some(marker));
    }

    #[test]
    fn find_local_version_file_prefers_nearest_marker() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let nested = temp_dir.path().join("project");
        std::fs::create_dir_all(&nested).expect("create project dir");
        std::fs::write(temp_dir.path().join(LOCAL_VERSION_FILE), "1.9.0\n").expect("write outer");
        std::fs::write(nested.join(LOCAL_VERSION_FILE), "1.11.2\n").expect("write inner");

        assert_eq!(
            find_local_version_file(&nested),
            Some(nested.join(LOCAL_VERSION_FILE))
        );
    }
}
