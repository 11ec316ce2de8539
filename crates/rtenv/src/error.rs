use thiserror::Error;

use rtenv_core::{
    DispatchError, InstallError, RehashError, ResolveError, SettingsError, StoreError,
    UninstallError,
};

/// Everything a command can fail with. Every variant exits with status 1;
/// builder statuses travel through [`rtenv_core::InstallOutcome`] instead.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Message { message: String },

    #[error("runtime-build not found; install it or point RTENV_BUILDER at it")]
    BuilderNotFound,

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Rehash(#[from] RehashError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Uninstall(#[from] UninstallError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Extra lines printed after the error itself.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Install(InstallError::Resolve(ResolveError::NoMatch { suggestions, .. }))
                if !suggestions.is_empty() =>
            {
                Some(format!(
                    "Did you mean one of these?\n  {}",
                    suggestions.join("\n  ")
                ))
            }
            Self::Install(InstallError::Resolve(ResolveError::NoSpecifier)) => Some(
                "Specify a version to install, or set one with `rtenv local <version>'.".to_string(),
            ),
            _ => None,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::io("I/O error", source)
    }
}

#[cfg(test)]
mod tests {
    use rtenv_core::{InstallError, ResolveError};

    use super::CliError;

    #[test]
    fn unresolved_specifier_hint_lists_suggestions() {
        let error = CliError::from(InstallError::Resolve(ResolveError::NoMatch {
            specifier: "2.1".to_string(),
            suggestions: vec!["dist-2.1.0".to_string()],
        }));

        assert_eq!(error.exit_code(), 1);
        assert_eq!(
            error.hint().as_deref(),
            Some("Did you mean one of these?\n  dist-2.1.0")
        );
        assert_eq!(error.to_string(), "No definition matches `2.1'");
    }

    #[test]
    fn io_errors_keep_context() {
        let error = CliError::io(
            "failed to write .rtenv-version",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(error.to_string(), "failed to write .rtenv-version: denied");
        assert!(error.hint().is_none());
    }
}
