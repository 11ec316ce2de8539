use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Command failed: {stderr}")]
    CommandFailed { stderr: String },

    #[error("Failed to start {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl BuildError {
    pub fn spawn_failed(program: impl Into<String>, error: &std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
