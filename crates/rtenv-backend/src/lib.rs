mod error;
mod prompt;
mod traits;
mod types;

pub use error::BuildError;
pub use prompt::{Prompt, ScriptedPrompt};
pub use traits::{BuildRequest, Builder, BuilderInfo};
pub use types::{
    BuildOptions, BuildStatus, DEBUG_SUFFIX, InstallReceipt, InstalledVersion, RuntimeVersion,
    VersionParseError,
};
