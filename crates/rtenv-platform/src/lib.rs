mod environment;
mod paths;

pub use environment::{EnvSnapshot, vars};
pub use paths::{PathsError, RtenvPaths};
