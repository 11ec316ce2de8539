mod backend;
mod detection;

pub use backend::ExternalBuilder;
pub use detection::{BuilderDetection, DEFAULT_BUILDER, detect_builder};
