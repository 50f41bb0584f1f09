// Adapters - External system implementations

pub mod decode_libav;
pub mod toml_config;

// Re-export adapters
pub use decode_libav::{LibavFrameSource, LibavFrameSourceOpener};
pub use toml_config::AnalysisConfig;
