//! Error types for the Boardroom engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: boardroom_core::config::ConfigError,
    },

    /// The store failed to create the initial documents.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: boardroom_store::StoreError,
    },

    /// The generation pipeline failed to assemble.
    #[error("pipeline error: {source}")]
    Pipeline {
        /// The underlying pipeline error.
        #[from]
        source: boardroom_pipeline::PipelineError,
    },

    /// The data directory could not be created.
    #[error("data directory error: {message}")]
    DataDir {
        /// Description of the failure.
        message: String,
    },
}
