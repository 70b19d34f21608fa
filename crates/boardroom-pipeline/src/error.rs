//! Error types for the generation pipeline.
//!
//! Uses `thiserror` for typed errors surfaced through prompt rendering,
//! backend calls, response parsing, and news fetching. Callers of the
//! pipeline never see these: every public generation entry point recovers
//! by taking the explicit fallback branch instead.

/// Errors that can occur inside the generation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The LLM response could not be parsed into a usable payload.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The news feed could not be fetched or contained no items.
    #[error("news error: {0}")]
    News(String),
}
