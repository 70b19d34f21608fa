//! LLM generation pipeline for the Boardroom simulation.
//!
//! Turns a read-only state snapshot into proposed events, executive
//! commentary, and feed reactions by rendering `minijinja` prompts,
//! calling an LLM backend over HTTP, and parsing the free-text reply
//! back into typed payloads. The pipeline is the slow, fallible half of
//! the system: every failure is absorbed into an explicit fallback
//! proposal so the synchronization engine upstream never blocks on or
//! errors from generation.
//!
//! # Modules
//!
//! - [`llm`] -- backend enum dispatch (`OpenAI`-compatible, Anthropic).
//! - [`prompt`] -- template loading and rendering.
//! - [`parse`] -- multi-strategy JSON recovery from model output.
//! - [`news`] -- RSS headline seeding.
//! - [`retry`] -- the retry-with-backoff policy for backend calls.
//! - [`pipeline`] -- [`GenerationPipeline`], the production
//!   `EventProposer`.
//! - [`error`] -- [`PipelineError`].
//!
//! [`GenerationPipeline`]: pipeline::GenerationPipeline
//! [`PipelineError`]: error::PipelineError

pub mod error;
pub mod llm;
pub mod news;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod retry;

pub use error::PipelineError;
pub use pipeline::{GenerationPipeline, PipelineSettings};
