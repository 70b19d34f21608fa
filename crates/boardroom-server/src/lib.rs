//! HTTP trigger surface for the Boardroom simulation.
//!
//! A small Axum application exposing the two documents read-only and the
//! two write operations (interventions and resets) that feed the
//! synchronization engine. Writes never bypass the engine: interventions
//! go through [`InterventionHandler`] and resets through
//! [`ResetCoordinator`], so an HTTP caller gets exactly the same
//! guarantees as the background scheduler.
//!
//! [`InterventionHandler`]: boardroom_core::intervene::InterventionHandler
//! [`ResetCoordinator`]: boardroom_core::reset::ResetCoordinator

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
