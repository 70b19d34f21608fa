//! Concurrent state-synchronization engine for the Boardroom simulation.
//!
//! This crate owns the rules that make the simulation safe to advance from
//! two directions at once: the background scheduler cycle and foreground
//! interventions both compute their deltas off-lock against a snapshot,
//! then commit on-lock against the *latest* persisted state, so no commit
//! is ever applied to a stale base and no delta is applied twice.
//!
//! # Modules
//!
//! - [`commit`] -- delta application, derived-label evaluation, and the
//!   locked commit protocol.
//! - [`config`] -- configuration loading from `boardroom-config.yaml`
//!   into strongly-typed structs.
//! - [`intervene`] -- the foreground [`InterventionHandler`].
//! - [`propose`] -- the [`EventProposer`] seam between the engine and the
//!   slow generation pipeline, plus a deterministic stub.
//! - [`replicate`] -- the post-commit [`ReplicationSink`] seam.
//! - [`reset`] -- the [`ResetCoordinator`] cancellation protocol.
//! - [`scheduler`] -- the periodic [`SimulationScheduler`] daemon loop.
//!
//! [`EventProposer`]: propose::EventProposer
//! [`InterventionHandler`]: intervene::InterventionHandler
//! [`ReplicationSink`]: replicate::ReplicationSink
//! [`ResetCoordinator`]: reset::ResetCoordinator
//! [`SimulationScheduler`]: scheduler::SimulationScheduler

pub mod commit;
pub mod config;
pub mod intervene;
pub mod propose;
pub mod replicate;
pub mod reset;
pub mod scheduler;
