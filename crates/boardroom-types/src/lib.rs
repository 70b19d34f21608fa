//! Shared type definitions for the Boardroom company simulation.
//!
//! This crate owns the data model that every other crate agrees on:
//!
//! - [`state`] -- the mutable [`CompanyState`] document, resource deltas,
//!   and the bounded social feed.
//! - [`event`] -- generated event drafts, the [`Proposal`] result of a
//!   generation pass, committed [`EventRecord`] log entries, and
//!   intervention kinds.
//! - [`roster`] -- executive and feed persona definitions used to seed
//!   generation and validate proposers.
//!
//! [`CompanyState`]: state::CompanyState
//! [`Proposal`]: event::Proposal
//! [`EventRecord`]: event::EventRecord

pub mod event;
pub mod roster;
pub mod state;

pub use event::{EventDraft, EventRecord, InterventionKind, Proposal, UnknownKind};
pub use roster::{Executive, FeedPersona, find_executive};
pub use state::{CompanyState, Delta, Reaction};
