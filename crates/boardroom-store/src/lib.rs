//! Lock-scoped JSON document persistence for the Boardroom simulation.
//!
//! This crate owns the single process-wide exclusive lock that serializes
//! every read and write of the two persisted documents (company state and
//! event history). The lock is intentionally coarse: the documents are
//! small and commits are rare compared to generation latency, so
//! correctness wins over parallel read throughput.
//!
//! See [`StateStore`] for the contract.
//!
//! [`StateStore`]: store::StateStore

pub mod store;

pub use store::{StateStore, StoreError, StoreGuard, StorePaths};
