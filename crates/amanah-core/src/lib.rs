//! Core types and the verification workflow for the Amanah platform.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the entity records, the status state machine, the permission
//! grid, the aggregate counters and the volunteer match view, and ties them
//! together in the [`workflow::Workflow`] orchestrator over any
//! [`store::RecordStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod counts;
pub mod error;
pub mod lifecycle;
pub mod matching;
pub mod permission;
pub mod record;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::{TransitionOutcome, Workflow};
