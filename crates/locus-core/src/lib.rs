//! Core types and trait definitions for the Locus enrichment pipeline.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::EnrichmentStore`]; provider adapters implement
//! [`completion::CompletionClient`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod business;
pub mod completion;
pub mod error;
pub mod facts;
pub mod metrics;
pub mod request;
pub mod spatial;
pub mod staleness;
pub mod store;

pub use error::{Error, Result};
