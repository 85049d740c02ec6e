//! Fact acquisition for the Locus pipeline.
//!
//! Candidate businesses are snapshotted and content-addressed, rendered into a
//! prompt, sent to a [`locus_core::completion::CompletionClient`], validated,
//! and committed through a [`locus_core::store::EnrichmentStore`]. The
//! [`Orchestrator`] repeats batches until the backlog is gone and keeps
//! metrics current.

pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod prompt;
pub mod resolve;
pub mod runner;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use error::{Error, Result, ValidationError};
pub use jobs::{JobRegistry, JobStatus};
pub use orchestrator::{Orchestrator, RefreshOptions, RefreshSummary, StopReason};
pub use prompt::PromptVariant;
pub use runner::{EnrichmentRunner, RunOptions, RunSummary};
pub use settings::EnrichmentSettings;

#[cfg(test)]
mod tests;
