//! Conversation analysis core: turns an uploaded recording, transcript or pre-built
//! analysis into one canonical [`analysis::AnalysisRecord`] tracked by a job.
//!
//! `web` depends only on this crate; provider crates below it are reached through
//! [`pipeline::Pipeline`] and their errors are translated in [`error`].

pub mod analysis;
pub mod archive;
pub mod classifier;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod job;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod quintile;
pub mod transcript;
pub mod validation;

pub use classifier::Artifact;
pub use job::{InMemoryJobStore, Job, JobId, JobStatus, JobStore};
pub use pipeline::{Pipeline, Providers, Settings, SubmitOptions};
