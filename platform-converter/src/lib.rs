//! Unity platform converter
//!
//! Rewrites the target-platform field of UnityFS asset bundles and re-emits
//! them recompressed, for a single file or a whole directory, optionally on
//! several worker threads.
//!
//! The pieces, from the bottom up:
//!
//! - [`engine::PatchEngine`] converts one archive and reports the outcome
//!   as a value; a bad input never aborts a batch.
//! - [`partition`] deals jobs out round-robin to worker threads.
//! - [`orchestrator::run`] discovers inputs, runs the workers and produces a
//!   [`orchestrator::BatchSummary`].

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod job;
pub mod orchestrator;
pub mod partition;
pub mod utils;

pub use config::ConvertConfig;
pub use engine::{EngineOptions, PatchEngine};
pub use job::{ConversionJob, ConversionResult, Outcome, SkipReason};
pub use orchestrator::{BatchSummary, run};
pub use partition::{Partitioner, partition};
