//! Shared utilities for the converter CLI

pub mod format;
pub mod progress;

pub use format::*;
pub use progress::*;
