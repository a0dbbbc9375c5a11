//! Test utilities for bundles
//!
//! Real bundles are large and tied to specific engine releases, so tests
//! synthesise their inputs instead.
//!
//! The [`serialized_builder`] module produces serialized (assets) files with
//! a chosen format version, engine version and target platform.
//!
//! The [`bundle_builder`] module wraps serialized files and resource blobs
//! into UnityFS bundles with any supported codec.
pub mod bundle_builder;
pub mod serialized_builder;

pub use bundle_builder::{BundleBuilder, sample_bundle};
pub use serialized_builder::SerializedFileBuilder;
