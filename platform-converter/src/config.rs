//! Run configuration

use crate::engine::EngineOptions;
use std::env;
use std::path::PathBuf;
use unity_bundle::{BuildTarget, CompressionType, DEFAULT_CLASS_PACKAGE_NAME};

/// Everything a conversion run needs, independent of how it was parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Platform code written into every archive
    pub target_platform: BuildTarget,
    /// Input file, or directory in directory mode
    pub input: PathBuf,
    /// Output file, or directory in directory mode
    pub output: PathBuf,
    /// Treat `input` and `output` as directories
    pub directory_mode: bool,
    /// Requested worker count
    pub threads: usize,
    /// Suppress progress and summary output
    pub silent: bool,
    /// Class package (schema resource) to load
    pub class_package: PathBuf,
    /// Directory for staging files
    pub staging_dir: PathBuf,
    /// Codec for converted archives
    pub compression: CompressionType,
}

impl ConvertConfig {
    /// Configuration for converting a single file with defaults elsewhere
    pub fn single_file<I, O>(input: I, output: O, target_platform: BuildTarget) -> Self
    where
        I: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            target_platform,
            input: input.into(),
            output: output.into(),
            directory_mode: false,
            threads: 1,
            silent: false,
            class_package: default_class_package_path(),
            staging_dir: env::temp_dir(),
            compression: CompressionType::Lz4,
        }
    }

    /// Configuration for converting a directory with defaults elsewhere
    pub fn directory<I, O>(input: I, output: O, target_platform: BuildTarget) -> Self
    where
        I: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        Self {
            directory_mode: true,
            ..Self::single_file(input, output, target_platform)
        }
    }

    /// Options handed to every patch engine of the run
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            staging_dir: self.staging_dir.clone(),
            compression: self.compression,
        }
    }
}

/// Places a class package is looked for when none is given: next to the
/// executable, then in the working directory.
pub fn class_package_candidates() -> Vec<PathBuf> {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CLASS_PACKAGE_NAME)));
    let cwd = env::current_dir()
        .ok()
        .map(|dir| dir.join(DEFAULT_CLASS_PACKAGE_NAME));

    let mut candidates: Vec<PathBuf> = exe_dir.into_iter().chain(cwd).collect();
    candidates.dedup();
    if candidates.is_empty() {
        candidates.push(PathBuf::from(DEFAULT_CLASS_PACKAGE_NAME));
    }
    candidates
}

/// Default class package location.
///
/// The first existing candidate from [`class_package_candidates`]; when none
/// exists, the first candidate, so the startup error names where it was
/// expected.
pub fn default_class_package_path() -> PathBuf {
    let candidates = class_package_candidates();
    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return found.clone();
    }
    log::debug!("No class package found in {candidates:?}");
    candidates
        .into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CLASS_PACKAGE_NAME))
}
