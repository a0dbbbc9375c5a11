//! Conversion jobs and their outcomes

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use unity_bundle::{BuildTarget, Error};

/// One archive to convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    /// Archive to read; never modified
    pub source: PathBuf,
    /// Where the converted archive is written
    pub destination: PathBuf,
    /// Platform code written into the archive
    pub target_platform: BuildTarget,
}

impl ConversionJob {
    /// Create a job
    pub fn new<S, D>(source: S, destination: D, target_platform: BuildTarget) -> Self
    where
        S: Into<PathBuf>,
        D: Into<PathBuf>,
    {
        Self {
            source: source.into(),
            destination: destination.into(),
            target_platform,
        }
    }

    /// File name of the source, for progress lines
    pub fn display_name(&self) -> Cow<'_, str> {
        self.source
            .file_name()
            .map_or_else(|| self.source.to_string_lossy(), |name| name.to_string_lossy())
    }

    /// Directory the destination file lives in
    pub fn destination_dir(&self) -> &Path {
        match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Why a job was skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// The input is not a recognisable archive
    #[error("not a valid asset bundle: {0}")]
    InvalidArchive(String),

    /// The decompressed structure could not be written back out
    #[error("reserialization failed: {0}")]
    SerializationFailure(String),

    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl SkipReason {
    /// Classify a library error raised while converting one archive
    pub fn from_error(error: &Error) -> Self {
        if error.is_invalid_archive() {
            return SkipReason::InvalidArchive(error.to_string());
        }
        match error {
            Error::Io(e) => SkipReason::Io(e.to_string()),
            other => SkipReason::SerializationFailure(other.to_string()),
        }
    }
}

/// What happened to one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The converted archive was written
    Success {
        /// Size of the written archive
        bytes_written: u64,
        /// Platform code the archive carried before conversion
        previous_platform: BuildTarget,
    },
    /// The job was skipped; no output was written
    Skipped(SkipReason),
}

/// A job together with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// The job that ran
    pub job: ConversionJob,
    /// What happened
    pub outcome: Outcome,
}

impl ConversionResult {
    /// Whether the job produced an output file
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// Skip reason, if the job was skipped
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            Outcome::Skipped(reason) => Some(reason),
            Outcome::Success { .. } => None,
        }
    }
}
