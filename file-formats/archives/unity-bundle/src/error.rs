//! Error types for the bundle library

use std::io;
use thiserror::Error;

/// Result type alias for bundle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with a known bundle signature
    #[error("Not a UnityFS bundle (signature {0:?})")]
    InvalidSignature(String),

    /// Invalid bundle format or corrupted archive
    #[error("Invalid bundle format: {0}")]
    InvalidFormat(String),

    /// Unsupported bundle or serialized-file version
    #[error("Unsupported {kind} version: {version}")]
    UnsupportedVersion {
        /// Which structure carried the version
        kind: &'static str,
        /// The version found
        version: u32,
    },

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Decompression error
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// The in-memory structure could not be written back out
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Requested directory node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Schema resource could not be loaded
    #[error("Class package error: {0}")]
    ClassPackage(String),
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Create a new Decompression error
    pub fn decompression<S: Into<String>>(msg: S) -> Self {
        Error::Decompression(msg.into())
    }

    /// Create a new Serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// Check if this error means the input is not a usable archive.
    ///
    /// Truncated files surface as `UnexpectedEof` I/O errors while parsing
    /// and are classified the same way.
    pub fn is_invalid_archive(&self) -> bool {
        match self {
            Error::InvalidSignature(_)
            | Error::InvalidFormat(_)
            | Error::UnsupportedVersion { .. }
            | Error::Decompression(_) => true,
            Error::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::invalid_format("bad header");
        assert_eq!(err.to_string(), "Invalid bundle format: bad header");

        let err = Error::UnsupportedVersion {
            kind: "serialized file",
            version: 5,
        };
        assert_eq!(err.to_string(), "Unsupported serialized file version: 5");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidSignature("UnityWeb".into()).is_invalid_archive());
        assert!(Error::decompression("lz4 block").is_invalid_archive());
        assert!(Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof)).is_invalid_archive());

        assert!(!Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)).is_invalid_archive());
        assert!(!Error::serialization("size mismatch").is_invalid_archive());
        assert!(!Error::NodeNotFound("CAB-0".into()).is_invalid_archive());
    }
}
