//! Command-line interface definition

use crate::config::{ConvertConfig, default_class_package_path};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use unity_bundle::{BuildTarget, CompressionType};

/// Codec choices for converted archives
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputCompression {
    /// LZ4 blocks (what the engine builds by default)
    Lz4,
    /// LZMA blocks
    Lzma,
    /// Uncompressed
    None,
}

impl From<OutputCompression> for CompressionType {
    fn from(value: OutputCompression) -> Self {
        match value {
            OutputCompression::Lz4 => CompressionType::Lz4,
            OutputCompression::Lzma => CompressionType::Lzma,
            OutputCompression::None => CompressionType::None,
        }
    }
}

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "unity-platform-converter")]
#[command(about = "Retarget Unity asset bundles to another build platform", long_about = None)]
#[command(after_help = "Common platforms: 5 (pc), 13 (android), 20 (webgl)")]
#[command(version)]
pub struct Cli {
    /// Target platform code or name (e.g. 5, 13, 20, pc, android, webgl)
    #[arg(short, long)]
    pub platform: BuildTarget,

    /// Input bundle, or directory of bundles with --directory-mode
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output bundle, or output directory with --directory-mode
    #[arg(short, long)]
    pub output: PathBuf,

    /// Treat input and output as directories
    #[arg(short, long)]
    pub directory_mode: bool,

    /// Number of worker threads for directory mode
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Suppress progress and summary output
    #[arg(short, long)]
    pub silent: bool,

    /// Class package file (default: classdata.yaml next to the executable, then in the working directory)
    #[arg(long, env = "UNITY_CLASS_PACKAGE")]
    pub class_package: Option<PathBuf>,

    /// Directory for temporary staging files
    #[arg(long, env = "UNITY_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Compression for converted bundles
    #[arg(long, value_enum, default_value_t = OutputCompression::Lz4)]
    pub compression: OutputCompression,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level requested by `-v`/`-q`, if any
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        match (self.verbose, self.quiet) {
            (0, false) => None,
            (0, true) => Some(log::LevelFilter::Error),
            (1, _) => Some(log::LevelFilter::Info),
            (2, _) => Some(log::LevelFilter::Debug),
            _ => Some(log::LevelFilter::Trace),
        }
    }

    /// Resolve defaults into a run configuration
    pub fn into_config(self) -> ConvertConfig {
        ConvertConfig {
            target_platform: self.platform,
            input: self.input,
            output: self.output,
            directory_mode: self.directory_mode,
            threads: self.threads,
            silent: self.silent,
            class_package: self
                .class_package
                .unwrap_or_else(default_class_package_path),
            staging_dir: self.staging_dir.unwrap_or_else(std::env::temp_dir),
            compression: self.compression.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from([
            "unity-platform-converter",
            "--platform",
            "13",
            "--input",
            "a.bundle",
            "--output",
            "b.bundle",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), None);

        let config = cli.into_config();
        assert_eq!(config.target_platform, BuildTarget::ANDROID);
        assert!(!config.directory_mode);
        assert_eq!(config.threads, 1);
        assert_eq!(config.compression, CompressionType::Lz4);
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "unity-platform-converter",
            "-p",
            "webgl",
            "-i",
            "in",
            "-o",
            "out",
            "-d",
            "-t",
            "4",
            "-s",
            "--class-package",
            "schema/classdata.yaml",
            "--staging-dir",
            "scratch",
            "--compression",
            "lzma",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), Some(log::LevelFilter::Debug));

        let config = cli.into_config();
        assert_eq!(config.target_platform, BuildTarget::WEBGL);
        assert!(config.directory_mode && config.silent);
        assert_eq!(config.threads, 4);
        assert_eq!(config.class_package, PathBuf::from("schema/classdata.yaml"));
        assert_eq!(config.staging_dir, PathBuf::from("scratch"));
        assert_eq!(config.compression, CompressionType::Lzma);
    }

    #[test]
    fn test_unknown_platform_name_rejected() {
        let result = Cli::try_parse_from([
            "unity-platform-converter",
            "-p",
            "dreamcast",
            "-i",
            "a",
            "-o",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_platform_required() {
        let result = Cli::try_parse_from(["unity-platform-converter", "-i", "a", "-o", "b"]);
        assert!(result.is_err());
    }
}
