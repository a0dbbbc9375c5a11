//! Bundle fixture builder

use super::SerializedFileBuilder;
use crate::blocks::node_flags;
use crate::bundle::{Bundle, WriteOptions};
use crate::header::{BundleHeader, CompressionType};
use crate::Result;
use std::fs;
use std::path::Path;

/// Builder for synthetic UnityFS bundles
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    format_version: u32,
    unity_version: String,
    unity_revision: String,
    flags: u32,
    compression: CompressionType,
    nodes: Vec<(String, u32, Vec<u8>)>,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleBuilder {
    /// Empty format-7 bundle compressed with LZ4
    pub fn new() -> Self {
        Self {
            format_version: 7,
            unity_version: "5.x.x".to_string(),
            unity_revision: "2019.4.40f1".to_string(),
            flags: 0,
            compression: CompressionType::Lz4,
            nodes: Vec::new(),
        }
    }

    /// Set the bundle format version
    pub fn format_version(mut self, version: u32) -> Self {
        self.format_version = version;
        self
    }

    /// Set the engine revision recorded in the bundle header
    pub fn unity_revision<S: Into<String>>(mut self, revision: S) -> Self {
        self.unity_revision = revision.into();
        self
    }

    /// Extra archive flags to carry (padding, web compatibility)
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Codec for the stored bundle
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Add a node flagged as a serialized file
    pub fn serialized_file<S: Into<String>>(mut self, path: S, data: Vec<u8>) -> Self {
        self.nodes
            .push((path.into(), node_flags::SERIALIZED_FILE, data));
        self
    }

    /// Add a plain resource node
    pub fn resource<S: Into<String>>(mut self, path: S, data: Vec<u8>) -> Self {
        self.nodes.push((path.into(), 0, data));
        self
    }

    /// Assemble the in-memory bundle
    pub fn to_bundle(&self) -> Bundle {
        let header = BundleHeader {
            format_version: self.format_version,
            unity_version: self.unity_version.clone(),
            unity_revision: self.unity_revision.clone(),
            size: 0,
            compressed_blocks_info_size: 0,
            uncompressed_blocks_info_size: 0,
            flags: self.flags,
        };
        Bundle::from_nodes(header, self.nodes.clone())
    }

    /// Produce the stored bundle bytes
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.to_bundle()
            .write(&mut out, &WriteOptions::compressed(self.compression))?;
        Ok(out)
    }

    /// Write the stored bundle to `path`
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.build()?)?;
        Ok(())
    }
}

/// A typical single-asset bundle: one serialized file plus its resource blob
pub fn sample_bundle(target_platform: u32) -> BundleBuilder {
    let assets = SerializedFileBuilder::new()
        .target_platform(target_platform)
        .build();
    let resource: Vec<u8> = b"texture-bytes:".repeat(12_000);

    BundleBuilder::new()
        .serialized_file("CAB-5d40a2c0e5a3b1f4a0d6c1e2b3f4a5d6", assets)
        .resource("CAB-5d40a2c0e5a3b1f4a0d6c1e2b3f4a5d6.resS", resource)
}
