//! UnityFS bundle header structures and parsing

use crate::io::{ReadCStringExt, WriteCStringExt};
use crate::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Signature at the start of every UnityFS bundle
pub const UNITYFS_SIGNATURE: &str = "UnityFS";

/// Oldest UnityFS format version we can read
pub const MIN_FORMAT_VERSION: u32 = 6;

/// Newest UnityFS format version we can read
pub const MAX_FORMAT_VERSION: u32 = 8;

/// Archive flag bits stored in [`BundleHeader::flags`]
pub mod flags {
    /// Low six bits select the block-info compression
    pub const COMPRESSION_MASK: u32 = 0x3F;
    /// Block table and directory share one compressed block-info section
    pub const BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;
    /// Block-info section is stored at the end of the file
    pub const BLOCKS_INFO_AT_END: u32 = 0x80;
    /// Written by old web player builds
    pub const OLD_WEB_PLUGIN_COMPATIBILITY: u32 = 0x100;
    /// Block data starts on a 16-byte boundary after the block-info section
    pub const BLOCK_INFO_NEEDS_PADDING: u32 = 0x200;
}

/// Compression codec used for a bundle section or storage block
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// Stored as-is
    None = 0,
    /// Raw LZMA stream with a 5-byte properties header
    Lzma = 1,
    /// LZ4 block
    Lz4 = 2,
    /// LZ4 block produced by the high-compression encoder
    Lz4Hc = 3,
}

impl CompressionType {
    /// Create from the raw codec number
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lzma),
            2 => Some(CompressionType::Lz4),
            3 => Some(CompressionType::Lz4Hc),
            _ => None,
        }
    }

    /// Decode the codec from the low bits of a flag word
    pub fn from_flags(flags: u32) -> Result<Self> {
        let raw = flags & flags::COMPRESSION_MASK;
        Self::from_raw(raw)
            .ok_or_else(|| Error::invalid_format(format!("unknown compression type {raw}")))
    }

    /// Raw codec number
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompressionType::None => "none",
            CompressionType::Lzma => "LZMA",
            CompressionType::Lz4 => "LZ4",
            CompressionType::Lz4Hc => "LZ4HC",
        };
        f.write_str(name)
    }
}

/// Fixed header at the start of a UnityFS bundle (all fields big-endian)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    /// Format version (6, 7 or 8)
    pub format_version: u32,
    /// Engine generation string, e.g. `5.x.x`
    pub unity_version: String,
    /// Engine revision the bundle was built with, e.g. `2019.4.40f1`
    pub unity_revision: String,
    /// Total size of the bundle file in bytes
    pub size: u64,
    /// Size of the block-info section as stored
    pub compressed_blocks_info_size: u32,
    /// Size of the block-info section once decompressed
    pub uncompressed_blocks_info_size: u32,
    /// Archive flags, see [`flags`]
    pub flags: u32,
}

impl BundleHeader {
    /// Read a bundle header from the current position
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = reader.read_cstring()?;
        if signature != UNITYFS_SIGNATURE {
            return Err(Error::InvalidSignature(signature));
        }

        let format_version = reader.read_u32::<BigEndian>()?;
        if !(MIN_FORMAT_VERSION..=MAX_FORMAT_VERSION).contains(&format_version) {
            return Err(Error::UnsupportedVersion {
                kind: "bundle",
                version: format_version,
            });
        }

        let unity_version = reader.read_cstring()?;
        let unity_revision = reader.read_cstring()?;

        let size = reader.read_i64::<BigEndian>()?;
        if size < 0 {
            return Err(Error::invalid_format(format!("negative bundle size {size}")));
        }

        let compressed_blocks_info_size = reader.read_u32::<BigEndian>()?;
        let uncompressed_blocks_info_size = reader.read_u32::<BigEndian>()?;
        let flags = reader.read_u32::<BigEndian>()?;

        let header = Self {
            format_version,
            unity_version,
            unity_revision,
            size: size as u64,
            compressed_blocks_info_size,
            uncompressed_blocks_info_size,
            flags,
        };

        // Reject unknown codecs up front
        header.compression()?;

        log::trace!(
            "Bundle header: v{} {} ({}), size {}, block info {}/{} bytes, flags 0x{:X}",
            header.format_version,
            header.unity_revision,
            header.unity_version,
            header.size,
            header.compressed_blocks_info_size,
            header.uncompressed_blocks_info_size,
            header.flags
        );

        Ok(header)
    }

    /// Write the header at the current position
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_cstring(UNITYFS_SIGNATURE)?;
        writer.write_u32::<BigEndian>(self.format_version)?;
        writer.write_cstring(&self.unity_version)?;
        writer.write_cstring(&self.unity_revision)?;
        writer.write_i64::<BigEndian>(self.size as i64)?;
        writer.write_u32::<BigEndian>(self.compressed_blocks_info_size)?;
        writer.write_u32::<BigEndian>(self.uncompressed_blocks_info_size)?;
        writer.write_u32::<BigEndian>(self.flags)?;
        Ok(())
    }

    /// Number of bytes [`write`](Self::write) produces
    pub fn encoded_len(&self) -> u64 {
        (UNITYFS_SIGNATURE.len() + 1
            + 4
            + self.unity_version.len()
            + 1
            + self.unity_revision.len()
            + 1
            + 8
            + 4
            + 4
            + 4) as u64
    }

    /// Codec used for the block-info section
    pub fn compression(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags)
    }

    /// Whether the block-info section sits at the end of the file
    pub fn blocks_info_at_end(&self) -> bool {
        self.flags & flags::BLOCKS_INFO_AT_END != 0
    }

    /// Whether block data is padded to 16 bytes after the block-info section
    pub fn needs_block_info_padding(&self) -> bool {
        self.flags & flags::BLOCK_INFO_NEEDS_PADDING != 0
    }

    /// Whether the header itself is followed by padding to 16 bytes
    pub fn has_aligned_header(&self) -> bool {
        self.format_version >= 7
    }
}
