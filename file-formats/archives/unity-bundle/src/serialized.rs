//! Serialized (assets) file header and metadata prefix
//!
//! Only the part of the metadata that precedes the type tree is modelled:
//! the engine version string and the target platform. Everything after the
//! platform field is carried through as opaque bytes, so changing the
//! platform never moves any other byte of the file.

use crate::io::{ReadCStringExt, WriteCStringExt};
use crate::{Error, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Oldest serialized-file version with the endianness flag in the header
pub const MIN_SUPPORTED_VERSION: u32 = 9;

/// First version with the 64-bit header extension
pub const LARGE_FILES_VERSION: u32 = 22;

/// Newest serialized-file version accepted
pub const MAX_SUPPORTED_VERSION: u32 = 64;

/// Byte order of the metadata and object data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little-endian (every modern build target)
    Little,
    /// Big-endian
    Big,
}

impl Endianness {
    fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(Endianness::Little),
            1 => Ok(Endianness::Big),
            other => Err(Error::invalid_format(format!(
                "invalid endianness flag {other}"
            ))),
        }
    }

    fn as_flag(self) -> u8 {
        match self {
            Endianness::Little => 0,
            Endianness::Big => 1,
        }
    }
}

/// 64-bit header extension present from version 22
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeHeader {
    /// Size of the metadata section
    pub metadata_size: u32,
    /// Total size of the serialized file
    pub file_size: u64,
    /// Offset of the object data
    pub data_offset: u64,
    /// Reserved
    pub unknown: u64,
}

/// Fixed serialized-file header (big-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializedFileHeader {
    /// Metadata size (zero in version 22+, see [`LargeHeader`])
    pub metadata_size: u32,
    /// File size (zero in version 22+)
    pub file_size: u32,
    /// Format version
    pub version: u32,
    /// Data offset (zero in version 22+)
    pub data_offset: u32,
    /// Byte order of everything after the header
    pub endianness: Endianness,
    /// Reserved bytes after the endianness flag
    pub reserved: [u8; 3],
    /// Version 22+ extension
    pub large: Option<LargeHeader>,
}

impl SerializedFileHeader {
    /// Encoded header length
    pub fn encoded_len(&self) -> usize {
        if self.large.is_some() { 48 } else { 20 }
    }

    /// Metadata size, whichever header slot carries it
    pub fn effective_metadata_size(&self) -> u64 {
        self.large
            .map_or(u64::from(self.metadata_size), |l| u64::from(l.metadata_size))
    }

    /// File size, whichever header slot carries it
    pub fn effective_file_size(&self) -> u64 {
        self.large
            .map_or(u64::from(self.file_size), |l| l.file_size)
    }

    /// Data offset, whichever header slot carries it
    pub fn effective_data_offset(&self) -> u64 {
        self.large
            .map_or(u64::from(self.data_offset), |l| l.data_offset)
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let metadata_size = reader.read_u32::<BigEndian>()?;
        let file_size = reader.read_u32::<BigEndian>()?;
        let version = reader.read_u32::<BigEndian>()?;
        let data_offset = reader.read_u32::<BigEndian>()?;

        if !(MIN_SUPPORTED_VERSION..=MAX_SUPPORTED_VERSION).contains(&version) {
            return Err(Error::UnsupportedVersion {
                kind: "serialized file",
                version,
            });
        }

        let endianness = Endianness::from_flag(reader.read_u8()?)?;
        let mut reserved = [0u8; 3];
        reader.read_exact(&mut reserved)?;

        let large = if version >= LARGE_FILES_VERSION {
            let metadata_size = reader.read_u32::<BigEndian>()?;
            let file_size = reader.read_i64::<BigEndian>()?;
            let data_offset = reader.read_i64::<BigEndian>()?;
            let unknown = reader.read_i64::<BigEndian>()?;
            if file_size < 0 || data_offset < 0 {
                return Err(Error::invalid_format(
                    "negative size in serialized file header",
                ));
            }
            Some(LargeHeader {
                metadata_size,
                file_size: file_size as u64,
                data_offset: data_offset as u64,
                unknown: unknown as u64,
            })
        } else {
            None
        };

        Ok(Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            endianness,
            reserved,
            large,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.metadata_size)?;
        writer.write_u32::<BigEndian>(self.file_size)?;
        writer.write_u32::<BigEndian>(self.version)?;
        writer.write_u32::<BigEndian>(self.data_offset)?;
        writer.write_u8(self.endianness.as_flag())?;
        writer.write_all(&self.reserved)?;
        if let Some(large) = &self.large {
            writer.write_u32::<BigEndian>(large.metadata_size)?;
            writer.write_i64::<BigEndian>(large.file_size as i64)?;
            writer.write_i64::<BigEndian>(large.data_offset as i64)?;
            writer.write_i64::<BigEndian>(large.unknown as i64)?;
        }
        Ok(())
    }
}

/// The modelled prefix of the metadata section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFileMetadata {
    /// Engine version the file was built with, e.g. `2019.4.40f1`
    pub unity_version: String,
    /// Build target code
    pub target_platform: u32,
}

/// A serialized file loaded from a bundle node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFile {
    /// Fixed header
    pub header: SerializedFileHeader,
    /// Version string and target platform
    pub metadata: SerializedFileMetadata,
    remainder: Vec<u8>,
}

impl SerializedFile {
    /// Parse a serialized file from its raw bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = SerializedFileHeader::read(&mut cursor)?;

        let unity_version = cursor.read_cstring()?;
        let target_platform = match header.endianness {
            Endianness::Little => cursor.read_u32::<LittleEndian>()?,
            Endianness::Big => cursor.read_u32::<BigEndian>()?,
        };

        let consumed = cursor.position() as usize;
        let remainder = bytes[consumed..].to_vec();

        log::trace!(
            "Serialized file v{}: engine {}, platform {}, {} bytes",
            header.version,
            unity_version,
            target_platform,
            bytes.len()
        );

        Ok(Self {
            header,
            metadata: SerializedFileMetadata {
                unity_version,
                target_platform,
            },
            remainder,
        })
    }

    /// Format version
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Engine version string embedded in the metadata
    pub fn unity_version(&self) -> &str {
        &self.metadata.unity_version
    }

    /// Build target code
    pub fn target_platform(&self) -> u32 {
        self.metadata.target_platform
    }

    /// Overwrite the build target code
    pub fn set_target_platform(&mut self, platform: u32) {
        self.metadata.target_platform = platform;
    }

    /// Length of the serialized output
    pub fn encoded_len(&self) -> u64 {
        (self.header.encoded_len() + self.metadata.unity_version.len() + 1 + 4 + self.remainder.len())
            as u64
    }

    /// Check that the header's declared sizes describe this content
    pub fn validate(&self) -> Result<()> {
        let actual = self.encoded_len();
        let declared = self.header.effective_file_size();
        if declared != actual {
            return Err(Error::serialization(format!(
                "header declares {declared} bytes but content is {actual} bytes"
            )));
        }

        let metadata_size = self.header.effective_metadata_size();
        let modelled = (self.metadata.unity_version.len() + 1 + 4) as u64;
        if metadata_size < modelled {
            return Err(Error::serialization(format!(
                "metadata size {metadata_size} is smaller than its fixed prefix ({modelled} bytes)"
            )));
        }

        let metadata_end = self.header.encoded_len() as u64 + metadata_size;
        let data_offset = self.header.effective_data_offset();
        if data_offset < metadata_end || data_offset > declared {
            return Err(Error::serialization(format!(
                "data offset {data_offset} outside {metadata_end}..={declared}"
            )));
        }

        Ok(())
    }

    /// Serialize to a fresh buffer
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut out = Vec::with_capacity(self.encoded_len() as usize);
        self.header.write(&mut out)?;
        out.write_cstring(&self.metadata.unity_version)?;
        match self.header.endianness {
            Endianness::Little => out.write_u32::<LittleEndian>(self.metadata.target_platform)?,
            Endianness::Big => out.write_u32::<BigEndian>(self.metadata.target_platform)?,
        }
        out.extend_from_slice(&self.remainder);
        Ok(out)
    }
}
