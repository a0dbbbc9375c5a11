//! Block table and directory stored in the bundle's block-info section

use crate::header::CompressionType;
use crate::io::{ReadCStringExt, WriteCStringExt};
use crate::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Sanity limit on the number of storage blocks
pub const MAX_BLOCK_COUNT: usize = 1 << 24;

/// Sanity limit on the number of directory nodes
pub const MAX_NODE_COUNT: usize = 1 << 20;

/// Storage block flag bits
pub mod block_flags {
    /// Low six bits select the block codec
    pub const COMPRESSION_MASK: u16 = 0x3F;
    /// Block may be streamed
    pub const STREAMED: u16 = 0x40;
}

/// Directory node flag bits
pub mod node_flags {
    /// Node is a directory
    pub const DIRECTORY: u32 = 0x1;
    /// Node was deleted
    pub const DELETED: u32 = 0x2;
    /// Node holds a serialized (assets) file
    pub const SERIALIZED_FILE: u32 = 0x4;
}

/// One compressed chunk of the bundle's data stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageBlock {
    /// Size after decompression
    pub uncompressed_size: u32,
    /// Size as stored in the file
    pub compressed_size: u32,
    /// Codec and streaming flags
    pub flags: u16,
}

impl StorageBlock {
    /// Codec this block was stored with
    pub fn compression(&self) -> Result<CompressionType> {
        CompressionType::from_flags(u32::from(self.flags & block_flags::COMPRESSION_MASK))
    }
}

/// A named file inside the bundle, addressed in the decompressed data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Offset into the decompressed data stream
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
    /// Node flags, see [`node_flags`]
    pub flags: u32,
    /// Path of the node, e.g. `CAB-4f1c…`
    pub path: String,
}

impl DirectoryNode {
    /// Whether the node is flagged as a serialized file
    pub fn is_serialized_file(&self) -> bool {
        self.flags & node_flags::SERIALIZED_FILE != 0
    }

    /// End offset of the node in the data stream
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Decompressed contents of the block-info section
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlocksInfo {
    /// Hash of the uncompressed data; not verified by readers
    pub uncompressed_data_hash: [u8; 16],
    /// Storage blocks in stream order
    pub blocks: Vec<StorageBlock>,
    /// Directory nodes
    pub nodes: Vec<DirectoryNode>,
}

impl BlocksInfo {
    /// Parse a decompressed block-info section
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut uncompressed_data_hash = [0u8; 16];
        reader.read_exact(&mut uncompressed_data_hash)?;

        let block_count = read_count(reader, MAX_BLOCK_COUNT, "block")?;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            blocks.push(StorageBlock {
                uncompressed_size: reader.read_u32::<BigEndian>()?,
                compressed_size: reader.read_u32::<BigEndian>()?,
                flags: reader.read_u16::<BigEndian>()?,
            });
        }

        let node_count = read_count(reader, MAX_NODE_COUNT, "node")?;
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let offset = reader.read_i64::<BigEndian>()?;
            let size = reader.read_i64::<BigEndian>()?;
            if offset < 0 || size < 0 {
                return Err(Error::invalid_format(format!(
                    "node with negative extent ({offset}, {size})"
                )));
            }
            nodes.push(DirectoryNode {
                offset: offset as u64,
                size: size as u64,
                flags: reader.read_u32::<BigEndian>()?,
                path: reader.read_cstring()?,
            });
        }

        log::trace!("Block info: {} blocks, {} nodes", blocks.len(), nodes.len());

        Ok(Self {
            uncompressed_data_hash,
            blocks,
            nodes,
        })
    }

    /// Write the uncompressed block-info section
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.uncompressed_data_hash)?;

        writer.write_i32::<BigEndian>(self.blocks.len() as i32)?;
        for block in &self.blocks {
            writer.write_u32::<BigEndian>(block.uncompressed_size)?;
            writer.write_u32::<BigEndian>(block.compressed_size)?;
            writer.write_u16::<BigEndian>(block.flags)?;
        }

        writer.write_i32::<BigEndian>(self.nodes.len() as i32)?;
        for node in &self.nodes {
            writer.write_i64::<BigEndian>(node.offset as i64)?;
            writer.write_i64::<BigEndian>(node.size as i64)?;
            writer.write_u32::<BigEndian>(node.flags)?;
            writer.write_cstring(&node.path)?;
        }

        Ok(())
    }

    /// Serialize to a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Length of the decompressed data stream described by the block table
    pub fn total_uncompressed_size(&self) -> u64 {
        self.blocks
            .iter()
            .map(|b| u64::from(b.uncompressed_size))
            .sum()
    }

    /// Length of the stored block data
    pub fn total_compressed_size(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.compressed_size)).sum()
    }

    /// Check that every node lies inside a data stream of `data_len` bytes
    pub fn validate_nodes(&self, data_len: u64) -> Result<()> {
        for node in &self.nodes {
            if node.end() > data_len {
                return Err(Error::invalid_format(format!(
                    "node {} ({}..{}) exceeds data stream of {data_len} bytes",
                    node.path,
                    node.offset,
                    node.end()
                )));
            }
        }
        Ok(())
    }

    /// Find a node by path
    pub fn find_node(&self, path: &str) -> Option<(usize, &DirectoryNode)> {
        self.nodes.iter().enumerate().find(|(_, n)| n.path == path)
    }
}

fn read_count<R: Read>(reader: &mut R, limit: usize, what: &str) -> Result<usize> {
    let count = reader.read_i32::<BigEndian>()?;
    if count < 0 || count as usize > limit {
        return Err(Error::invalid_format(format!("implausible {what} count {count}")));
    }
    Ok(count as usize)
}
