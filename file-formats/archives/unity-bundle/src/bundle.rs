//! UnityFS bundle reading, in-memory materialisation and re-emission
//!
//! A bundle is read in two stages. [`BundleFile`] holds the raw, possibly
//! compressed file open and knows its header and directory. Calling
//! [`BundleFile::decompress_to_memory`] closes the file and yields a
//! [`Bundle`], the fully decompressed data stream plus directory, which can
//! then be written back out with any of its nodes replaced.

use crate::blocks::{BlocksInfo, DirectoryNode, StorageBlock, block_flags};
use crate::compression::{compress, decompress};
use crate::header::{BundleHeader, CompressionType, flags};
use crate::io::{align_reader, align_writer, padding_for};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Chunk size used when splitting the data stream into storage blocks
pub const DEFAULT_CHUNK_SIZE: usize = 0x20000;

/// Sanity limit on the decompressed block-info section
pub const MAX_BLOCKS_INFO_SIZE: u32 = 1 << 28;

/// Alignment used for the header and the block-info padding
const SECTION_ALIGNMENT: u64 = 16;

/// Options for writing a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Codec for the storage blocks and the block-info section
    pub compression: CompressionType,
    /// Maximum uncompressed size of a storage block
    pub chunk_size: usize,
}

impl WriteOptions {
    /// Options for a fully uncompressed bundle
    pub fn uncompressed() -> Self {
        Self {
            compression: CompressionType::None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Options for a bundle compressed with `compression`
    pub fn compressed(compression: CompressionType) -> Self {
        Self {
            compression,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::compressed(CompressionType::Lz4)
    }
}

/// Replacement contents for one directory node, keyed by node path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Path of the node to replace
    pub path: String,
    /// New contents
    pub data: Vec<u8>,
}

impl Replacement {
    /// Create a replacement for the node at `path`
    pub fn new<S: Into<String>>(path: S, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

/// A bundle opened in its stored (raw) form
#[derive(Debug)]
pub struct BundleFile<R = BufReader<File>> {
    reader: R,
    path: Option<PathBuf>,
    header: BundleHeader,
    blocks_info: BlocksInfo,
    data_offset: u64,
    file_len: u64,
}

impl BundleFile<BufReader<File>> {
    /// Open a bundle from disk and read its header and directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut bundle = Self::from_reader(BufReader::new(file))?;
        bundle.path = Some(path.to_path_buf());
        log::debug!(
            "Opened bundle {} ({} nodes, {} blocks)",
            path.display(),
            bundle.blocks_info.nodes.len(),
            bundle.blocks_info.blocks.len()
        );
        Ok(bundle)
    }
}

impl<R: Read + Seek> BundleFile<R> {
    /// Read header and directory from any seekable source
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = BundleHeader::read(&mut reader)?;
        if header.has_aligned_header() {
            align_reader(&mut reader, SECTION_ALIGNMENT)?;
        }

        let (blocks_info, data_offset) = Self::read_blocks_info(&mut reader, &header, file_len)?;

        let stored = blocks_info.total_compressed_size();
        if data_offset.saturating_add(stored) > file_len {
            return Err(Error::invalid_format(format!(
                "block data ({stored} bytes at {data_offset}) runs past end of file ({file_len} bytes)"
            )));
        }

        Ok(Self {
            reader,
            path: None,
            header,
            blocks_info,
            data_offset,
            file_len,
        })
    }

    fn read_blocks_info(
        reader: &mut R,
        header: &BundleHeader,
        file_len: u64,
    ) -> Result<(BlocksInfo, u64)> {
        let stored_size = u64::from(header.compressed_blocks_info_size);
        if stored_size > file_len {
            return Err(Error::invalid_format(format!(
                "block info of {stored_size} bytes in a {file_len} byte file"
            )));
        }
        if header.uncompressed_blocks_info_size > MAX_BLOCKS_INFO_SIZE {
            return Err(Error::invalid_format(format!(
                "implausible block info size {}",
                header.uncompressed_blocks_info_size
            )));
        }

        let mut stored = vec![0u8; stored_size as usize];
        if header.blocks_info_at_end() {
            let resume = reader.stream_position()?;
            reader.seek(SeekFrom::Start(file_len - stored_size))?;
            reader.read_exact(&mut stored)?;
            reader.seek(SeekFrom::Start(resume))?;
        } else {
            reader.read_exact(&mut stored)?;
        }

        let raw = decompress(
            &stored,
            header.compression()?,
            header.uncompressed_blocks_info_size as usize,
        )?;
        let blocks_info = BlocksInfo::read(&mut raw.as_slice())?;

        if header.needs_block_info_padding() {
            align_reader(reader, SECTION_ALIGNMENT)?;
        }
        let data_offset = reader.stream_position()?;

        Ok((blocks_info, data_offset))
    }

    /// Bundle header
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Block table and directory
    pub fn blocks_info(&self) -> &BlocksInfo {
        &self.blocks_info
    }

    /// Path the bundle was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size of the stored file
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Read and decompress every storage block into one data stream
    pub fn read_data(&mut self) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(self.data_offset))?;

        let mut data = Vec::new();
        let mut stored = Vec::new();
        for (index, block) in self.blocks_info.blocks.iter().enumerate() {
            stored.resize(block.compressed_size as usize, 0);
            self.reader.read_exact(&mut stored)?;

            let method = block.compression()?;
            let chunk = decompress(&stored, method, block.uncompressed_size as usize).map_err(
                |e| {
                    log::debug!("Block {index} ({method}) failed to decompress: {e}");
                    e
                },
            )?;
            data.extend_from_slice(&chunk);
        }

        Ok(data)
    }

    /// Decompress the whole bundle into memory, closing the underlying file
    pub fn decompress_to_memory(mut self) -> Result<Bundle> {
        let data = self.read_data()?;
        self.blocks_info.validate_nodes(data.len() as u64)?;

        let Self {
            header,
            blocks_info,
            ..
        } = self;

        Ok(Bundle {
            header,
            nodes: blocks_info.nodes,
            data,
        })
    }

    /// Re-emit this bundle compressed with `compression`.
    ///
    /// Returns the number of bytes written.
    pub fn pack<W: Write>(self, writer: &mut W, compression: CompressionType) -> Result<u64> {
        let bundle = self.decompress_to_memory()?;
        bundle.write(writer, &WriteOptions::compressed(compression))
    }
}

/// A bundle fully decompressed into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    header: BundleHeader,
    nodes: Vec<DirectoryNode>,
    data: Vec<u8>,
}

impl Bundle {
    /// Assemble a bundle from a header template and node contents.
    ///
    /// Nodes are laid out back to back in the given order. The header's
    /// size and block-info fields are recomputed on write.
    pub fn from_nodes(header: BundleHeader, nodes: Vec<(String, u32, Vec<u8>)>) -> Self {
        let mut data = Vec::new();
        let mut directory = Vec::with_capacity(nodes.len());
        for (path, node_flags, contents) in nodes {
            directory.push(DirectoryNode {
                offset: data.len() as u64,
                size: contents.len() as u64,
                flags: node_flags,
                path,
            });
            data.extend_from_slice(&contents);
        }
        Self {
            header,
            nodes: directory,
            data,
        }
    }

    /// Bundle header as read
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Directory nodes
    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    /// Decompressed data stream
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Contents of the node at `index`
    pub fn node_data(&self, index: usize) -> Result<&[u8]> {
        let node = self
            .nodes
            .get(index)
            .ok_or_else(|| Error::NodeNotFound(format!("index {index}")))?;
        self.data
            .get(node.offset as usize..node.end() as usize)
            .ok_or_else(|| Error::invalid_format(format!("node {} out of range", node.path)))
    }

    /// Find a node by path
    pub fn find_node(&self, path: &str) -> Option<(usize, &DirectoryNode)> {
        self.nodes.iter().enumerate().find(|(_, n)| n.path == path)
    }

    /// Index of the node holding the bundle's serialized file.
    ///
    /// The first node flagged as a serialized file wins; bundles whose
    /// builder did not set the flag fall back to the first node.
    pub fn serialized_file_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .position(DirectoryNode::is_serialized_file)
            .or(if self.nodes.is_empty() { None } else { Some(0) })
    }

    /// Write the bundle unchanged
    pub fn write<W: Write>(&self, writer: &mut W, options: &WriteOptions) -> Result<u64> {
        self.write_with_replacements(writer, &[], options)
    }

    /// Write the bundle with the contents of some nodes substituted.
    ///
    /// Returns the number of bytes written.
    pub fn write_with_replacements<W: Write>(
        &self,
        writer: &mut W,
        replacements: &[Replacement],
        options: &WriteOptions,
    ) -> Result<u64> {
        if options.chunk_size == 0 || options.chunk_size > u32::MAX as usize {
            return Err(Error::compression(format!(
                "invalid chunk size {}",
                options.chunk_size
            )));
        }
        for replacement in replacements {
            if self.find_node(&replacement.path).is_none() {
                return Err(Error::NodeNotFound(replacement.path.clone()));
            }
        }

        // Lay out the new data stream
        let mut data = Vec::with_capacity(self.data.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            let contents = match replacements.iter().find(|r| r.path == node.path) {
                Some(replacement) => replacement.data.as_slice(),
                None => self.node_data(index)?,
            };
            nodes.push(DirectoryNode {
                offset: data.len() as u64,
                size: contents.len() as u64,
                flags: node.flags,
                path: node.path.clone(),
            });
            data.extend_from_slice(contents);
        }

        // Compress the stream chunk by chunk
        let mut blocks = Vec::new();
        let mut stored_blocks = Vec::new();
        for chunk in data.chunks(options.chunk_size) {
            let (method, stored) = compress_or_store(chunk, options.compression)?;
            blocks.push(StorageBlock {
                uncompressed_size: chunk.len() as u32,
                compressed_size: stored.len() as u32,
                flags: method.as_raw() as u16 & block_flags::COMPRESSION_MASK,
            });
            stored_blocks.push(stored);
        }

        let blocks_info = BlocksInfo {
            uncompressed_data_hash: [0; 16],
            blocks,
            nodes,
        };
        let raw_info = blocks_info.to_bytes()?;
        let (info_method, stored_info) = compress_or_store(&raw_info, options.compression)?;

        let preserved = self.header.flags
            & (flags::OLD_WEB_PLUGIN_COMPATIBILITY | flags::BLOCK_INFO_NEEDS_PADDING);
        let mut header = BundleHeader {
            format_version: self.header.format_version,
            unity_version: self.header.unity_version.clone(),
            unity_revision: self.header.unity_revision.clone(),
            size: 0,
            compressed_blocks_info_size: stored_info.len() as u32,
            uncompressed_blocks_info_size: raw_info.len() as u32,
            flags: info_method.as_raw() | flags::BLOCKS_AND_DIRECTORY_COMBINED | preserved,
        };

        // Work out the final size before anything is written
        let mut size = header.encoded_len();
        if header.has_aligned_header() {
            size += padding_for(size, SECTION_ALIGNMENT);
        }
        size += stored_info.len() as u64;
        if header.needs_block_info_padding() {
            size += padding_for(size, SECTION_ALIGNMENT);
        }
        size += stored_blocks.iter().map(|b| b.len() as u64).sum::<u64>();
        header.size = size;

        header.write(writer)?;
        let mut position = header.encoded_len();
        if header.has_aligned_header() {
            position = align_writer(writer, position, SECTION_ALIGNMENT)?;
        }
        writer.write_all(&stored_info)?;
        position += stored_info.len() as u64;
        if header.needs_block_info_padding() {
            position = align_writer(writer, position, SECTION_ALIGNMENT)?;
        }
        for stored in &stored_blocks {
            writer.write_all(stored)?;
            position += stored.len() as u64;
        }
        writer.flush()?;

        debug_assert_eq!(position, size);
        log::debug!(
            "Wrote bundle: {} nodes, {} blocks, {} -> {} bytes ({})",
            blocks_info.nodes.len(),
            stored_blocks.len(),
            data.len(),
            size,
            options.compression
        );

        Ok(size)
    }
}

/// Compress `data`, falling back to storing it when compression does not help
fn compress_or_store(data: &[u8], method: CompressionType) -> Result<(CompressionType, Vec<u8>)> {
    if method == CompressionType::None || data.is_empty() {
        return Ok((CompressionType::None, data.to_vec()));
    }
    let compressed = compress(data, method)?;
    if compressed.len() >= data.len() {
        log::trace!(
            "{method} did not shrink {} byte chunk, storing it uncompressed",
            data.len()
        );
        return Ok((CompressionType::None, data.to_vec()));
    }
    Ok((method, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::node_flags;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn header(format_version: u32, extra_flags: u32) -> BundleHeader {
        BundleHeader {
            format_version,
            unity_version: "5.x.x".to_string(),
            unity_revision: "2020.3.48f1".to_string(),
            size: 0,
            compressed_blocks_info_size: 0,
            uncompressed_blocks_info_size: 0,
            flags: extra_flags,
        }
    }

    fn sample_bundle(format_version: u32, extra_flags: u32) -> Bundle {
        let mut big = Vec::new();
        for i in 0..25_000u32 {
            big.extend_from_slice(format!("{:08}", i % 1000).as_bytes());
        }
        Bundle::from_nodes(
            header(format_version, extra_flags),
            vec![
                (
                    "CAB-aaaa".to_string(),
                    node_flags::SERIALIZED_FILE,
                    b"serialized file bytes".repeat(100),
                ),
                ("CAB-aaaa.resS".to_string(), 0, big),
            ],
        )
    }

    fn reread(bytes: Vec<u8>) -> Bundle {
        BundleFile::from_reader(Cursor::new(bytes))
            .unwrap()
            .decompress_to_memory()
            .unwrap()
    }

    #[test]
    fn test_write_then_read_every_codec() {
        for method in [
            CompressionType::None,
            CompressionType::Lz4,
            CompressionType::Lz4Hc,
            CompressionType::Lzma,
        ] {
            let bundle = sample_bundle(7, 0);
            let mut out = Vec::new();
            let written = bundle
                .write(&mut out, &WriteOptions::compressed(method))
                .unwrap();
            assert_eq!(written, out.len() as u64);

            let parsed = reread(out);
            assert_eq!(parsed.nodes(), bundle.nodes(), "codec {method}");
            assert_eq!(parsed.data(), bundle.data());
        }
    }

    #[test]
    fn test_multiple_blocks_and_declared_size() {
        let bundle = sample_bundle(6, 0);
        let mut out = Vec::new();
        bundle
            .write(&mut out, &WriteOptions::compressed(CompressionType::Lz4))
            .unwrap();

        let file = BundleFile::from_reader(Cursor::new(out.clone())).unwrap();
        assert_eq!(file.header().size, out.len() as u64);
        assert!(file.blocks_info().blocks.len() > 1);
        assert!(file.file_len() < bundle.data().len() as u64);
    }

    #[test]
    fn test_padding_flag_is_preserved() {
        let bundle = sample_bundle(8, flags::BLOCK_INFO_NEEDS_PADDING);
        let mut out = Vec::new();
        bundle.write(&mut out, &WriteOptions::uncompressed()).unwrap();

        let file = BundleFile::from_reader(Cursor::new(out.clone())).unwrap();
        assert!(file.header().needs_block_info_padding());
        assert_eq!(file.data_offset % 16, 0);
        assert_eq!(reread(out).data(), bundle.data());
    }

    #[test]
    fn test_replacement_changes_only_target_node() {
        let bundle = sample_bundle(7, 0);
        let replacement = Replacement::new("CAB-aaaa", b"patched".to_vec());
        let mut out = Vec::new();
        bundle
            .write_with_replacements(&mut out, &[replacement], &WriteOptions::uncompressed())
            .unwrap();

        let parsed = reread(out);
        assert_eq!(parsed.node_data(0).unwrap(), b"patched");
        assert_eq!(parsed.node_data(1).unwrap(), bundle.node_data(1).unwrap());
        assert_eq!(parsed.nodes()[1].offset, 7);
    }

    #[test]
    fn test_unknown_replacement_rejected() {
        let bundle = sample_bundle(7, 0);
        let err = bundle
            .write_with_replacements(
                &mut Vec::new(),
                &[Replacement::new("CAB-missing", Vec::new())],
                &WriteOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(path) if path == "CAB-missing"));
    }

    #[test]
    fn test_blocks_info_at_end() {
        // Hand-assemble a bundle whose block info trails the data
        let payload = b"tail-directory payload".to_vec();
        let info = BlocksInfo {
            uncompressed_data_hash: [0; 16],
            blocks: vec![StorageBlock {
                uncompressed_size: payload.len() as u32,
                compressed_size: payload.len() as u32,
                flags: 0,
            }],
            nodes: vec![DirectoryNode {
                offset: 0,
                size: payload.len() as u64,
                flags: node_flags::SERIALIZED_FILE,
                path: "CAB-tail".to_string(),
            }],
        };
        let raw_info = info.to_bytes().unwrap();
        let mut hdr = header(6, flags::BLOCKS_INFO_AT_END);
        hdr.compressed_blocks_info_size = raw_info.len() as u32;
        hdr.uncompressed_blocks_info_size = raw_info.len() as u32;
        hdr.size = hdr.encoded_len() + (payload.len() + raw_info.len()) as u64;

        let mut out = Vec::new();
        hdr.write(&mut out).unwrap();
        out.extend_from_slice(&payload);
        out.extend_from_slice(&raw_info);

        let parsed = reread(out);
        assert_eq!(parsed.node_data(0).unwrap(), payload.as_slice());
    }

    #[test]
    fn test_truncated_bundle_is_invalid() {
        let bundle = sample_bundle(7, 0);
        let mut out = Vec::new();
        bundle.write(&mut out, &WriteOptions::uncompressed()).unwrap();
        out.truncate(out.len() / 2);

        let err = BundleFile::from_reader(Cursor::new(out)).unwrap_err();
        assert!(err.is_invalid_archive(), "{err}");
    }

    #[test]
    fn test_serialized_file_index_fallback() {
        let flagged = sample_bundle(7, 0);
        assert_eq!(flagged.serialized_file_index(), Some(0));

        let unflagged = Bundle::from_nodes(
            header(7, 0),
            vec![("first".to_string(), 0, vec![1]), ("second".to_string(), 0, vec![2])],
        );
        assert_eq!(unflagged.serialized_file_index(), Some(0));

        let empty = Bundle::from_nodes(header(7, 0), Vec::new());
        assert_eq!(empty.serialized_file_index(), None);
    }
}
