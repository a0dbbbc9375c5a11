//! LZMA compression and decompression
//!
//! Bundles store LZMA data as a 5-byte properties header followed by the raw
//! stream; the unpacked size comes from the block table, not the header.

use crate::{Error, Result};
use lzma_rs::compress::{Options as CompressOptions, UnpackedSize as CompressUnpackedSize};
use lzma_rs::decompress::{Options as DecompressOptions, UnpackedSize};
use std::io::{BufReader, Cursor};

/// Decompress a header-without-size LZMA stream
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut input = BufReader::new(Cursor::new(data));
    let mut output = Vec::with_capacity(expected_size);
    let options = DecompressOptions {
        unpacked_size: UnpackedSize::UseProvided(Some(expected_size as u64)),
        ..Default::default()
    };

    lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options).map_err(|e| {
        log::debug!(
            "LZMA decompression failed, first bytes: {:02X?}",
            &data[..16.min(data.len())]
        );
        Error::decompression(format!("LZMA: {e:?}"))
    })?;

    Ok(output)
}

/// Compress into a header-without-size LZMA stream
pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = BufReader::new(Cursor::new(data));
    let mut output = Vec::new();
    let options = CompressOptions {
        unpacked_size: CompressUnpackedSize::SkipWritingToHeader,
    };

    lzma_rs::lzma_compress_with_options(&mut input, &mut output, &options)
        .map_err(|e| Error::compression(format!("LZMA compression failed: {e:?}")))?;

    Ok(output)
}
