//! LZ4 block compression and decompression

use crate::{Error, Result};

/// Decompress a raw LZ4 block
pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    lz4_flex::block::decompress(data, expected_size).map_err(|e| {
        log::debug!(
            "LZ4 decompression failed on {} input bytes: {e}",
            data.len()
        );
        Error::decompression(format!("LZ4: {e}"))
    })
}

/// Compress into a raw LZ4 block (no frame, no size prefix)
pub(crate) fn compress(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}
