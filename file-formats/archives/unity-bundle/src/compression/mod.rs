//! Block codecs used by UnityFS bundles

mod lz4;
mod lzma;

use crate::header::CompressionType;
use crate::{Error, Result};

/// Compress `data` with the given codec.
///
/// [`CompressionType::Lz4Hc`] produces a plain LZ4 block; both decode the
/// same way.
pub fn compress(data: &[u8], method: CompressionType) -> Result<Vec<u8>> {
    match method {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lzma => lzma::compress(data),
        CompressionType::Lz4 | CompressionType::Lz4Hc => Ok(lz4::compress(data)),
    }
}

/// Decompress `data` that is expected to expand to exactly `expected_size` bytes
pub fn decompress(data: &[u8], method: CompressionType, expected_size: usize) -> Result<Vec<u8>> {
    let output = match method {
        CompressionType::None => data.to_vec(),
        CompressionType::Lzma => lzma::decompress(data, expected_size)?,
        CompressionType::Lz4 | CompressionType::Lz4Hc => lz4::decompress(data, expected_size)?,
    };

    if output.len() != expected_size {
        return Err(Error::decompression(format!(
            "{method} data expanded to {} bytes, expected {expected_size}",
            output.len()
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..2000u32 {
            data.extend_from_slice(format!("m_Name{} ", i % 17).as_bytes());
        }
        data
    }

    #[test]
    fn test_all_codecs_round_trip() {
        let original = sample();
        for method in [
            CompressionType::None,
            CompressionType::Lzma,
            CompressionType::Lz4,
            CompressionType::Lz4Hc,
        ] {
            let packed = compress(&original, method).unwrap();
            let unpacked = decompress(&packed, method, original.len()).unwrap();
            assert_eq!(unpacked, original, "codec {method}");
        }
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let original = sample();
        let packed = compress(&original, CompressionType::None).unwrap();
        let err = decompress(&packed, CompressionType::None, original.len() + 1).unwrap_err();
        assert!(err.is_invalid_archive());
    }
}
