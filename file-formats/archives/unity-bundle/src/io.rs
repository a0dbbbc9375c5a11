//! Binary I/O helpers shared by the bundle and serialized-file parsers

use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// Upper bound for NUL-terminated strings embedded in headers.
///
/// Version and path strings are short; anything longer means we are reading
/// garbage rather than a header.
pub const MAX_CSTRING_LEN: usize = 4096;

/// Extension trait for reading NUL-terminated strings
pub trait ReadCStringExt: Read {
    /// Read bytes up to (and consuming) a NUL terminator
    fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            self.read_exact(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            if bytes.len() == MAX_CSTRING_LEN {
                return Err(Error::invalid_format(
                    "unterminated string in header".to_string(),
                ));
            }
            bytes.push(byte[0]);
        }
        String::from_utf8(bytes)
            .map_err(|_| Error::invalid_format("header string is not valid UTF-8"))
    }
}

impl<R: Read + ?Sized> ReadCStringExt for R {}

/// Extension trait for writing NUL-terminated strings
pub trait WriteCStringExt: Write {
    /// Write the string followed by a NUL terminator
    fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.write_all(value.as_bytes())?;
        self.write_all(&[0])?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteCStringExt for W {}

/// Number of padding bytes needed to bring `position` to `alignment`
#[inline]
pub fn padding_for(position: u64, alignment: u64) -> u64 {
    let rem = position % alignment;
    if rem == 0 { 0 } else { alignment - rem }
}

/// Seek forward to the next multiple of `alignment`
pub fn align_reader<R: Seek>(reader: &mut R, alignment: u64) -> Result<()> {
    let position = reader.stream_position()?;
    let pad = padding_for(position, alignment);
    if pad > 0 {
        reader.seek(SeekFrom::Current(pad as i64))?;
    }
    Ok(())
}

/// Write zero bytes until `position` reaches the next multiple of `alignment`.
///
/// Returns the new position.
pub fn align_writer<W: Write>(writer: &mut W, position: u64, alignment: u64) -> Result<u64> {
    let pad = padding_for(position, alignment);
    if pad > 0 {
        writer.write_all(&vec![0u8; pad as usize])?;
    }
    Ok(position + pad)
}
