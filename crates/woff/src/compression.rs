//! zlib (WOFF 1.0) and Brotli (WOFF 2.0) stream adapters.
//!
//! Decompressors read at most one byte past the expected size so callers can
//! tell a short stream from an overlong one without unbounded allocation.

use std::io::{self, Read, Write};

use brotli_decompressor::Decompressor;
use brotlic::CompressorWriter;
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::error::{Result, WoffError};

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Default zlib level used for WOFF 1.0 tables.
pub const DEFAULT_ZLIB_LEVEL: u32 = 9;

pub fn zlib_decompress(data: &[u8], expected: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    ZlibDecoder::new(data).take(expected as u64 + 1).read_to_end(&mut out)?;
    Ok(out)
}

pub fn zlib_compress(data: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn brotli_decompress(data: &[u8], expected: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    Decompressor::new(data, BROTLI_BUFFER_SIZE)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)?;
    Ok(out)
}

pub fn brotli_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut compressor = CompressorWriter::new(Vec::new());
    compressor
        .write_all(data)
        .map_err(|e| WoffError::Compress(format!("brotli stream: {e}")))?;
    compressor
        .into_inner()
        .map_err(|_| WoffError::Compress("brotli stream: failed to finish".to_string()))
}

/// Decompresses a block whose stored form is raw when both lengths match.
pub fn inflate_block(
    stored: &[u8],
    orig_length: usize,
    what: &str,
    decompress: fn(&[u8], usize) -> io::Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    if stored.len() == orig_length {
        return Ok(stored.to_vec());
    }
    let out = decompress(stored, orig_length)
        .map_err(|source| WoffError::Decompress { what: what.to_string(), source })?;
    if out.len() != orig_length {
        return Err(WoffError::Decompress {
            what: what.to_string(),
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected {orig_length} bytes, got {}", out.len()),
            ),
        });
    }
    Ok(out)
}
