use std::{io, result};

use read_fonts::{ReadError, types::Tag};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WoffError {
    #[error("failed to read font: {0}")]
    ReadError(#[from] ReadError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof { offset: usize, needed: usize, available: usize },

    #[error("bad signature: expected {expected:#010x}, got {actual:#010x}")]
    BadSignature { expected: u32, actual: u32 },

    #[error("not a WOFF or WOFF2 file (signature {0:#010x})")]
    UnknownSignature(u32),

    #[error("reserved header field must be zero, got {0}")]
    NonZeroReserved(u16),

    #[error("declared length {declared} does not match data length {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("table '{tag}' lies outside the file (offset {offset}, length {length})")]
    TableOutOfBounds { tag: Tag, offset: u32, length: u32 },

    #[error("table '{tag}' has compressed length {compressed} larger than original length {original}")]
    CompressedLarger { tag: Tag, compressed: u32, original: u32 },

    #[error("table '{tag}' decompressed to {actual} bytes, expected {expected}")]
    SizeMismatch { tag: Tag, expected: usize, actual: usize },

    #[error("{what} region is truncated: expected {expected} bytes, got {actual}")]
    ShortRead { what: &'static str, expected: usize, actual: usize },

    #[error("declared decompressed size {declared} exceeds limit {limit}")]
    TooLarge { declared: u64, limit: u64 },

    #[error("font has no tables")]
    NoTables,

    #[error("duplicate table '{0}'")]
    DuplicateTable(Tag),

    #[error("malformed UIntBase128: {0}")]
    InvalidBase128(&'static str),

    #[error("malformed 255UInt16 value")]
    Invalid255UInt16,

    #[error("malformed glyph {glyph}: {reason}")]
    MalformedGlyph { glyph: u32, reason: &'static str },

    #[error("malformed transformed '{tag}' table: {reason}")]
    MalformedTransform { tag: Tag, reason: &'static str },

    #[error("glyph {0} coordinates overflow")]
    CoordinateOverflow(u32),

    #[error("transformed glyf and loca must appear together")]
    GlyfLocaMismatch,

    #[error("empty glyph {0} has an explicit bounding box")]
    EmptyGlyphWithBbox(u32),

    #[error("composite glyph {0} has no bounding box")]
    CompositeWithoutBbox(u32),

    #[error("invalid hmtx transform flags {0:#04x}")]
    InvalidHmtxFlags(u8),

    #[error("unknown transform version {version} for table '{tag}'")]
    UnknownTransform { tag: Tag, version: u8 },

    #[error("font {font} references table index {index}, but only {num_tables} tables exist")]
    CollectionIndexOutOfRange { font: usize, index: u16, num_tables: usize },

    #[error("invalid collection: {0}")]
    InvalidCollection(&'static str),

    #[error("required table '{0}' not found")]
    MissingTable(Tag),

    #[error("table '{tag}' is too short: {len} bytes")]
    TableTooShort { tag: Tag, len: usize },

    #[error("glyf table of {0} bytes does not fit short loca offsets")]
    LocaOverflow(usize),

    #[error("invalid sfnt: {0}")]
    InvalidSfnt(&'static str),

    #[error("exporting a collection with transformed tables is not supported")]
    TransformedCollection,

    #[error("WOFF 1.0 cannot hold font collections")]
    Woff1Collection,

    #[error("failed to decompress {what}: {source}")]
    Decompress {
        what: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to compress {0}")]
    Compress(String),

    #[error("failed to rebuild name table: {0}")]
    NameBuild(#[from] write_fonts::BuilderError),
}

pub type Result<T> = result::Result<T, WoffError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn converts<E>()
    where
        WoffError: From<E>,
    {
    }

    #[test]
    fn test_library_errors_convert() {
        converts::<ReadError>();
        converts::<io::Error>();
        converts::<write_fonts::BuilderError>();
    }
}
