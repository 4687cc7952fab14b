//! WOFF 1.0 and WOFF 2.0 web font containers.
//!
//! Decodes `wOFF`/`wOF2` files into plain sfnt fonts or collections, and
//! encodes sfnt data back into either container. WOFF 2.0 glyf, loca and
//! hmtx transforms are handled in both directions.
//!
//! ```no_run
//! use webfont_woff::{ContainerVersion, DecodeOptions, Decoder};
//!
//! let woff2 = std::fs::read("font.woff2")?;
//! let decoded = Decoder::new(DecodeOptions::new().repair_names(false)).decode(&woff2)?;
//! std::fs::write(format!("font.{}", decoded.extension()), decoded.to_sfnt()?)?;
//!
//! let woff = webfont_woff::encode(&decoded.to_sfnt()?, ContainerVersion::Woff1)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod binary;
mod collection;
mod compression;
mod decoder;
mod directory;
mod encoder;
mod error;
mod font;
mod glyf;
mod header;
mod options;
mod reconstruct;
mod sfnt;
mod tags;

pub use binary::{CHECKSUM_MAGIC, FontBuffer, Reader, checksum, table_checksum};
pub use collection::{CollectionFontEntry, CollectionHeader, TTC_VERSION_1, TTC_VERSION_2};
pub use decoder::{DecodedFile, Decoder};
pub use directory::TableRecord;
pub use encoder::Encoder;
pub use error::{Result, WoffError};
pub use font::Font;
pub use glyf::{
    BoundingBox, CompositeGlyph, Glyph, LocaFormat, Point, SimpleGlyph, TransformedGlyf, decode_glyf, encode_glyf,
    read_glyf, read_loca, write_glyf,
};
pub use header::{ContainerHeader, ContainerVersion};
pub use options::{DEFAULT_MAX_DECOMPRESSED_SIZE, DecodeOptions, EncodeOptions};
pub use reconstruct::repair_names;
pub use sfnt::{SfntFile, write_collection, write_font};
pub use tags::{CFF_FLAVOR, TRUETYPE_FLAVOR};

/// Decodes a WOFF or WOFF2 file into sfnt bytes with default options.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::default().decode(data)?.to_sfnt()
}

/// Encodes an sfnt font or collection with default options for `version`.
pub fn encode(sfnt: &[u8], version: ContainerVersion) -> Result<Vec<u8>> {
    Encoder::new(EncodeOptions::new(version)).encode(sfnt)
}
