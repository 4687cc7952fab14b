//! Table directory records for both container versions.

use std::collections::HashSet;

use log::debug;
use read_fonts::types::Tag;

use crate::{
    binary::{FontBuffer, Reader, padding, table_checksum},
    error::{Result, WoffError},
    tags::{EXPLICIT_TAG_INDEX, GLYF, KNOWN_TAGS, LOCA, known_tag_index},
};

/// Size of a WOFF 1.0 directory entry.
pub const WOFF1_RECORD_LEN: usize = 20;

/// Transform version meaning "no transform" for glyf and loca.
pub const GLYF_NULL_TRANSFORM: u8 = 3;

/// One table of the container together with its current bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    /// Raw WOFF2 flag byte: known-tag index in bits 0-5, transform version in 6-7.
    pub flags: u8,
    /// File offset (WOFF 1.0) or offset in the decompressed stream (WOFF 2.0).
    pub offset: u32,
    /// Bytes the table occupies in the container (WOFF 1.0 zlib data, or
    /// the WOFF 2.0 stream slice). Kept as read after decoding.
    pub comp_length: u32,
    pub orig_length: u32,
    /// WOFF 2.0 transform length; zero when the field was absent.
    pub transform_length: u32,
    pub checksum: u32,
    pub transformed: bool,
    pub(crate) data: Vec<u8>,
}

impl TableRecord {
    pub fn new(tag: Tag, data: Vec<u8>) -> Self {
        let mut record = Self { tag, ..Default::default() };
        record.set_data(data);
        record
    }

    pub fn transform_version(&self) -> u8 {
        self.flags >> 6
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn take_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Replaces the table bytes, updating original length and checksum.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.orig_length = data.len() as u32;
        self.checksum = table_checksum(self.tag, &data);
        self.data = data;
    }

    /// Stores bytes exactly as found in the container.
    pub(crate) fn set_stored(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Marks the table as regenerated into its plain sfnt form.
    pub fn set_untransformed(&mut self, data: Vec<u8>) {
        self.set_data(data);
        self.transformed = false;
    }

    pub fn padding(&self) -> usize {
        padding(self.orig_length as usize)
    }

    pub fn write_woff1(&self, out: &mut FontBuffer) {
        out.push_tag(self.tag)
            .push_u32(self.offset)
            .push_u32(self.comp_length)
            .push_u32(self.orig_length)
            .push_u32(self.checksum);
    }

    pub fn write_woff2(&self, out: &mut FontBuffer) {
        let index = known_tag_index(self.tag).unwrap_or(EXPLICIT_TAG_INDEX);
        out.push_u8(index | (self.flags & 0xC0));
        if index == EXPLICIT_TAG_INDEX {
            out.push_tag(self.tag);
        }
        out.push_uint_base128(self.orig_length);
        if has_transform_length(self.tag, self.transform_version()) {
            out.push_uint_base128(self.transform_length);
        }
    }
}

/// Whether a WOFF2 directory entry carries a `transformLength` field.
pub fn has_transform_length(tag: Tag, version: u8) -> bool {
    let glyf_or_loca = tag == GLYF || tag == LOCA;
    if glyf_or_loca { version == 0 } else { version != 0 }
}

/// Reads the fixed 20-byte records following a WOFF 1.0 header.
pub fn read_woff1(data: &[u8], header_len: usize, num_tables: u16) -> Result<Vec<TableRecord>> {
    let mut r = Reader::at(data, header_len)?;
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(num_tables as usize);
    for _ in 0..num_tables {
        let record = TableRecord {
            tag: r.tag()?,
            offset: r.u32()?,
            comp_length: r.u32()?,
            orig_length: r.u32()?,
            checksum: r.u32()?,
            ..Default::default()
        };
        if !seen.insert(record.tag) {
            return Err(WoffError::DuplicateTable(record.tag));
        }
        let end = u64::from(record.offset) + u64::from(record.comp_length);
        if end > data.len() as u64 {
            return Err(WoffError::TableOutOfBounds {
                tag: record.tag,
                offset: record.offset,
                length: record.comp_length,
            });
        }
        if record.comp_length > record.orig_length {
            return Err(WoffError::CompressedLarger {
                tag: record.tag,
                compressed: record.comp_length,
                original: record.orig_length,
            });
        }
        let transformed = record.comp_length != record.orig_length;
        records.push(TableRecord { transformed, ..record });
    }
    Ok(records)
}

/// Reads the variable-length WOFF 2.0 directory.
///
/// Offsets are assigned sequentially within the decompressed stream in
/// directory order.
pub fn read_woff2(r: &mut Reader<'_>, num_tables: u16) -> Result<Vec<TableRecord>> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(num_tables as usize);
    let mut offset: u32 = 0;
    for _ in 0..num_tables {
        let flags = r.u8()?;
        let index = flags & 0x3F;
        let tag = if index == EXPLICIT_TAG_INDEX { r.tag()? } else { KNOWN_TAGS[index as usize] };
        if !seen.insert(tag) {
            return Err(WoffError::DuplicateTable(tag));
        }
        let version = flags >> 6;
        let orig_length = r.uint_base128()?;

        let (comp_length, transform_length, transformed) = if has_transform_length(tag, version) {
            let transform_length = r.uint_base128()?;
            if tag == LOCA && transform_length != 0 {
                return Err(WoffError::MalformedTransform {
                    tag,
                    reason: "transformed loca must have zero length",
                });
            }
            (transform_length, transform_length, true)
        } else {
            (orig_length, 0, false)
        };

        debug!("woff2 table {tag}: version {version}, length {orig_length}, stored {comp_length}");
        records.push(TableRecord {
            tag,
            flags,
            offset,
            comp_length,
            orig_length,
            transform_length,
            transformed,
            ..Default::default()
        });
        offset = offset
            .checked_add(comp_length)
            .ok_or(WoffError::TooLarge {
                declared: u64::from(offset) + u64::from(comp_length),
                limit: u64::from(u32::MAX),
            })?;
    }
    Ok(records)
}
