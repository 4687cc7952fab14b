//! Plain sfnt files: reading fonts and collections into table records, and
//! writing them back with table directories and head checksum adjustments.

use std::collections::HashMap;

use log::debug;
use read_fonts::{FileRef, types::Tag};

use crate::{
    binary::{FontBuffer, HEAD_ADJUSTMENT_OFFSET, Reader, checksum, round4, table_checksum},
    collection::{TTC_VERSION_2, ttc_header_len},
    directory::TableRecord,
    error::{Result, WoffError},
    font::Font,
    reconstruct::checksum_adjustment,
    tags::{HEAD, TTCF},
};

pub const OFFSET_TABLE_LEN: usize = 12;
pub const TABLE_RECORD_LEN: usize = 16;

/// A table's entry in an sfnt table directory.
#[derive(Debug, Clone, Copy)]
struct DirectoryEntry {
    tag: Tag,
    checksum: u32,
    offset: u32,
    length: u32,
}

impl DirectoryEntry {
    fn new(record: &TableRecord, offset: usize) -> Self {
        Self {
            tag: record.tag,
            checksum: table_checksum(record.tag, record.data()),
            offset: offset as u32,
            length: record.data().len() as u32,
        }
    }
}

/// `(searchRange, entrySelector, rangeShift)` for `num_tables` records.
pub fn search_params(num_tables: u16) -> (u16, u16, u16) {
    if num_tables == 0 {
        return (0, 0, 0);
    }
    let entry_selector = 15 - num_tables.leading_zeros();
    let search_range = 16u32 << entry_selector;
    let range_shift = 16 * u32::from(num_tables) - search_range;
    (search_range as u16, entry_selector as u16, range_shift as u16)
}

fn directory_len(num_tables: usize) -> usize {
    OFFSET_TABLE_LEN + TABLE_RECORD_LEN * num_tables
}

fn push_offset_table(out: &mut FontBuffer, flavor: u32, entries: &[DirectoryEntry]) {
    let num_tables = entries.len() as u16;
    let (search_range, entry_selector, range_shift) = search_params(num_tables);
    out.push_u32(flavor)
        .push_u16(num_tables)
        .push_u16(search_range)
        .push_u16(entry_selector)
        .push_u16(range_shift);
    for entry in entries {
        out.push_tag(entry.tag)
            .push_u32(entry.checksum)
            .push_u32(entry.offset)
            .push_u32(entry.length);
    }
}

/// Writes `checksumAdjustment` into the head table of one font.
fn patch_adjustment(out: &mut FontBuffer, entries: &[DirectoryEntry], header_checksum: u32) -> Result<()> {
    let Some(head) = entries.iter().find(|entry| entry.tag == HEAD) else {
        debug!("font has no head table, checksum adjustment skipped");
        return Ok(());
    };
    if (head.length as usize) < HEAD_ADJUSTMENT_OFFSET + 4 {
        return Err(WoffError::TableTooShort { tag: HEAD, len: head.length as usize });
    }
    let table_sum = entries.iter().fold(0u32, |sum, entry| sum.wrapping_add(entry.checksum));
    let adjustment = checksum_adjustment(table_sum, header_checksum);
    out.set_u32(head.offset as usize + HEAD_ADJUSTMENT_OFFSET, adjustment)
}

/// Serializes one font: offset table, tag-sorted records, 4-byte aligned data.
pub fn write_font(flavor: u32, tables: &[&TableRecord]) -> Result<Vec<u8>> {
    if tables.is_empty() {
        return Err(WoffError::NoTables);
    }
    let mut sorted = tables.to_vec();
    sorted.sort_by_key(|record| record.tag);

    let mut offset = directory_len(sorted.len());
    let mut entries = Vec::with_capacity(sorted.len());
    for record in &sorted {
        entries.push(DirectoryEntry::new(record, offset));
        offset += round4(record.data().len());
    }

    let mut out = FontBuffer::with_capacity(offset);
    push_offset_table(&mut out, flavor, &entries);
    let header_checksum = checksum(out.as_slice());
    for record in &sorted {
        out.push_bytes(record.data()).pad4();
    }
    patch_adjustment(&mut out, &entries, header_checksum)?;
    Ok(out.into_vec())
}

/// Serializes a collection: TTC header, one directory per font, then every
/// distinct table once in order of first use.
pub fn write_collection(version: u32, fonts: &[Font], tables: &[TableRecord]) -> Result<Vec<u8>> {
    if fonts.is_empty() {
        return Err(WoffError::InvalidCollection("collection has no fonts"));
    }
    let sorted: Vec<Vec<usize>> = fonts.iter().map(|font| font.sorted_indices(tables)).collect();

    let mut offset = ttc_header_len(version, fonts.len());
    let mut directory_offsets = Vec::with_capacity(fonts.len());
    for indices in &sorted {
        directory_offsets.push(offset as u32);
        offset += directory_len(indices.len());
    }

    let mut table_offsets = vec![0usize; tables.len()];
    let mut placed = vec![false; tables.len()];
    let mut order = Vec::with_capacity(tables.len());
    for &index in sorted.iter().flatten() {
        if !placed[index] {
            placed[index] = true;
            table_offsets[index] = offset;
            order.push(index);
            offset += round4(tables[index].data().len());
        }
    }

    let mut out = FontBuffer::with_capacity(offset);
    out.push_tag(TTCF).push_u32(version).push_u32(fonts.len() as u32);
    for &directory_offset in &directory_offsets {
        out.push_u32(directory_offset);
    }
    if version == TTC_VERSION_2 {
        // no DSIG: tag, length and offset all zero
        out.push_u32(0).push_u32(0).push_u32(0);
    }

    let mut directories = Vec::with_capacity(fonts.len());
    for (font, indices) in fonts.iter().zip(&sorted) {
        let entries: Vec<DirectoryEntry> = indices
            .iter()
            .map(|&index| DirectoryEntry::new(&tables[index], table_offsets[index]))
            .collect();
        let start = out.len();
        push_offset_table(&mut out, font.flavor, &entries);
        let header_checksum = checksum(&out.as_slice()[start..]);
        directories.push((entries, header_checksum));
    }
    for &index in &order {
        out.push_bytes(tables[index].data()).pad4();
    }
    for (entries, header_checksum) in &directories {
        patch_adjustment(&mut out, entries, *header_checksum)?;
    }
    debug!("wrote collection of {} fonts, {} distinct tables", fonts.len(), order.len());
    Ok(out.into_vec())
}

/// Writes a single font or, when `collection_version` is set, a collection.
pub fn write_sfnt(tables: &[TableRecord], fonts: &[Font], collection_version: Option<u32>) -> Result<Vec<u8>> {
    match (collection_version, fonts) {
        (Some(version), _) => write_collection(version, fonts, tables),
        (None, [font]) => {
            let records: Vec<&TableRecord> = font.table_indices.iter().map(|&i| &tables[i]).collect();
            write_font(font.flavor, &records)
        }
        (None, _) => Err(WoffError::InvalidSfnt("expected exactly one font")),
    }
}

/// An sfnt font or collection split into table records.
#[derive(Debug, Clone, Default)]
pub struct SfntFile {
    pub tables: Vec<TableRecord>,
    pub fonts: Vec<Font>,
    /// TTC header version when the input was a collection.
    pub collection_version: Option<u32>,
}

impl SfntFile {
    /// Parses a font or collection. Tables referenced by several fonts of a
    /// collection are kept once.
    pub fn read(data: &[u8]) -> Result<Self> {
        let file = FileRef::new(data)?;
        let collection_version = match file {
            FileRef::Collection(_) => Some(Reader::at(data, 4)?.u32()?),
            FileRef::Font(_) => None,
        };

        let mut tables: Vec<TableRecord> = Vec::new();
        let mut shared: HashMap<(Tag, u32, u32), usize> = HashMap::new();
        let mut fonts = Vec::new();
        for font in file.fonts() {
            let font = font?;
            let mut indices = Vec::with_capacity(font.table_directory.table_records().len());
            for record in font.table_directory.table_records() {
                let (tag, offset, length) = (record.tag(), record.offset(), record.length());
                let index = match shared.get(&(tag, offset, length)) {
                    Some(&index) => index,
                    None => {
                        let start = offset as usize;
                        let bytes = data
                            .get(start..start + length as usize)
                            .ok_or(WoffError::TableOutOfBounds { tag, offset, length })?;
                        tables.push(TableRecord::new(tag, bytes.to_vec()));
                        shared.insert((tag, offset, length), tables.len() - 1);
                        tables.len() - 1
                    }
                };
                if indices.iter().any(|&i: &usize| tables[i].tag == tag) {
                    return Err(WoffError::DuplicateTable(tag));
                }
                indices.push(index);
            }
            if indices.is_empty() {
                return Err(WoffError::NoTables);
            }
            fonts.push(Font::new(font.table_directory.sfnt_version(), indices, &tables));
        }
        if fonts.is_empty() {
            return Err(WoffError::InvalidCollection("collection has no fonts"));
        }
        Ok(Self { tables, fonts, collection_version })
    }

    pub fn is_collection(&self) -> bool {
        self.collection_version.is_some()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write_sfnt(&self.tables, &self.fonts, self.collection_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binary::CHECKSUM_MAGIC,
        collection::TTC_VERSION_1,
        tags::{MAXP, TRUETYPE_FLAVOR},
    };
    use read_fonts::{FontRef, TableProvider};

    fn head() -> Vec<u8> {
        let mut data = vec![0u8; 54];
        data[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        data[8..12].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        data[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        data[18..20].copy_from_slice(&1000u16.to_be_bytes());
        data
    }

    fn maxp(num_glyphs: u16) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x50, 0x00];
        data.extend(num_glyphs.to_be_bytes());
        data
    }

    #[test]
    fn test_search_params() {
        assert_eq!(search_params(1), (16, 0, 0));
        assert_eq!(search_params(9), (128, 3, 16));
        assert_eq!(search_params(16), (256, 4, 0));
    }

    #[test]
    fn test_write_font_is_readable() {
        let tables = [
            TableRecord::new(MAXP, maxp(3)),
            TableRecord::new(Tag::new(b"zzzz"), vec![1, 2, 3]),
            TableRecord::new(HEAD, head()),
        ];
        let records: Vec<&TableRecord> = tables.iter().collect();
        let bytes = write_font(TRUETYPE_FLAVOR, &records).unwrap();

        assert_eq!(checksum(&bytes), CHECKSUM_MAGIC);
        assert_eq!(bytes.len() % 4, 0);
        let font = FontRef::new(&bytes).unwrap();
        let tags: Vec<Tag> = font.table_directory.table_records().iter().map(|r| r.tag()).collect();
        assert_eq!(tags, vec![HEAD, MAXP, Tag::new(b"zzzz")]);
        assert_eq!(font.maxp().unwrap().num_glyphs(), 3);
        assert_eq!(font.table_data(Tag::new(b"zzzz")).unwrap().as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_collection_round_trip() {
        let tables = vec![
            TableRecord::new(HEAD, head()),
            TableRecord::new(MAXP, maxp(3)),
            TableRecord::new(MAXP, maxp(5)),
        ];
        let fonts = vec![
            Font::new(TRUETYPE_FLAVOR, vec![0, 1], &tables),
            Font::new(TRUETYPE_FLAVOR, vec![0, 2], &tables),
        ];
        let bytes = write_collection(TTC_VERSION_2, &fonts, &tables).unwrap();
        assert_eq!(&bytes[0..4], b"ttcf");

        let sfnt = SfntFile::read(&bytes).unwrap();
        assert_eq!(sfnt.collection_version, Some(TTC_VERSION_2));
        assert_eq!(sfnt.tables.len(), 3);
        assert_eq!(sfnt.fonts.len(), 2);
        assert_eq!(sfnt.fonts[0].head, sfnt.fonts[1].head);
        assert_ne!(sfnt.fonts[0].maxp, sfnt.fonts[1].maxp);
        assert_eq!(sfnt.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_single_font_read_back() {
        let tables = vec![TableRecord::new(HEAD, head()), TableRecord::new(MAXP, maxp(1))];
        let fonts = vec![Font::new(TRUETYPE_FLAVOR, vec![0, 1], &tables)];
        let bytes = write_sfnt(&tables, &fonts, None).unwrap();
        let sfnt = SfntFile::read(&bytes).unwrap();
        assert!(!sfnt.is_collection());
        assert_eq!(sfnt.fonts[0].flavor, TRUETYPE_FLAVOR);
        assert_eq!(&sfnt.tables[1].data()[..], &maxp(1)[..]);
        assert!(write_collection(TTC_VERSION_1, &[], &tables).is_err());
    }
}
