//! Font collections: the WOFF2 collection directory and the TTC header
//! layout used when exporting.

use crate::{
    binary::{FontBuffer, Reader},
    directory::TableRecord,
    error::{Result, WoffError},
    tags::{GLYF, LOCA},
};

pub const TTC_VERSION_1: u32 = 0x0001_0000;
pub const TTC_VERSION_2: u32 = 0x0002_0000;

/// One font of a collection: its flavor and the file tables it uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFontEntry {
    pub flavor: u32,
    pub table_indices: Vec<u16>,
}

impl CollectionFontEntry {
    pub fn num_tables(&self) -> usize {
        self.table_indices.len()
    }

    /// Indices ordered by table tag.
    pub fn sorted_indices(&self, tables: &[TableRecord]) -> Vec<u16> {
        let mut sorted = self.table_indices.clone();
        sorted.sort_by_key(|&i| tables[i as usize].tag);
        sorted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionHeader {
    pub version: u32,
    pub fonts: Vec<CollectionFontEntry>,
}

impl CollectionHeader {
    pub fn new(version: u32, fonts: Vec<CollectionFontEntry>) -> Self {
        Self { version, fonts }
    }

    pub fn num_fonts(&self) -> usize {
        self.fonts.len()
    }

    /// Reads the WOFF2 collection directory that follows the table directory.
    pub fn read(r: &mut Reader<'_>, tables: &[TableRecord]) -> Result<Self> {
        let version = r.u32()?;
        if version != TTC_VERSION_1 && version != TTC_VERSION_2 {
            return Err(WoffError::InvalidCollection("unsupported collection version"));
        }
        let num_fonts = r.read_255_u16()?;
        if num_fonts == 0 {
            return Err(WoffError::InvalidCollection("collection has no fonts"));
        }

        let mut fonts = Vec::with_capacity(num_fonts as usize);
        for font in 0..num_fonts as usize {
            let num_tables = r.read_255_u16()?;
            if num_tables == 0 {
                return Err(WoffError::InvalidCollection("collection font has no tables"));
            }
            let flavor = r.u32()?;
            let mut table_indices = Vec::with_capacity(num_tables as usize);
            for _ in 0..num_tables {
                let index = r.read_255_u16()?;
                if index as usize >= tables.len() {
                    return Err(WoffError::CollectionIndexOutOfRange {
                        font,
                        index,
                        num_tables: tables.len(),
                    });
                }
                table_indices.push(index);
            }
            let entry = CollectionFontEntry { flavor, table_indices };
            check_glyf_loca(&entry, tables)?;
            fonts.push(entry);
        }
        Ok(Self { version, fonts })
    }

    pub fn write(&self, out: &mut FontBuffer) {
        out.push_u32(self.version);
        out.push_255_u16(self.fonts.len() as u16);
        for font in &self.fonts {
            out.push_255_u16(font.table_indices.len() as u16);
            out.push_u32(font.flavor);
            for &index in &font.table_indices {
                out.push_255_u16(index);
            }
        }
    }

    /// Size of the TTC header in an exported collection.
    pub fn ttc_header_len(&self) -> usize {
        ttc_header_len(self.version, self.fonts.len())
    }
}

/// `ttcf` tag, version, font count, one offset per font, and the three
/// DSIG fields for version 2.
pub fn ttc_header_len(version: u32, num_fonts: usize) -> usize {
    let dsig = if version == TTC_VERSION_2 { 12 } else { 0 };
    12 + 4 * num_fonts + dsig
}

/// glyf and loca share one stream slot: loca must directly follow glyf.
fn check_glyf_loca(entry: &CollectionFontEntry, tables: &[TableRecord]) -> Result<()> {
    let find = |tag| entry.table_indices.iter().copied().find(|&i| tables[i as usize].tag == tag);
    match (find(GLYF), find(LOCA)) {
        (None, None) => Ok(()),
        (Some(glyf), Some(loca)) if loca == glyf + 1 => Ok(()),
        _ => Err(WoffError::InvalidCollection("glyf and loca must be adjacent")),
    }
}
