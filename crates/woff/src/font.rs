//! One sfnt inside a container: its table indices and well-known tables.

use read_fonts::types::Tag;

use crate::{
    directory::TableRecord,
    error::{Result, WoffError},
    tags::{GLYF, HEAD, HHEA, HMTX, LOCA, MAXP, NAME},
};

const HHEA_NUM_H_METRICS_OFFSET: usize = 34;
const MAXP_NUM_GLYPHS_OFFSET: usize = 4;

fn read_u16_at(record: &TableRecord, offset: usize) -> Result<u16> {
    let data = record.data();
    match data.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(WoffError::TableTooShort { tag: record.tag, len: data.len() }),
    }
}

/// A font of the container, referring to the file's tables by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Font {
    pub flavor: u32,
    /// Indices into the file's table list, in container order.
    pub table_indices: Vec<usize>,
    pub head: Option<usize>,
    pub hhea: Option<usize>,
    pub hmtx: Option<usize>,
    pub maxp: Option<usize>,
    pub name: Option<usize>,
    pub glyf: Option<usize>,
    pub loca: Option<usize>,
    /// Any member table was stored transformed.
    pub transformed: bool,
}

impl Font {
    pub fn new(flavor: u32, table_indices: Vec<usize>, tables: &[TableRecord]) -> Self {
        let find = |tag: Tag| table_indices.iter().copied().find(|&i| tables[i].tag == tag);
        Self {
            flavor,
            head: find(HEAD),
            hhea: find(HHEA),
            hmtx: find(HMTX),
            maxp: find(MAXP),
            name: find(NAME),
            glyf: find(GLYF),
            loca: find(LOCA),
            transformed: table_indices.iter().any(|&i| tables[i].transformed),
            table_indices,
        }
    }

    /// Index of the well-known table `tag`, if this font has it.
    pub fn index_of(&self, tag: Tag) -> Option<usize> {
        match tag {
            HEAD => self.head,
            HHEA => self.hhea,
            HMTX => self.hmtx,
            MAXP => self.maxp,
            NAME => self.name,
            GLYF => self.glyf,
            LOCA => self.loca,
            _ => None,
        }
    }

    pub fn table<'t>(&self, tag: Tag, tables: &'t [TableRecord]) -> Result<&'t TableRecord> {
        self.index_of(tag).map(|i| &tables[i]).ok_or(WoffError::MissingTable(tag))
    }

    /// `maxp.numGlyphs`
    pub fn num_glyphs(&self, tables: &[TableRecord]) -> Result<u16> {
        read_u16_at(self.table(MAXP, tables)?, MAXP_NUM_GLYPHS_OFFSET)
    }

    /// `hhea.numberOfHMetrics`
    pub fn num_h_metrics(&self, tables: &[TableRecord]) -> Result<u16> {
        read_u16_at(self.table(HHEA, tables)?, HHEA_NUM_H_METRICS_OFFSET)
    }

    pub fn num_tables(&self) -> usize {
        self.table_indices.len()
    }

    /// Table indices ordered by tag, as written to an sfnt directory.
    pub fn sorted_indices(&self, tables: &[TableRecord]) -> Vec<usize> {
        let mut sorted = self.table_indices.clone();
        sorted.sort_by_key(|&i| tables[i].tag);
        sorted
    }
}
