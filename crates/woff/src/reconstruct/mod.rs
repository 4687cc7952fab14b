//! Regenerates tables whose stored form depends on other tables.
//!
//! Each well-known tag maps to a [`Reconstructor`] variant; they run in a
//! fixed order per font over a shared [`BuildContext`]. Tables without
//! special handling pass through unchanged.

mod head;
mod hmtx;
mod name;

pub use head::{checksum_adjustment, index_to_loc_format, zero_adjustment};
pub use hmtx::{reconstruct_hmtx, transform_hmtx};
pub use name::repair_names;

use log::{debug, warn};
use read_fonts::types::Tag;

use crate::{
    directory::{GLYF_NULL_TRANSFORM, TableRecord},
    error::{Result, WoffError},
    font::Font,
    glyf::{LocaFormat, TransformedGlyf, decode_glyf, read_glyf, read_loca, write_glyf},
    options::DecodeOptions,
    tags::{GLYF, HEAD, HHEA, HMTX, LOCA, MAXP, NAME},
};

/// Per-font state threaded through the reconstruction steps.
pub struct BuildContext<'a> {
    tables: &'a mut [TableRecord],
    font: &'a Font,
    options: &'a DecodeOptions,
    num_h_metrics: Option<u16>,
    glyphs: Option<TransformedGlyf>,
    loca: Option<Vec<u8>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(tables: &'a mut [TableRecord], font: &'a Font, options: &'a DecodeOptions) -> Self {
        Self { tables, font, options, num_h_metrics: None, glyphs: None, loca: None }
    }

    fn required(&self, tag: Tag) -> Result<&TableRecord> {
        self.font.table(tag, &*self.tables)
    }

    pub fn num_glyphs(&self) -> Result<u16> {
        self.font.num_glyphs(&*self.tables)
    }

    pub fn num_h_metrics(&mut self) -> Result<u16> {
        if let Some(count) = self.num_h_metrics {
            return Ok(count);
        }
        let count = self.font.num_h_metrics(&*self.tables)?;
        self.num_h_metrics = Some(count);
        Ok(count)
    }

    /// Glyphs of this font, decoded once from glyf in whichever form it is.
    pub fn glyphs(&mut self) -> Result<&TransformedGlyf> {
        if self.glyphs.is_none() {
            let glyphs = self.load_glyphs()?;
            self.glyphs = Some(glyphs);
        }
        Ok(self.glyphs.get_or_insert_with(TransformedGlyf::default))
    }

    fn load_glyphs(&self) -> Result<TransformedGlyf> {
        let glyf = self.required(GLYF)?;
        if glyf.transformed {
            return decode_glyf(glyf.data());
        }
        let loca = self.required(LOCA)?;
        let loca_format = LocaFormat::from_index_format(index_to_loc_format(self.required(HEAD)?.data())?);
        let offsets = read_loca(loca.data(), loca_format, self.num_glyphs()? as usize)?;
        let glyphs = read_glyf(glyf.data(), &offsets)?;
        Ok(TransformedGlyf { glyphs, loca_format })
    }
}

/// Reconstruction strategy for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconstructor {
    Head,
    Hhea,
    Hmtx,
    Maxp,
    Name,
    Glyf,
    Loca,
    Passthrough,
}

/// Order in which dependent tables are rebuilt.
pub const RECONSTRUCTION_ORDER: [Reconstructor; 7] = [
    Reconstructor::Head,
    Reconstructor::Hhea,
    Reconstructor::Hmtx,
    Reconstructor::Maxp,
    Reconstructor::Name,
    Reconstructor::Glyf,
    Reconstructor::Loca,
];

impl Reconstructor {
    pub fn for_tag(tag: Tag) -> Self {
        match tag {
            HEAD => Self::Head,
            HHEA => Self::Hhea,
            HMTX => Self::Hmtx,
            MAXP => Self::Maxp,
            NAME => Self::Name,
            GLYF => Self::Glyf,
            LOCA => Self::Loca,
            _ => Self::Passthrough,
        }
    }

    pub fn tag(self) -> Option<Tag> {
        match self {
            Self::Head => Some(HEAD),
            Self::Hhea => Some(HHEA),
            Self::Hmtx => Some(HMTX),
            Self::Maxp => Some(MAXP),
            Self::Name => Some(NAME),
            Self::Glyf => Some(GLYF),
            Self::Loca => Some(LOCA),
            Self::Passthrough => None,
        }
    }

    /// Rebuilds the table at `index` in place.
    pub fn reconstruct(self, ctx: &mut BuildContext<'_>, index: usize) -> Result<()> {
        match self {
            Self::Head => {
                plain(&ctx.tables[index])?;
                let data = zero_adjustment(ctx.tables[index].take_data())?;
                ctx.tables[index].set_data(data);
            }
            Self::Hhea => {
                plain(&ctx.tables[index])?;
                ctx.num_h_metrics()?;
            }
            Self::Maxp | Self::Passthrough => plain(&ctx.tables[index])?,
            Self::Name => {
                plain(&ctx.tables[index])?;
                if ctx.options.repair_names {
                    match repair_names(ctx.tables[index].data()) {
                        Ok(Some(data)) => ctx.tables[index].set_data(data),
                        Ok(None) => {}
                        Err(e) => warn!("keeping original name table: {e}"),
                    }
                }
            }
            Self::Hmtx => reconstruct_hmtx_table(ctx, index)?,
            Self::Glyf => reconstruct_glyf_table(ctx, index)?,
            Self::Loca => reconstruct_loca_table(ctx, index)?,
        }
        Ok(())
    }
}

/// Fails for tables stored with a transform this codec does not know.
fn plain(record: &TableRecord) -> Result<()> {
    if record.transformed {
        return Err(WoffError::UnknownTransform { tag: record.tag, version: record.transform_version() });
    }
    Ok(())
}

fn reconstruct_hmtx_table(ctx: &mut BuildContext<'_>, index: usize) -> Result<()> {
    let record = &ctx.tables[index];
    if !record.transformed {
        return Ok(());
    }
    if record.transform_version() != 1 {
        return Err(WoffError::UnknownTransform { tag: HMTX, version: record.transform_version() });
    }
    if ctx.font.glyf.is_none() {
        return Err(WoffError::MissingTable(GLYF));
    }
    let num_glyphs = ctx.num_glyphs()?;
    let num_h_metrics = ctx.num_h_metrics()?;
    let x_mins: Vec<i16> = ctx.glyphs()?.glyphs.iter().map(|glyph| glyph.x_min()).collect();

    let record = &mut ctx.tables[index];
    let data = reconstruct_hmtx(record.data(), num_glyphs, num_h_metrics, &x_mins)?;
    if data.len() != record.orig_length as usize {
        return Err(WoffError::SizeMismatch { tag: HMTX, expected: record.orig_length as usize, actual: data.len() });
    }
    record.set_untransformed(data);
    Ok(())
}

fn check_glyf_version(record: &TableRecord) -> Result<()> {
    let version = record.transform_version();
    if !record.transformed && version != GLYF_NULL_TRANSFORM {
        return Err(WoffError::UnknownTransform { tag: record.tag, version });
    }
    Ok(())
}

fn reconstruct_glyf_table(ctx: &mut BuildContext<'_>, index: usize) -> Result<()> {
    let glyf_transformed = ctx.tables[index].transformed;
    let loca_transformed = ctx.font.loca.map(|i| ctx.tables[i].transformed);
    if glyf_transformed != loca_transformed.unwrap_or(false) {
        return Err(WoffError::GlyfLocaMismatch);
    }
    if !glyf_transformed {
        return check_glyf_version(&ctx.tables[index]);
    }

    let head_format = ctx.required(HEAD).and_then(|head| index_to_loc_format(head.data())).ok();
    let glyphs = ctx.glyphs()?;
    let loca_format = glyphs.loca_format;
    let output = write_glyf(&glyphs.glyphs)?;
    if head_format.is_some_and(|format| LocaFormat::from_index_format(format) != loca_format) {
        warn!("glyf transform index format differs from head.indexToLocFormat");
    }
    debug!("rebuilt glyf: {} glyphs, {} bytes", output.offsets.len().saturating_sub(1), output.glyf.len());
    ctx.loca = Some(output.loca(loca_format)?);
    ctx.tables[index].set_untransformed(output.glyf);
    Ok(())
}

fn reconstruct_loca_table(ctx: &mut BuildContext<'_>, index: usize) -> Result<()> {
    if !ctx.tables[index].transformed {
        if ctx.font.glyf.is_some_and(|i| ctx.tables[i].transformed) {
            return Err(WoffError::GlyfLocaMismatch);
        }
        return check_glyf_version(&ctx.tables[index]);
    }
    let loca = ctx.loca.take().ok_or(WoffError::GlyfLocaMismatch)?;
    let record = &mut ctx.tables[index];
    if loca.len() != record.orig_length as usize {
        return Err(WoffError::SizeMismatch { tag: LOCA, expected: record.orig_length as usize, actual: loca.len() });
    }
    record.set_untransformed(loca);
    Ok(())
}

/// Rebuilds every table of `font`, skipping tables already handled for an
/// earlier font of the same collection.
pub fn rebuild_font(
    tables: &mut [TableRecord],
    font: &Font,
    options: &DecodeOptions,
    done: &mut [bool],
) -> Result<()> {
    let mut ctx = BuildContext::new(tables, font, options);
    for step in RECONSTRUCTION_ORDER {
        if let Some(tag) = step.tag()
            && let Some(index) = font.index_of(tag)
            && !done[index]
        {
            step.reconstruct(&mut ctx, index)?;
            done[index] = true;
        }
    }
    for &index in &font.table_indices {
        if !done[index] {
            Reconstructor::Passthrough.reconstruct(&mut ctx, index)?;
            done[index] = true;
        }
    }
    Ok(())
}
