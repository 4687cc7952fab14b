//! Reverses the WOFF2 glyf transform into per-glyph data.

use log::debug;

use super::{
    glyph::{BoundingBox, CompositeGlyph, Glyph, SimpleGlyph, read_components},
    sfnt::LocaFormat,
    triplet::decode_points,
};
use crate::{
    binary::Reader,
    error::{Result, WoffError},
    tags::GLYF,
};

/// optionFlags bit announcing the overlap-simple bitmap.
pub(crate) const OVERLAP_SIMPLE_BITMAP: u16 = 0x0001;

/// Glyphs recovered from a transformed glyf table.
#[derive(Debug, Clone, Default)]
pub struct TransformedGlyf {
    pub glyphs: Vec<Glyph>,
    pub loca_format: LocaFormat,
}

pub(crate) fn bbox_bitmap_len(num_glyphs: usize) -> usize {
    num_glyphs.div_ceil(32) * 4
}

pub(crate) fn overlap_bitmap_len(num_glyphs: usize) -> usize {
    num_glyphs.div_ceil(8)
}

/// Bit `index` of an MSB-first bitmap.
pub(crate) fn bit_set(bitmap: &[u8], index: usize) -> bool {
    bitmap.get(index >> 3).is_some_and(|byte| byte & (0x80 >> (index & 7)) != 0)
}

fn malformed(reason: &'static str) -> WoffError {
    WoffError::MalformedTransform { tag: GLYF, reason }
}

struct Streams<'a> {
    n_contour: Reader<'a>,
    n_points: Reader<'a>,
    flags: Reader<'a>,
    glyphs: Reader<'a>,
    composite: Reader<'a>,
    bbox_bitmap: &'a [u8],
    bbox: Reader<'a>,
    instructions: Reader<'a>,
    overlap_bitmap: Option<&'a [u8]>,
}

impl<'a> Streams<'a> {
    fn split(r: &mut Reader<'a>, num_glyphs: usize, option_flags: u16) -> Result<Self> {
        let mut sizes = [0usize; 7];
        for size in &mut sizes {
            *size = r.u32().map_err(|_| malformed("truncated header"))? as usize;
        }
        let mut next = |len: usize| r.bytes(len).map_err(|_| malformed("stream exceeds table"));
        let n_contour = Reader::new(next(sizes[0])?);
        let n_points = Reader::new(next(sizes[1])?);
        let flags = Reader::new(next(sizes[2])?);
        let glyphs = Reader::new(next(sizes[3])?);
        let composite = Reader::new(next(sizes[4])?);
        let mut bbox = Reader::new(next(sizes[5])?);
        let instructions = Reader::new(next(sizes[6])?);
        let overlap_bitmap = if option_flags & OVERLAP_SIMPLE_BITMAP != 0 {
            Some(next(overlap_bitmap_len(num_glyphs))?)
        } else {
            None
        };
        let bbox_bitmap = bbox
            .bytes(bbox_bitmap_len(num_glyphs))
            .map_err(|_| malformed("truncated bbox bitmap"))?;
        Ok(Self {
            n_contour,
            n_points,
            flags,
            glyphs,
            composite,
            bbox_bitmap,
            bbox,
            instructions,
            overlap_bitmap,
        })
    }

    fn instructions(&mut self, gid: u32) -> Result<Vec<u8>> {
        let truncated = |_| WoffError::MalformedGlyph { glyph: gid, reason: "truncated instructions" };
        let len = self.glyphs.read_255_u16().map_err(truncated)?;
        Ok(self.instructions.bytes(len as usize).map_err(truncated)?.to_vec())
    }

    fn explicit_bbox(&mut self, gid: u32) -> Result<BoundingBox> {
        BoundingBox::read(&mut self.bbox)
            .map_err(|_| WoffError::MalformedGlyph { glyph: gid, reason: "truncated bbox stream" })
    }

    fn simple(&mut self, gid: u32, num_contours: usize, has_bbox: bool) -> Result<SimpleGlyph> {
        let mut end_points = Vec::with_capacity(num_contours);
        let mut total: u32 = 0;
        for _ in 0..num_contours {
            let count = self
                .n_points
                .read_255_u16()
                .map_err(|_| WoffError::MalformedGlyph { glyph: gid, reason: "truncated point counts" })?;
            total += u32::from(count);
            let end = total
                .checked_sub(1)
                .and_then(|end| u16::try_from(end).ok())
                .ok_or(WoffError::MalformedGlyph { glyph: gid, reason: "invalid contour point count" })?;
            end_points.push(end);
        }
        let points = decode_points(&mut self.flags, &mut self.glyphs, total as usize, gid)?;
        let instructions = self.instructions(gid)?;
        let bbox = if has_bbox {
            self.explicit_bbox(gid)?
        } else {
            BoundingBox::from_points(&points, gid)?
        };
        let overlap = self.overlap_bitmap.is_some_and(|bitmap| bit_set(bitmap, gid as usize));
        Ok(SimpleGlyph { bbox, end_points, instructions, points, overlap })
    }

    fn composite(&mut self, gid: u32) -> Result<CompositeGlyph> {
        let (components, has_instructions) = read_components(&mut self.composite, gid)?;
        let bbox = self.explicit_bbox(gid)?;
        let instructions = if has_instructions { self.instructions(gid)? } else { Vec::new() };
        Ok(CompositeGlyph { bbox, components: components.to_vec(), has_instructions, instructions })
    }
}

/// Decodes a transformed glyf table.
pub fn decode_glyf(data: &[u8]) -> Result<TransformedGlyf> {
    let mut r = Reader::new(data);
    let mut header = || r.u16().map_err(|_| malformed("truncated header"));
    let _version = header()?;
    let option_flags = header()?;
    let num_glyphs = header()? as usize;
    let index_format = header()?;
    let mut streams = Streams::split(&mut r, num_glyphs, option_flags)?;

    let mut glyphs = Vec::with_capacity(num_glyphs);
    for gid in 0..num_glyphs as u32 {
        let num_contours = streams
            .n_contour
            .i16()
            .map_err(|_| WoffError::MalformedGlyph { glyph: gid, reason: "missing contour count" })?;
        let has_bbox = bit_set(streams.bbox_bitmap, gid as usize);
        let glyph = match num_contours {
            0 if has_bbox => return Err(WoffError::EmptyGlyphWithBbox(gid)),
            0 => Glyph::Empty,
            n if n < 0 => {
                if !has_bbox {
                    return Err(WoffError::CompositeWithoutBbox(gid));
                }
                Glyph::Composite(streams.composite(gid)?)
            }
            n => Glyph::Simple(streams.simple(gid, n as usize, has_bbox)?),
        };
        glyphs.push(glyph);
    }

    debug!(
        "decoded {num_glyphs} glyphs, {} flag and {} glyph stream bytes left",
        streams.flags.remaining(),
        streams.glyphs.remaining()
    );
    Ok(TransformedGlyf { glyphs, loca_format: LocaFormat::from_index_format(index_format) })
}
