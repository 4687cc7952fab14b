//! Canonical sfnt `glyf`/`loca` serialization and parsing.

use super::glyph::{BoundingBox, CompositeGlyph, Glyph, Point, SimpleGlyph, read_components};
use crate::{
    binary::{FontBuffer, Reader},
    error::{Result, WoffError},
};

// Simple glyph point flags.
const ON_CURVE_POINT: u8 = 0x01;
const X_SHORT_VECTOR: u8 = 0x02;
const Y_SHORT_VECTOR: u8 = 0x04;
const REPEAT_FLAG: u8 = 0x08;
const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;
const OVERLAP_SIMPLE: u8 = 0x40;

/// Short (16-bit, offset / 2) or long (32-bit) loca entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocaFormat {
    #[default]
    Short,
    Long,
}

impl LocaFormat {
    /// Maps head.indexToLocFormat; any non-zero value means long offsets.
    pub fn from_index_format(value: u16) -> Self {
        if value == 0 { Self::Short } else { Self::Long }
    }

    pub fn index_format(self) -> u16 {
        match self {
            Self::Short => 0,
            Self::Long => 1,
        }
    }

    /// Byte length of a loca table for `num_glyphs` glyphs.
    pub fn table_len(self, num_glyphs: usize) -> usize {
        let entry = match self {
            Self::Short => 2,
            Self::Long => 4,
        };
        (num_glyphs + 1) * entry
    }
}

/// Serialized glyf table plus the offsets that make up loca.
#[derive(Debug, Clone, Default)]
pub struct GlyfLoca {
    pub glyf: Vec<u8>,
    /// `num_glyphs + 1` offsets into `glyf`.
    pub offsets: Vec<u32>,
}

impl GlyfLoca {
    pub fn loca(&self, format: LocaFormat) -> Result<Vec<u8>> {
        let mut out = FontBuffer::with_capacity(format.table_len(self.offsets.len().saturating_sub(1)));
        for &offset in &self.offsets {
            match format {
                LocaFormat::Short => {
                    let half = u16::try_from(offset / 2)
                        .map_err(|_| WoffError::LocaOverflow(self.glyf.len()))?;
                    out.push_u16(half);
                }
                LocaFormat::Long => {
                    out.push_u32(offset);
                }
            }
        }
        Ok(out.into_vec())
    }
}

/// Serializes glyphs into a glyf table, padding each glyph to four bytes.
pub fn write_glyf(glyphs: &[Glyph]) -> Result<GlyfLoca> {
    let mut glyf = FontBuffer::new();
    let mut offsets = Vec::with_capacity(glyphs.len() + 1);
    for (gid, glyph) in glyphs.iter().enumerate() {
        offsets.push(glyf.len() as u32);
        match glyph {
            Glyph::Empty => continue,
            Glyph::Simple(simple) => write_simple(&mut glyf, simple, gid as u32)?,
            Glyph::Composite(composite) => write_composite(&mut glyf, composite, gid as u32)?,
        }
        glyf.pad4();
    }
    offsets.push(glyf.len() as u32);
    Ok(GlyfLoca { glyf: glyf.into_vec(), offsets })
}

fn write_bbox(out: &mut FontBuffer, bbox: &BoundingBox) {
    out.push_i16(bbox.x_min).push_i16(bbox.y_min).push_i16(bbox.x_max).push_i16(bbox.y_max);
}

fn instruction_len(instructions: &[u8], glyph: u32) -> Result<u16> {
    u16::try_from(instructions.len())
        .map_err(|_| WoffError::MalformedGlyph { glyph, reason: "instructions too long" })
}

fn write_simple(out: &mut FontBuffer, glyph: &SimpleGlyph, gid: u32) -> Result<()> {
    let num_contours = i16::try_from(glyph.end_points.len())
        .map_err(|_| WoffError::MalformedGlyph { glyph: gid, reason: "too many contours" })?;
    out.push_i16(num_contours);
    write_bbox(out, &glyph.bbox);
    for &end in &glyph.end_points {
        out.push_u16(end);
    }
    out.push_u16(instruction_len(&glyph.instructions, gid)?);
    out.push_bytes(&glyph.instructions);

    let mut flags = Vec::with_capacity(glyph.points.len());
    let mut xs = FontBuffer::new();
    let mut ys = FontBuffer::new();
    let mut last_flag = None;
    let mut repeat = 0u8;
    let (mut last_x, mut last_y) = (0i32, 0i32);

    for (i, point) in glyph.points.iter().enumerate() {
        let mut flag = if point.on_curve { ON_CURVE_POINT } else { 0 };
        if i == 0 && glyph.overlap {
            flag |= OVERLAP_SIMPLE;
        }
        flag |= push_coordinate(&mut xs, point.x - last_x, X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE, gid)?;
        flag |= push_coordinate(&mut ys, point.y - last_y, Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE, gid)?;
        last_x = point.x;
        last_y = point.y;

        if last_flag == Some(flag) && repeat < u8::MAX {
            if repeat == 0 {
                let prev = flags.len() - 1;
                flags[prev] |= REPEAT_FLAG;
                flags.push(1);
            } else if let Some(count) = flags.last_mut() {
                *count += 1;
            }
            repeat += 1;
        } else {
            flags.push(flag);
            last_flag = Some(flag);
            repeat = 0;
        }
    }

    out.push_bytes(&flags).push_bytes(xs.as_slice()).push_bytes(ys.as_slice());
    Ok(())
}

/// Writes one coordinate delta in its shortest form and returns its flag bits.
fn push_coordinate(out: &mut FontBuffer, delta: i32, short: u8, same_or_positive: u8, gid: u32) -> Result<u8> {
    if delta == 0 {
        Ok(same_or_positive)
    } else if delta.unsigned_abs() < 256 {
        out.push_u8(delta.unsigned_abs() as u8);
        Ok(short | if delta > 0 { same_or_positive } else { 0 })
    } else {
        let word = i16::try_from(delta).map_err(|_| WoffError::CoordinateOverflow(gid))?;
        out.push_i16(word);
        Ok(0)
    }
}

fn write_composite(out: &mut FontBuffer, glyph: &CompositeGlyph, gid: u32) -> Result<()> {
    out.push_i16(-1);
    write_bbox(out, &glyph.bbox);
    out.push_bytes(&glyph.components);
    if glyph.has_instructions {
        out.push_u16(instruction_len(&glyph.instructions, gid)?);
        out.push_bytes(&glyph.instructions);
    }
    Ok(())
}

/// Reads loca offsets for `num_glyphs` glyphs.
pub fn read_loca(loca: &[u8], format: LocaFormat, num_glyphs: usize) -> Result<Vec<u32>> {
    let mut r = Reader::new(loca);
    (0..=num_glyphs)
        .map(|_| match format {
            LocaFormat::Short => r.u16().map(|half| u32::from(half) * 2),
            LocaFormat::Long => r.u32(),
        })
        .collect()
}

/// Parses an sfnt glyf table into glyphs using loca offsets.
pub fn read_glyf(glyf: &[u8], offsets: &[u32]) -> Result<Vec<Glyph>> {
    offsets
        .windows(2)
        .enumerate()
        .map(|(gid, range)| {
            let (start, end) = (range[0] as usize, range[1] as usize);
            if start > end || end > glyf.len() {
                return Err(WoffError::MalformedGlyph { glyph: gid as u32, reason: "loca offsets out of range" });
            }
            read_glyph(&glyf[start..end], gid as u32)
        })
        .collect()
}

fn read_glyph(data: &[u8], gid: u32) -> Result<Glyph> {
    if data.is_empty() {
        return Ok(Glyph::Empty);
    }
    let truncated = |_| WoffError::MalformedGlyph { glyph: gid, reason: "truncated glyph" };
    let mut r = Reader::new(data);
    let num_contours = r.i16().map_err(truncated)?;
    let bbox = BoundingBox::read(&mut r).map_err(truncated)?;

    if num_contours < 0 {
        let (components, has_instructions) = read_components(&mut r, gid)?;
        let instructions = if has_instructions {
            let len = r.u16().map_err(truncated)?;
            r.bytes(len as usize).map_err(truncated)?.to_vec()
        } else {
            Vec::new()
        };
        return Ok(Glyph::Composite(CompositeGlyph {
            bbox,
            components: components.to_vec(),
            has_instructions,
            instructions,
        }));
    }
    if num_contours == 0 {
        return Ok(Glyph::Empty);
    }

    let mut end_points = Vec::with_capacity(num_contours as usize);
    for _ in 0..num_contours {
        let end = r.u16().map_err(truncated)?;
        if end_points.last().is_some_and(|&prev| end < prev) {
            return Err(WoffError::MalformedGlyph { glyph: gid, reason: "contour end points decrease" });
        }
        end_points.push(end);
    }
    let num_points = end_points.last().map_or(0, |&end| end as usize + 1);
    let instruction_len = r.u16().map_err(truncated)?;
    let instructions = r.bytes(instruction_len as usize).map_err(truncated)?.to_vec();

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = r.u8().map_err(truncated)?;
        flags.push(flag);
        if flag & REPEAT_FLAG != 0 {
            let count = r.u8().map_err(truncated)? as usize;
            if flags.len() + count > num_points {
                return Err(WoffError::MalformedGlyph { glyph: gid, reason: "flag repeat overruns points" });
            }
            flags.extend(std::iter::repeat_n(flag, count));
        }
    }

    let xs = read_coordinates(&mut r, &flags, X_SHORT_VECTOR, X_IS_SAME_OR_POSITIVE).map_err(truncated)?;
    let ys = read_coordinates(&mut r, &flags, Y_SHORT_VECTOR, Y_IS_SAME_OR_POSITIVE).map_err(truncated)?;
    let points = flags
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(flag, (x, y))| Point::new(x, y, flag & ON_CURVE_POINT != 0))
        .collect();

    Ok(Glyph::Simple(SimpleGlyph {
        bbox,
        end_points,
        instructions,
        points,
        overlap: flags.first().is_some_and(|flag| flag & OVERLAP_SIMPLE != 0),
    }))
}

fn read_coordinates(r: &mut Reader<'_>, flags: &[u8], short: u8, same_or_positive: u8) -> Result<Vec<i32>> {
    let mut values = Vec::with_capacity(flags.len());
    let mut value = 0i32;
    for &flag in flags {
        if flag & short != 0 {
            let magnitude = i32::from(r.u8()?);
            value += if flag & same_or_positive != 0 { magnitude } else { -magnitude };
        } else if flag & same_or_positive == 0 {
            value += i32::from(r.i16()?);
        }
        values.push(value);
    }
    Ok(values)
}
