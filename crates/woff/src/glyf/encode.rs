//! Applies the WOFF2 glyf transform to parsed glyphs.

use log::debug;

use super::{
    decode::{OVERLAP_SIMPLE_BITMAP, bbox_bitmap_len, overlap_bitmap_len},
    glyph::{BoundingBox, Glyph},
    sfnt::LocaFormat,
    triplet::encode_points,
};
use crate::{
    binary::FontBuffer,
    error::{Result, WoffError},
};

fn set_bit(bitmap: &mut [u8], index: usize) {
    bitmap[index >> 3] |= 0x80 >> (index & 7);
}

/// Builds the transformed glyf table for `glyphs`.
pub fn encode_glyf(glyphs: &[Glyph], loca_format: LocaFormat) -> Result<Vec<u8>> {
    let num_glyphs = u16::try_from(glyphs.len())
        .map_err(|_| WoffError::InvalidSfnt("more than 65535 glyphs"))?;
    let mut n_contour = FontBuffer::new();
    let mut n_points = FontBuffer::new();
    let mut flags = FontBuffer::new();
    let mut glyph_stream = FontBuffer::new();
    let mut composite = FontBuffer::new();
    let mut bbox_bitmap = vec![0u8; bbox_bitmap_len(glyphs.len())];
    let mut bbox = FontBuffer::new();
    let mut instructions = FontBuffer::new();
    let mut overlap_bitmap = vec![0u8; overlap_bitmap_len(glyphs.len())];
    let mut has_overlap = false;

    for (gid, glyph) in glyphs.iter().enumerate() {
        n_contour.push_i16(glyph.num_contours());
        match glyph {
            Glyph::Empty => {}
            Glyph::Simple(simple) => {
                let mut previous_end: i32 = -1;
                for &end in &simple.end_points {
                    let count = i32::from(end) - previous_end;
                    let count = u16::try_from(count).map_err(|_| WoffError::MalformedGlyph {
                        glyph: gid as u32,
                        reason: "contour end points decrease",
                    })?;
                    n_points.push_255_u16(count);
                    previous_end = i32::from(end);
                }
                encode_points(&mut flags, &mut glyph_stream, &simple.points);
                push_instructions(&mut glyph_stream, &mut instructions, &simple.instructions, gid)?;
                if BoundingBox::from_points(&simple.points, gid as u32)? != simple.bbox {
                    set_bit(&mut bbox_bitmap, gid);
                    push_bbox(&mut bbox, &simple.bbox);
                }
                if simple.overlap {
                    set_bit(&mut overlap_bitmap, gid);
                    has_overlap = true;
                }
            }
            Glyph::Composite(glyph) => {
                composite.push_bytes(&glyph.components);
                set_bit(&mut bbox_bitmap, gid);
                push_bbox(&mut bbox, &glyph.bbox);
                if glyph.has_instructions {
                    push_instructions(&mut glyph_stream, &mut instructions, &glyph.instructions, gid)?;
                }
            }
        }
    }

    let option_flags = if has_overlap { OVERLAP_SIMPLE_BITMAP } else { 0 };
    let mut out = FontBuffer::new();
    out.push_u16(0)
        .push_u16(option_flags)
        .push_u16(num_glyphs)
        .push_u16(loca_format.index_format());
    let streams = [
        n_contour.as_slice(),
        n_points.as_slice(),
        flags.as_slice(),
        glyph_stream.as_slice(),
        composite.as_slice(),
    ];
    for stream in streams {
        out.push_u32(stream.len() as u32);
    }
    out.push_u32((bbox_bitmap.len() + bbox.len()) as u32);
    out.push_u32(instructions.len() as u32);
    for stream in streams {
        out.push_bytes(stream);
    }
    out.push_bytes(&bbox_bitmap).push_bytes(bbox.as_slice()).push_bytes(instructions.as_slice());
    if has_overlap {
        out.push_bytes(&overlap_bitmap);
    }

    debug!("transformed glyf: {num_glyphs} glyphs, {} bytes", out.len());
    Ok(out.into_vec())
}

fn push_bbox(out: &mut FontBuffer, bbox: &BoundingBox) {
    out.push_i16(bbox.x_min).push_i16(bbox.y_min).push_i16(bbox.x_max).push_i16(bbox.y_max);
}

fn push_instructions(lengths: &mut FontBuffer, out: &mut FontBuffer, instructions: &[u8], gid: usize) -> Result<()> {
    let len = u16::try_from(instructions.len()).map_err(|_| WoffError::MalformedGlyph {
        glyph: gid as u32,
        reason: "instructions too long",
    })?;
    lengths.push_255_u16(len);
    out.push_bytes(instructions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyf::{
        decode::decode_glyf,
        glyph::{CompositeGlyph, Point, SimpleGlyph},
    };

    fn simple(points: Vec<Point>, end_points: Vec<u16>, overlap: bool) -> Glyph {
        Glyph::Simple(SimpleGlyph {
            bbox: BoundingBox::from_points(&points, 0).unwrap(),
            end_points,
            instructions: vec![0x40, 0x01, 0x02],
            points,
            overlap,
        })
    }

    #[test]
    fn test_transform_round_trip() {
        let square = simple(
            vec![
                Point::new(100, 0, true),
                Point::new(100, 700, true),
                Point::new(500, 700, true),
                Point::new(500, 0, true),
                Point::new(250, 300, false),
                Point::new(-2000, 3000, true),
            ],
            vec![3, 5],
            false,
        );
        let mut padded = simple(vec![Point::new(10, 10, true)], vec![0], true);
        if let Glyph::Simple(glyph) = &mut padded {
            // stored bbox wider than the outline must survive
            glyph.bbox.x_max = 600;
        }
        let composite = Glyph::Composite(CompositeGlyph {
            bbox: BoundingBox { x_min: 100, y_min: 0, x_max: 500, y_max: 700 },
            components: vec![0x00, 0x02, 0x00, 0x01, 0x05, 0x06],
            has_instructions: false,
            instructions: vec![],
        });
        let glyphs = vec![Glyph::Empty, square, padded, composite];

        let table = encode_glyf(&glyphs, LocaFormat::Long).unwrap();
        let decoded = decode_glyf(&table).unwrap();
        assert_eq!(decoded.loca_format, LocaFormat::Long);
        assert_eq!(decoded.glyphs, glyphs);
    }

    #[test]
    fn test_overlap_flag_sets_option_bit() {
        let table = encode_glyf(&[simple(vec![Point::new(0, 0, true)], vec![0], true)], LocaFormat::Short).unwrap();
        assert_eq!(u16::from_be_bytes([table[2], table[3]]), OVERLAP_SIMPLE_BITMAP);
        assert_eq!(*table.last().unwrap(), 0x80);
    }
}
