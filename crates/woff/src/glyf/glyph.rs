//! In-memory glyph model shared by the transform and sfnt serializers.

use crate::{
    binary::Reader,
    error::{Result, WoffError},
};

// Composite component flags.
pub(crate) const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
pub(crate) const WE_HAVE_A_SCALE: u16 = 0x0008;
pub(crate) const MORE_COMPONENTS: u16 = 0x0020;
pub(crate) const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
pub(crate) const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
pub(crate) const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub on_curve: bool,
}

impl Point {
    pub fn new(x: i32, y: i32, on_curve: bool) -> Self {
        Self { x, y, on_curve }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl BoundingBox {
    /// Tight bounds of `points`; zero when there are none.
    pub fn from_points(points: &[Point], glyph: u32) -> Result<Self> {
        let Some(first) = points.first() else {
            return Ok(Self::default());
        };
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }
        let fit = |v: i32| i16::try_from(v).map_err(|_| WoffError::CoordinateOverflow(glyph));
        Ok(Self { x_min: fit(x_min)?, y_min: fit(y_min)?, x_max: fit(x_max)?, y_max: fit(y_max)? })
    }

    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self { x_min: r.i16()?, y_min: r.i16()?, x_max: r.i16()?, y_max: r.i16()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleGlyph {
    pub bbox: BoundingBox,
    /// Index of the last point of each contour.
    pub end_points: Vec<u16>,
    pub instructions: Vec<u8>,
    pub points: Vec<Point>,
    /// OVERLAP_SIMPLE flag on the first point.
    pub overlap: bool,
}

impl SimpleGlyph {
    pub fn num_contours(&self) -> usize {
        self.end_points.len()
    }
}

/// Composite glyph with its component records kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositeGlyph {
    pub bbox: BoundingBox,
    pub components: Vec<u8>,
    pub has_instructions: bool,
    pub instructions: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Glyph {
    #[default]
    Empty,
    Simple(SimpleGlyph),
    Composite(CompositeGlyph),
}

impl Glyph {
    /// Contour count as stored in the glyph header; -1 for composites.
    pub fn num_contours(&self) -> i16 {
        match self {
            Glyph::Empty => 0,
            Glyph::Simple(simple) => simple.end_points.len() as i16,
            Glyph::Composite(_) => -1,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        match self {
            Glyph::Empty => None,
            Glyph::Simple(simple) => Some(simple.bbox),
            Glyph::Composite(composite) => Some(composite.bbox),
        }
    }

    /// Left side bearing substitute used by the hmtx transform.
    pub fn x_min(&self) -> i16 {
        self.bbox().map_or(0, |bbox| bbox.x_min)
    }
}

/// Reads a run of composite component records, returning their bytes and
/// whether any record requests instructions.
pub(crate) fn read_components<'a>(r: &mut Reader<'a>, glyph: u32) -> Result<(&'a [u8], bool)> {
    let mut probe = r.clone();
    let start = probe.position();
    let mut has_instructions = false;
    loop {
        let flags = probe.u16().map_err(|_| truncated(glyph))?;
        has_instructions |= flags & WE_HAVE_INSTRUCTIONS != 0;
        let args = if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        let scale = if flags & WE_HAVE_A_SCALE != 0 {
            2
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            4
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            8
        } else {
            0
        };
        // glyph index + arguments + transform
        probe.skip(2 + args + scale).map_err(|_| truncated(glyph))?;
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    let bytes = r.bytes(probe.position() - start)?;
    Ok((bytes, has_instructions))
}

fn truncated(glyph: u32) -> WoffError {
    WoffError::MalformedGlyph { glyph, reason: "truncated composite components" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_points() {
        let points = [Point::new(10, -5, true), Point::new(-3, 40, false), Point::new(7, 7, true)];
        let bbox = BoundingBox::from_points(&points, 0).unwrap();
        assert_eq!(bbox, BoundingBox { x_min: -3, y_min: -5, x_max: 10, y_max: 40 });
        assert_eq!(BoundingBox::from_points(&[], 0).unwrap(), BoundingBox::default());
        assert!(BoundingBox::from_points(&[Point::new(40000, 0, true)], 3).is_err());
    }

    #[test]
    fn test_read_components() {
        let data = [
            // words, scale, more components
            0x00, 0x29, 0x00, 0x01, 0x00, 0x10, 0x00, 0x20, 0x40, 0x00,
            // bytes, 2x2, instructions
            0x01, 0x80, 0x00, 0x02, 0x05, 0x06, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00,
            // trailing data
            0xAA,
        ];
        let mut r = Reader::new(&data);
        let (bytes, has_instructions) = read_components(&mut r, 0).unwrap();
        assert_eq!(bytes.len(), 24);
        assert!(has_instructions);
        assert_eq!(r.u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_truncated_components() {
        let data = [0x00, 0x20, 0x00, 0x01, 0x00];
        assert!(read_components(&mut Reader::new(&data), 7).is_err());
    }

    #[test]
    fn test_x_min() {
        assert_eq!(Glyph::Empty.x_min(), 0);
        let glyph = Glyph::Composite(CompositeGlyph {
            bbox: BoundingBox { x_min: -12, ..Default::default() },
            ..Default::default()
        });
        assert_eq!(glyph.x_min(), -12);
        assert_eq!(glyph.num_contours(), -1);
    }
}
